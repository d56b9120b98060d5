//! # permctl
//!
//! Administrative CLI for a CretoAI permission document.
//!
//! ## Configuration
//!
//! - `--config` / `CRETOAI_PERMISSIONS_CONFIG` - TOML service configuration
//! - `--file` / `CRETOAI_PERMISSIONS_FILE` - JSON document (used when no config is given)
//! - `RUST_LOG` - log filter (default: warn, debug with `--verbose`)
//!
//! `check` exits with 0 when allowed and 1 when denied. `validate` exits
//! with 1 when the document has problems.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cretoai_permissions::{PermissionsConfig, PermissionsService};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

/// CretoAI permission administration
#[derive(Parser)]
#[command(name = "permctl")]
#[command(about = "Inspect and edit CretoAI permission groups")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "CRETOAI_PERMISSIONS_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the permission document
    #[arg(
        short,
        long,
        env = "CRETOAI_PERMISSIONS_FILE",
        default_value = "permissions.json"
    )]
    file: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a role holds a node
    Check { role: String, node: String },

    /// Show every grant considered for a query
    Trace { role: String, node: String },

    /// Dump all groups
    Groups,

    /// Show the flattened grants of a role
    Permissions { role: String },

    /// Create a group
    CreateGroup {
        name: String,
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        weight: i64,
        /// Comma-separated parent groups
        #[arg(short, long, value_delimiter = ',')]
        inherits: Vec<String>,
    },

    /// Delete a group nobody inherits from
    DeleteGroup { name: String },

    /// Change a group's weight
    SetWeight {
        name: String,
        #[arg(allow_negative_numbers = true)]
        weight: i64,
    },

    /// Add an inheritance edge
    AddParent { group: String, parent: String },

    /// Remove an inheritance edge
    RemoveParent { group: String, parent: String },

    /// Grant (or explicitly deny) a node
    Grant {
        group: String,
        node: String,
        /// Store an explicit deny instead of a grant
        #[arg(long)]
        deny: bool,
        /// Allow wildcard patterns
        #[arg(long)]
        force: bool,
    },

    /// Remove a node from a group
    Revoke { group: String, node: String },

    /// Report problems in the document
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},cretoai_permissions={}", log_level, log_level).into()),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => PermissionsConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PermissionsConfig::new(&cli.file),
    };
    debug!("Using permission document {}", config.path.display());

    let service = PermissionsService::new(config).context("failed to open permission document")?;

    match cli.command {
        Command::Check { role, node } => {
            let allowed = service.check_role(&role, &node);
            println!("{}", if allowed { "allow" } else { "deny" });
            return Ok(if allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        Command::Trace { role, node } => {
            let trace = service
                .trace_role(&role, &node)
                .with_context(|| format!("cannot trace '{}'", node))?;
            print_json(&trace)?;
        }
        Command::Groups => print_json(&service.groups())?,
        Command::Permissions { role } => print_json(&service.role_permissions(&role))?,
        Command::CreateGroup {
            name,
            weight,
            inherits,
        } => {
            service
                .create_group(&name, weight, inherits)
                .with_context(|| format!("cannot create group '{}'", name))?;
        }
        Command::DeleteGroup { name } => {
            service
                .delete_group(&name)
                .with_context(|| format!("cannot delete group '{}'", name))?;
        }
        Command::SetWeight { name, weight } => {
            service
                .set_group_weight(&name, weight)
                .with_context(|| format!("cannot set weight of '{}'", name))?;
        }
        Command::AddParent { group, parent } => {
            service
                .add_parent(&group, &parent)
                .with_context(|| format!("cannot make '{}' inherit '{}'", group, parent))?;
        }
        Command::RemoveParent { group, parent } => {
            service
                .remove_parent(&group, &parent)
                .with_context(|| format!("cannot remove '{}' from '{}'", parent, group))?;
        }
        Command::Grant {
            group,
            node,
            deny,
            force,
        } => {
            service
                .grant(&group, &node, !deny, force)
                .with_context(|| format!("cannot set '{}' on '{}'", node, group))?;
        }
        Command::Revoke { group, node } => {
            service
                .revoke(&group, &node)
                .with_context(|| format!("cannot revoke '{}' from '{}'", node, group))?;
        }
        Command::Validate => {
            let problems = service.validate();
            if problems.is_empty() {
                println!("ok");
            } else {
                for problem in &problems {
                    println!("{}", problem);
                }
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
