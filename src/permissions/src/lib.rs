//! # CretoAI Permissions
//!
//! Group-based permission resolution with weighted inheritance.
//!
//! ## Features
//!
//! - **Permission nodes** such as `content.delete`, with `prefix.*` and `*`
//!   wildcard grants
//! - **Inheritance DAG** between named groups, with cycle prevention on
//!   every write
//! - **Deterministic resolution**: specificity first, then group weight,
//!   then group name
//! - **Traces** listing every grant considered for a query
//! - **Atomic persistence** to a single JSON document (temp file + rename)
//!
//! ## Example
//!
//! ```rust
//! use cretoai_permissions::PermissionsService;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let service = PermissionsService::open(dir.path().join("permissions.json"))?;
//!
//! // Default hierarchy: guest -> user -> premium -> admin
//! assert!(service.check_role("guest", "auth.login"));
//! assert!(!service.check_role("guest", "admin.delete"));
//!
//! service.create_group("editor", 30, ["user"])?;
//! service.grant("editor", "content.*", true, true)?;
//! service.grant("editor", "content.delete", false, false)?;
//!
//! assert!(service.check_role("editor", "content.read"));
//! assert!(!service.check_role("editor", "content.delete"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod decision;
pub mod error;
pub mod graph;
pub mod group;
pub mod node;
pub mod provider;
pub mod resolver;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use config::{CacheConfig, PermissionsConfig};
pub use decision::{Candidate, Decision, DecisionReason, TraceResult};
pub use error::{PermissionError, Result};
pub use graph::InheritanceGraph;
pub use group::{Group, GroupMap, PermissionDocument};
pub use node::{is_valid_node, is_valid_pattern, PermissionPattern};
pub use provider::{StaticUserProvider, UserProvider};
pub use resolver::{CacheStats, PermissionResolver};
pub use service::PermissionsService;
pub use store::GroupStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
