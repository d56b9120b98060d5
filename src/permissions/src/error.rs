//! Error types for the permission engine

use std::path::PathBuf;
use thiserror::Error;

/// Permission engine errors
#[derive(Debug, Error)]
pub enum PermissionError {
    /// Permission node or pattern failed the grammar check
    #[error("Invalid permission node: '{0}'")]
    InvalidNodeFormat(String),

    /// Group name is empty or contains reserved characters
    #[error("Invalid group name: '{0}'")]
    InvalidGroupName(String),

    /// A group with this name already exists
    #[error("Group already exists: {0}")]
    DuplicateGroup(String),

    /// Reference to a group that does not exist
    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    /// An inheritance edge would close a cycle
    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    /// Group is still inherited by other groups
    #[error("Group '{group}' is inherited by: {}", .dependents.join(", "))]
    GroupHasDependents {
        group: String,
        dependents: Vec<String>,
    },

    /// Wildcard grants need an explicit force flag
    #[error("Granting wildcard '{0}' requires force")]
    ForcedWildcardRequired(String),

    /// Backing document could not be read or written
    #[error("Storage error at {}: {source}", .path.display())]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backing document is not valid JSON for the expected shape
    #[error("Malformed permission document at {}: {source}", .path.display())]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PermissionError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::MalformedDocument {
            path: path.into(),
            source,
        }
    }
}

/// Result type for permission operations
pub type Result<T> = std::result::Result<T, PermissionError>;
