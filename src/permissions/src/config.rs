//! Service configuration loading

use crate::error::{PermissionError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Permission service configuration
///
/// ```toml
/// path = "/var/lib/cretoai/permissions.json"
/// default_role = "guest"
/// bootstrap_defaults = true
///
/// [cache]
/// enabled = true
/// max_entries = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PermissionsConfig {
    /// Backing JSON document
    pub path: PathBuf,

    /// Role used when a user has none
    #[serde(default = "default_role")]
    pub default_role: String,

    /// Write the default hierarchy when the document is missing
    #[serde(default = "default_true")]
    pub bootstrap_defaults: bool,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Ancestor-closure cache settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
        }
    }
}

impl PermissionsConfig {
    /// Defaults for everything but the document path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            default_role: default_role(),
            bootstrap_defaults: true,
            cache: CacheConfig::default(),
        }
    }

    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PermissionError::storage(path, e))?;
        Self::from_toml_str(&contents)
    }

    /// Parse from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| PermissionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(PermissionError::Config("path must not be empty".to_string()));
        }
        if self.default_role.is_empty() {
            return Err(PermissionError::Config(
                "default_role must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap_defaults = bootstrap;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

fn default_role() -> String {
    "guest".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> usize {
    10_000
}
