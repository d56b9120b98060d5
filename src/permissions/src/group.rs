//! Group and document type definitions

use crate::error::{PermissionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Group name -> group
pub type GroupMap = BTreeMap<String, Group>;

/// A named bundle of permission grants
///
/// Groups reference their parents by name; the owning [`GroupMap`] is the
/// single place where groups live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Parent group names, in declaration order, without duplicates
    #[serde(default)]
    pub inherits: Vec<String>,

    /// Tie-breaker between equally specific grants (higher wins)
    #[serde(default)]
    pub weight: i64,

    /// Node or wildcard pattern -> grant (`true`) or explicit deny (`false`)
    #[serde(default)]
    pub permissions: BTreeMap<String, bool>,
}

impl Group {
    /// Create an empty group with the given weight
    pub fn new(weight: i64) -> Self {
        Self {
            weight,
            ..Default::default()
        }
    }

    /// Add parents, skipping names already present
    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for parent in parents {
            self.add_parent(parent);
        }
        self
    }

    /// Add a single grant
    pub fn with_permission(mut self, node: impl Into<String>, value: bool) -> Self {
        self.permissions.insert(node.into(), value);
        self
    }

    /// Append a parent; returns false if it was already listed
    pub fn add_parent(&mut self, parent: impl Into<String>) -> bool {
        let parent = parent.into();
        if self.inherits.contains(&parent) {
            return false;
        }
        self.inherits.push(parent);
        true
    }

    /// Remove a parent; returns false if it was not listed
    pub fn remove_parent(&mut self, parent: &str) -> bool {
        let before = self.inherits.len();
        self.inherits.retain(|p| p != parent);
        self.inherits.len() != before
    }

    /// Parents listed more than once in `inherits`
    pub fn duplicate_parents(&self) -> Vec<&str> {
        let mut seen = Vec::with_capacity(self.inherits.len());
        let mut duplicates = Vec::new();
        for parent in &self.inherits {
            if seen.contains(&parent.as_str()) {
                if !duplicates.contains(&parent.as_str()) {
                    duplicates.push(parent.as_str());
                }
            } else {
                seen.push(parent.as_str());
            }
        }
        duplicates
    }
}

/// Persisted document: `{ "groups": { name: group } }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDocument {
    #[serde(default)]
    pub groups: GroupMap,
}

impl PermissionDocument {
    /// Default hierarchy written on first start:
    /// `guest` -> `user` -> `premium` -> `admin`
    pub fn bootstrap() -> Self {
        let mut groups = GroupMap::new();

        groups.insert(
            "guest".to_string(),
            Group::new(0).with_permission("auth.login", true),
        );
        groups.insert(
            "user".to_string(),
            Group::new(10)
                .with_parents(["guest"])
                .with_permission("auth.logout", true)
                .with_permission("profile.view", true)
                .with_permission("profile.edit", true),
        );
        groups.insert(
            "premium".to_string(),
            Group::new(20)
                .with_parents(["user"])
                .with_permission("export.*", true),
        );
        groups.insert(
            "admin".to_string(),
            Group::new(100)
                .with_parents(["premium"])
                .with_permission("*", true),
        );

        Self { groups }
    }
}

/// Group names are non-empty and free of whitespace, `.` and `*`
pub fn is_valid_group_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c == '.' || c == '*')
}

/// Like [`is_valid_group_name`], as a `Result`
pub fn validate_group_name(name: &str) -> Result<()> {
    if is_valid_group_name(name) {
        Ok(())
    } else {
        Err(PermissionError::InvalidGroupName(name.to_string()))
    }
}
