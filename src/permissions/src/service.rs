//! Permission service facade
//!
//! Owns the group store behind a readers-writer lock. Queries share the
//! read lock; every mutation holds the write lock across check, persist and
//! cache invalidation, so readers only ever see fully committed state.
//!
//! ```text
//! check(user) ─► UserProvider ─► check_role ─► PermissionResolver ─► Decision
//!                                                   │
//! grant/create/... ─► node grammar ─► InheritanceGraph ─► GroupStore (atomic write)
//! ```

use crate::config::PermissionsConfig;
use crate::decision::{Decision, TraceResult};
use crate::error::{PermissionError, Result};
use crate::graph::InheritanceGraph;
use crate::group::{is_valid_group_name, validate_group_name, Group, GroupMap};
use crate::node::{is_valid_pattern, PermissionPattern};
use crate::provider::UserProvider;
use crate::resolver::{CacheStats, PermissionResolver};
use crate::store::GroupStore;

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Group management and permission checks over one document
pub struct PermissionsService {
    store: RwLock<GroupStore>,
    resolver: PermissionResolver,
    provider: Option<Arc<dyn UserProvider>>,
    config: PermissionsConfig,
}

impl PermissionsService {
    /// Load (or create) the document named by `config`
    pub fn new(config: PermissionsConfig) -> Result<Self> {
        config.validate()?;

        let store = GroupStore::open(&config.path, config.bootstrap_defaults)?;
        info!(
            "PermissionsService loaded {} groups from {} (cache={})",
            store.all().len(),
            store.path().display(),
            config.cache.enabled
        );
        report_problems(store.all());

        Ok(Self {
            store: RwLock::new(store),
            resolver: PermissionResolver::new(config.cache.clone()),
            provider: None,
            config,
        })
    }

    /// Default configuration for the document at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(PermissionsConfig::new(path))
    }

    /// Install the user -> role lookup used by [`check`](Self::check)
    pub fn with_user_provider(mut self, provider: Arc<dyn UserProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Whether `role` holds `node`; invalid nodes and unknown roles deny
    pub fn check_role(&self, role: &str, node: &str) -> bool {
        match self.decide(role, node) {
            Ok(decision) => decision.allowed,
            Err(e) => {
                debug!("Denying '{}' for role '{}': {}", node, role, e);
                false
            }
        }
    }

    /// Whether the user's role holds `node`
    ///
    /// Users without a role fall back to the configured default role.
    pub fn check(&self, user_id: &str, node: &str) -> bool {
        let role = self.role_for(user_id);
        self.check_role(&role, node)
    }

    /// Full decision for a role
    pub fn decide(&self, role: &str, node: &str) -> Result<Decision> {
        let store = self.store.read();
        self.resolver.resolve(store.all(), role, node)
    }

    /// Diagnostic trace for a user
    pub fn trace(&self, user_id: &str, node: &str) -> Result<TraceResult> {
        let role = self.role_for(user_id);
        self.trace_role(&role, node)
    }

    /// Diagnostic trace for a role
    pub fn trace_role(&self, role: &str, node: &str) -> Result<TraceResult> {
        let store = self.store.read();
        self.resolver.trace(store.all(), role, node)
    }

    /// Role the user resolves to, after the default-role fallback
    pub fn role_for(&self, user_id: &str) -> String {
        self.provider
            .as_ref()
            .and_then(|provider| provider.role_of(user_id))
            .unwrap_or_else(|| self.config.default_role.clone())
    }

    /// Flattened grants of a role, for display only
    pub fn role_permissions(&self, role: &str) -> BTreeMap<String, bool> {
        let store = self.store.read();
        self.resolver.role_permissions(store.all(), role)
    }

    /// The role followed by all its ancestors
    pub fn inheritance_chain(&self, role: &str) -> Vec<String> {
        let store = self.store.read();
        self.resolver.chain(store.all(), role).to_vec()
    }

    pub fn group(&self, name: &str) -> Option<Group> {
        self.store.read().get(name).cloned()
    }

    pub fn groups(&self) -> GroupMap {
        self.store.read().all().clone()
    }

    pub fn group_names(&self) -> Vec<String> {
        self.store.read().all().keys().cloned().collect()
    }

    /// Groups that inherit directly from `name`
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        let store = self.store.read();
        InheritanceGraph::new(store.all()).dependents_of(name)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.resolver.stats()
    }

    pub fn path(&self) -> PathBuf {
        self.store.read().path().to_path_buf()
    }

    pub fn config(&self) -> &PermissionsConfig {
        &self.config
    }

    /// Every problem in the current document, empty when valid
    pub fn validate(&self) -> Vec<String> {
        validate_groups(self.store.read().all())
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Create a group inheriting from existing groups
    pub fn create_group<I, S>(&self, name: &str, weight: i64, inherits: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let group = Group::new(weight).with_parents(inherits);

        self.mutate("create_group", |store| {
            validate_group_name(name)?;

            if store.exists(name) {
                return Err(PermissionError::DuplicateGroup(name.to_string()));
            }

            if group.inherits.iter().any(|parent| parent == name) {
                return Err(PermissionError::CircularDependency(format!(
                    "{} -> {}",
                    name, name
                )));
            }

            for parent in &group.inherits {
                if !store.exists(parent) {
                    return Err(PermissionError::UnknownGroup(parent.clone()));
                }
            }

            // Only reachable when a hand-edited document references the
            // new name before it exists
            let graph = InheritanceGraph::new(store.all());
            for parent in &group.inherits {
                if let Some(path) = graph.cycle_path(name, parent) {
                    return Err(PermissionError::CircularDependency(path.join(" -> ")));
                }
            }

            store.put(name, group.clone())?;
            info!(
                "Created group '{}' (weight={}, inherits={:?})",
                name, group.weight, group.inherits
            );
            Ok(true)
        })
    }

    /// Delete a group nobody inherits from
    pub fn delete_group(&self, name: &str) -> Result<()> {
        self.mutate("delete_group", |store| {
            if !store.exists(name) {
                return Err(PermissionError::UnknownGroup(name.to_string()));
            }

            let dependents = InheritanceGraph::new(store.all()).dependents_of(name);
            if !dependents.is_empty() {
                return Err(PermissionError::GroupHasDependents {
                    group: name.to_string(),
                    dependents,
                });
            }

            store.remove(name)?;
            info!("Deleted group '{}'", name);
            Ok(true)
        })
    }

    pub fn set_group_weight(&self, name: &str, weight: i64) -> Result<()> {
        self.mutate("set_group_weight", |store| {
            let mut group = existing(store, name)?;
            if group.weight == weight {
                return Ok(false);
            }

            group.weight = weight;
            store.put(name, group)?;
            info!("Set weight of '{}' to {}", name, weight);
            Ok(true)
        })
    }

    /// Make `group` inherit from `parent`
    pub fn add_parent(&self, group: &str, parent: &str) -> Result<()> {
        self.mutate("add_parent", |store| {
            let mut child = existing(store, group)?;
            if !store.exists(parent) {
                return Err(PermissionError::UnknownGroup(parent.to_string()));
            }

            if child.inherits.iter().any(|p| p == parent) {
                return Ok(false);
            }

            if let Some(path) = InheritanceGraph::new(store.all()).cycle_path(group, parent) {
                return Err(PermissionError::CircularDependency(path.join(" -> ")));
            }

            child.add_parent(parent);
            store.put(group, child)?;
            info!("'{}' now inherits '{}'", group, parent);
            Ok(true)
        })
    }

    /// Drop the `group -> parent` edge if present
    pub fn remove_parent(&self, group: &str, parent: &str) -> Result<()> {
        self.mutate("remove_parent", |store| {
            let mut child = existing(store, group)?;
            if !child.remove_parent(parent) {
                return Ok(false);
            }

            store.put(group, child)?;
            info!("'{}' no longer inherits '{}'", group, parent);
            Ok(true)
        })
    }

    /// Set `node` to `value` on `group`
    ///
    /// Wildcard patterns (`*`, `prefix.*`) are refused unless `force` is set.
    pub fn grant(&self, group: &str, node: &str, value: bool, force: bool) -> Result<()> {
        self.mutate("grant", |store| {
            let pattern = PermissionPattern::parse(node)?;
            if pattern.is_wildcard() && !force {
                return Err(PermissionError::ForcedWildcardRequired(node.to_string()));
            }

            let mut target = existing(store, group)?;
            if target.permissions.get(node) == Some(&value) {
                return Ok(false);
            }

            target.permissions.insert(node.to_string(), value);
            store.put(group, target)?;
            info!("Set '{}' = {} on group '{}'", node, value, group);
            Ok(true)
        })
    }

    /// Remove `node` from `group`; no-op when absent
    pub fn revoke(&self, group: &str, node: &str) -> Result<()> {
        self.mutate("revoke", |store| {
            let mut target = existing(store, group)?;
            if target.permissions.remove(node).is_none() {
                return Ok(false);
            }

            store.put(group, target)?;
            info!("Revoked '{}' from group '{}'", node, group);
            Ok(true)
        })
    }

    /// Re-read the document, dropping in-memory state
    pub fn reload(&self) -> Result<()> {
        let mut store = self.store.write();
        store.load()?;
        self.resolver.invalidate();

        info!(
            "Reloaded {} groups from {}",
            store.all().len(),
            store.path().display()
        );
        report_problems(store.all());
        Ok(())
    }

    /// Run `op` under the write lock; it returns whether anything changed.
    /// The closure cache is cleared before the lock is released.
    fn mutate<F>(&self, name: &str, op: F) -> Result<()>
    where
        F: FnOnce(&mut GroupStore) -> Result<bool>,
    {
        let mut store = self.store.write();
        match op(&mut store) {
            Ok(true) => {
                self.resolver.invalidate();
                Ok(())
            }
            Ok(false) => {
                debug!("{}: nothing to change", name);
                Ok(())
            }
            Err(e) => {
                warn!("{} rejected: {}", name, e);
                Err(e)
            }
        }
    }
}

fn existing(store: &GroupStore, name: &str) -> Result<Group> {
    store
        .get(name)
        .cloned()
        .ok_or_else(|| PermissionError::UnknownGroup(name.to_string()))
}

/// Problems in a group map, grouped by kind: names, grant keys, duplicate
/// parents, dangling parents, cycles
pub fn validate_groups(groups: &GroupMap) -> Vec<String> {
    let mut problems = Vec::new();

    for name in groups.keys() {
        if !is_valid_group_name(name) {
            problems.push(format!("Group '{}': invalid group name", name));
        }
    }

    for (name, group) in groups {
        for key in group.permissions.keys() {
            if !is_valid_pattern(key) {
                problems.push(format!(
                    "Group '{}': invalid permission node '{}'",
                    name, key
                ));
            }
        }
    }

    for (name, group) in groups {
        for parent in group.duplicate_parents() {
            problems.push(format!(
                "Group '{}': inherits '{}' more than once",
                name, parent
            ));
        }
    }

    let graph = InheritanceGraph::new(groups);

    for (name, parent) in graph.dangling_references() {
        problems.push(format!(
            "Group '{}': inherits unknown group '{}'",
            name, parent
        ));
    }

    for cycle in graph.detect_cycles() {
        problems.push(format!("Circular inheritance: {}", cycle.join(" -> ")));
    }

    problems
}

fn report_problems(groups: &GroupMap) {
    for problem in validate_groups(groups) {
        warn!("Permission document problem: {}", problem);
    }
}
