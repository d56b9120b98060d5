//! Permission resolution over the inheritance chain
//!
//! For a role and a plain node the resolver:
//!
//! 1. builds the role's ancestor closure (role first, breadth-first)
//! 2. collects every grant in the closure whose pattern matches the node
//! 3. picks the candidate with the highest specificity, then the highest
//!    group weight, then the alphabetically first group name
//! 4. denies when nothing matched
//!
//! Exact grants always beat `prefix.*` grants, which beat `*`, no matter
//! which group holds them. Weight only matters between equally specific
//! grants coming from different groups.
//!
//! Ancestor closures are cached per role in a `DashMap`. The cache must be
//! invalidated whenever the group map changes.

use crate::config::CacheConfig;
use crate::decision::{Candidate, Decision, TraceResult};
use crate::error::{PermissionError, Result};
use crate::graph::InheritanceGraph;
use crate::group::GroupMap;
use crate::node::{is_valid_node, match_specificity};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Closure cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

impl CacheStats {
    /// Hits over lookups, 0.0 before the first lookup
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Resolves role/node queries against a group map
///
/// The resolver holds no groups itself; every call receives the current
/// map. Thread-safe and shareable through `Arc`.
#[derive(Debug)]
pub struct PermissionResolver {
    /// role -> ancestor closure
    closures: DashMap<String, Arc<[String]>>,
    config: CacheConfig,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl PermissionResolver {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            closures: DashMap::new(),
            config,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Ancestor closure of `role`, served from the cache when possible
    pub fn chain(&self, groups: &GroupMap, role: &str) -> Arc<[String]> {
        if !self.config.enabled {
            return InheritanceGraph::new(groups).ancestors_of(role).into();
        }

        if let Some(cached) = self.closures.get(role) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(cached.value());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let chain: Arc<[String]> = InheritanceGraph::new(groups).ancestors_of(role).into();

        if self.closures.len() < self.config.max_entries {
            self.closures.insert(role.to_string(), Arc::clone(&chain));
        }

        chain
    }

    /// Decide whether `role` holds `node`
    ///
    /// # Errors
    ///
    /// `InvalidNodeFormat` if `node` is not a plain node. Missing grants are
    /// a deny, never an error.
    pub fn resolve(&self, groups: &GroupMap, role: &str, node: &str) -> Result<Decision> {
        ensure_plain_node(node)?;

        if !groups.contains_key(role) {
            debug!("Role '{}' does not exist, denying '{}'", role, node);
            return Ok(Decision::unknown_role());
        }

        let chain = self.chain(groups, role);
        let winner = collect_candidates(groups, &chain, node)
            .into_iter()
            .min_by(|a, b| a.rank(b));

        Ok(match winner {
            Some(candidate) => {
                debug!(
                    "'{}' on '{}' decided by {} -> {} ({}), specificity={}, weight={}",
                    role,
                    node,
                    candidate.group,
                    candidate.pattern,
                    candidate.value,
                    candidate.specificity,
                    candidate.weight
                );
                Decision::matched(candidate)
            }
            None => Decision::default_deny(),
        })
    }

    /// Same as [`resolve`](Self::resolve), reporting every candidate
    pub fn trace(&self, groups: &GroupMap, role: &str, node: &str) -> Result<TraceResult> {
        ensure_plain_node(node)?;

        let chain = self.chain(groups, role);

        if !groups.contains_key(role) {
            return Ok(TraceResult::new(
                role,
                node,
                chain.to_vec(),
                Vec::new(),
                Decision::unknown_role(),
            ));
        }

        let mut candidates = collect_candidates(groups, &chain, node);
        candidates.sort_by(|a, b| a.rank(b));

        let decision = match candidates.first() {
            Some(best) => Decision::matched(best.clone()),
            None => Decision::default_deny(),
        };

        Ok(TraceResult::new(
            role,
            node,
            chain.to_vec(),
            candidates,
            decision,
        ))
    }

    /// Flattened grants for display
    ///
    /// Merges grant maps from the furthest ancestor down to the role, later
    /// groups overriding earlier ones by exact key. No specificity rules
    /// are applied, so this is not a decision.
    pub fn role_permissions(&self, groups: &GroupMap, role: &str) -> BTreeMap<String, bool> {
        let chain = self.chain(groups, role);
        let mut merged = BTreeMap::new();

        for name in chain.iter().rev() {
            if let Some(group) = groups.get(name) {
                for (pattern, value) in &group.permissions {
                    merged.insert(pattern.clone(), *value);
                }
            }
        }

        merged
    }

    /// Drop every cached closure
    pub fn invalidate(&self) {
        self.closures.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.closures.len(),
        }
    }
}

impl Default for PermissionResolver {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Every grant in `chain` that matches `node`, in chain order
pub fn collect_candidates(groups: &GroupMap, chain: &[String], node: &str) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for name in chain {
        let Some(group) = groups.get(name) else {
            continue;
        };

        for (pattern, value) in &group.permissions {
            if let Some(specificity) = match_specificity(pattern, node) {
                candidates.push(Candidate {
                    group: name.clone(),
                    pattern: pattern.clone(),
                    specificity,
                    weight: group.weight,
                    value: *value,
                });
            }
        }
    }

    candidates
}

fn ensure_plain_node(node: &str) -> Result<()> {
    if is_valid_node(node) {
        Ok(())
    } else {
        Err(PermissionError::InvalidNodeFormat(node.to_string()))
    }
}
