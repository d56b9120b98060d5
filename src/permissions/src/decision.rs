//! Resolution results and diagnostic traces

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// A grant that matched the queried node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Group that holds the grant
    pub group: String,

    /// Grant key as written (`content.*`, `*`, `content.read`)
    pub pattern: String,

    /// How closely the pattern matched the node
    pub specificity: u32,

    /// Weight of the holding group
    pub weight: i64,

    /// Grant (`true`) or explicit deny (`false`)
    pub value: bool,
}

impl Candidate {
    /// Selection order: higher specificity, then higher weight, then the
    /// alphabetically smaller group name. `Ordering::Less` means `self`
    /// wins.
    pub fn rank(&self, other: &Self) -> Ordering {
        other
            .specificity
            .cmp(&self.specificity)
            .then_with(|| other.weight.cmp(&self.weight))
            .then_with(|| self.group.cmp(&other.group))
    }
}

/// Why a decision came out the way it did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionReason {
    /// The winning grant
    Matched { candidate: Candidate },

    /// Nothing in the inheritance chain matched
    DefaultDeny,

    /// The role names no group
    UnknownRole,
}

/// Allow/deny outcome of a single query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl Decision {
    /// Decision taken from the winning candidate
    pub fn matched(candidate: Candidate) -> Self {
        Self {
            allowed: candidate.value,
            reason: DecisionReason::Matched { candidate },
        }
    }

    /// Implicit deny
    pub fn default_deny() -> Self {
        Self {
            allowed: false,
            reason: DecisionReason::DefaultDeny,
        }
    }

    /// Deny for a role that does not exist
    pub fn unknown_role() -> Self {
        Self {
            allowed: false,
            reason: DecisionReason::UnknownRole,
        }
    }

    /// The grant that decided the query, if any
    pub fn winner(&self) -> Option<&Candidate> {
        match &self.reason {
            DecisionReason::Matched { candidate } => Some(candidate),
            _ => None,
        }
    }
}

/// Full account of how a query was resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceResult {
    /// Unique trace ID
    pub id: String,

    /// Role the query was resolved for
    pub role: String,

    /// Queried node
    pub node: String,

    /// Inheritance chain, role first
    pub chain: Vec<String>,

    /// Every matching grant, best first
    pub candidates: Vec<Candidate>,

    /// Final outcome
    pub decision: Decision,

    /// When the trace was taken
    pub evaluated_at: DateTime<Utc>,
}

impl TraceResult {
    pub(crate) fn new(
        role: &str,
        node: &str,
        chain: Vec<String>,
        candidates: Vec<Candidate>,
        decision: Decision,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: role.to_string(),
            node: node.to_string(),
            chain,
            candidates,
            decision,
            evaluated_at: Utc::now(),
        }
    }

    /// Shortcut for `decision.allowed`
    pub fn allowed(&self) -> bool {
        self.decision.allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(group: &str, specificity: u32, weight: i64, value: bool) -> Candidate {
        Candidate {
            group: group.to_string(),
            pattern: "content.edit".to_string(),
            specificity,
            weight,
            value,
        }
    }

    #[test]
    fn test_specificity_outranks_weight() {
        let specific = candidate("low", 3, 1, false);
        let broad = candidate("high", 1, 100, true);
        assert_eq!(specific.rank(&broad), Ordering::Less);
    }

    #[test]
    fn test_weight_breaks_specificity_tie() {
        let heavy = candidate("a", 3, 20, true);
        let light = candidate("b", 3, 15, false);
        assert_eq!(heavy.rank(&light), Ordering::Less);
        assert_eq!(light.rank(&heavy), Ordering::Greater);
    }

    #[test]
    fn test_name_breaks_full_tie() {
        let alpha = candidate("alpha", 3, 10, true);
        let beta = candidate("beta", 3, 10, false);
        assert_eq!(alpha.rank(&beta), Ordering::Less);
    }

    #[test]
    fn test_matched_decision_takes_value() {
        let decision = Decision::matched(candidate("g", 2, 0, false));
        assert!(!decision.allowed);
        assert_eq!(decision.winner().unwrap().group, "g");

        assert!(Decision::default_deny().winner().is_none());
        assert!(!Decision::unknown_role().allowed);
    }

    #[test]
    fn test_reason_serialization() {
        let json = serde_json::to_value(Decision::default_deny()).unwrap();
        assert_eq!(json["reason"]["type"], "default_deny");

        let json = serde_json::to_value(Decision::matched(candidate("g", 2, 0, true))).unwrap();
        assert_eq!(json["reason"]["type"], "matched");
        assert_eq!(json["reason"]["candidate"]["group"], "g");
    }

    #[test]
    fn test_trace_metadata() {
        let trace = TraceResult::new(
            "user",
            "auth.login",
            vec!["user".to_string(), "guest".to_string()],
            vec![],
            Decision::default_deny(),
        );

        assert!(!trace.id.is_empty());
        assert!(!trace.allowed());
        assert_eq!(trace.chain.len(), 2);
    }
}
