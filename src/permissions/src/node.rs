//! Permission node grammar and wildcard matching
//!
//! A permission node is a dot-separated path of lowercase alphanumeric
//! segments, e.g. `content.delete`. Grants may additionally use two
//! wildcard forms:
//!
//! - `*` matches every node
//! - `prefix.*` matches `prefix` itself and anything nested under it
//!
//! Queries are always plain nodes.
//!
//! # Examples
//!
//! ```
//! use cretoai_permissions::node::{is_valid_node, is_valid_pattern, match_specificity};
//!
//! assert!(is_valid_node("content.delete"));
//! assert!(!is_valid_node("content.*"));
//! assert!(is_valid_pattern("content.*"));
//!
//! assert_eq!(match_specificity("content.*", "content.delete"), Some(1));
//! assert_eq!(match_specificity("content.delete", "content.delete"), Some(3));
//! assert_eq!(match_specificity("*", "content.delete"), Some(0));
//! ```

use crate::error::{PermissionError, Result};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Universal wildcard
pub const UNIVERSAL: &str = "*";

/// Suffix that turns a node into a prefix wildcard
const PREFIX_SUFFIX: &str = ".*";

static NODE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // Unwrap as the expression is a compile-time constant
    Regex::new(r"^[a-z0-9]+(\.[a-z0-9]+)*$").unwrap()
});

/// Returns true if `s` is a plain permission node (no wildcards)
pub fn is_valid_node(s: &str) -> bool {
    NODE_REGEX.is_match(s)
}

/// Returns true if `s` is a plain node, `*`, or `<node>.*`
pub fn is_valid_pattern(s: &str) -> bool {
    PermissionPattern::parse(s).is_ok()
}

/// Number of dot-separated segments in a node
pub fn segment_count(node: &str) -> u32 {
    node.split('.').count() as u32
}

/// Specificity of `pattern` against the plain node `node`, or `None` when it
/// does not match (or is not a valid pattern).
pub fn match_specificity(pattern: &str, node: &str) -> Option<u32> {
    PermissionPattern::parse(pattern)
        .ok()
        .and_then(|p| p.specificity_for(node))
}

/// A parsed grant key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionPattern<'a> {
    /// `*`
    Universal,
    /// `prefix.*`, holding `prefix`
    Prefix(&'a str),
    /// A plain node
    Exact(&'a str),
}

impl<'a> PermissionPattern<'a> {
    /// Parses a grant key, rejecting anything outside the grammar
    pub fn parse(s: &'a str) -> Result<Self> {
        if s == UNIVERSAL {
            return Ok(Self::Universal);
        }

        if let Some(prefix) = s.strip_suffix(PREFIX_SUFFIX) {
            if is_valid_node(prefix) {
                return Ok(Self::Prefix(prefix));
            }
            return Err(PermissionError::InvalidNodeFormat(s.to_string()));
        }

        if is_valid_node(s) {
            Ok(Self::Exact(s))
        } else {
            Err(PermissionError::InvalidNodeFormat(s.to_string()))
        }
    }

    /// Whether this pattern covers more than one node
    pub fn is_wildcard(&self) -> bool {
        !matches!(self, Self::Exact(_))
    }

    /// Matches a plain node and returns the match specificity
    ///
    /// - exact match: segments in `node` + 1
    /// - `prefix.*`: segments in `prefix`
    /// - `*`: 0
    pub fn specificity_for(&self, node: &str) -> Option<u32> {
        match self {
            Self::Universal => Some(0),
            Self::Prefix(prefix) => {
                let nested = node
                    .strip_prefix(prefix)
                    .map(|rest| rest.is_empty() || rest.starts_with('.'))
                    .unwrap_or(false);
                nested.then(|| segment_count(prefix))
            }
            Self::Exact(exact) => (*exact == node).then(|| segment_count(node) + 1),
        }
    }
}

impl fmt::Display for PermissionPattern<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Universal => write!(f, "{}", UNIVERSAL),
            Self::Prefix(prefix) => write!(f, "{}{}", prefix, PREFIX_SUFFIX),
            Self::Exact(node) => write!(f, "{}", node),
        }
    }
}
