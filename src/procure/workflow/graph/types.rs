//! Graph workflow type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Synthetic marker every run starts from
pub const START: &str = "__start__";
/// Synthetic marker that ends a run
pub const END: &str = "__end__";

/// Whether a name is one of the two sentinels
pub fn is_sentinel(name: &str) -> bool {
    name == START || name == END
}

/// A directed, unconditional transition between two graph positions.
///
/// Edges keep their insertion order. When a node has several outgoing
/// edges the executor always follows the first one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", display_name(&self.from), display_name(&self.to))
    }
}

/// Human-readable name for sentinels in logs and CLI output
pub fn display_name(name: &str) -> &str {
    match name {
        START => "START",
        END => "END",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_display_uses_sentinel_names() {
        assert_eq!(Edge::new(START, "ProposalProcessor").to_string(), "START -> ProposalProcessor");
        assert_eq!(Edge::new("ContractRevision", END).to_string(), "ContractRevision -> END");
    }

    #[test]
    fn test_is_sentinel() {
        assert!(is_sentinel(START));
        assert!(is_sentinel(END));
        assert!(!is_sentinel("LegalReview"));
    }
}
