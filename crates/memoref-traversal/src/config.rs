//! Build configuration.

use serde::{Deserialize, Serialize};

/// Tunables for building a [`crate::RefTraversal`].
///
/// Capacities are pre-allocation hints only; the snapshot grows past them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Expected number of reachable references.
    pub node_capacity: usize,
    /// Expected number of (expression, quantifier) path records.
    pub edge_capacity: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            node_capacity: 16,
            edge_capacity: 32,
        }
    }
}

impl TraversalConfig {
    /// Size the snapshot for a plan with roughly `refs` references and
    /// `quantifiers` quantifiers.
    pub fn sized_for(refs: usize, quantifiers: usize) -> Self {
        Self {
            node_capacity: refs,
            edge_capacity: quantifiers,
        }
    }
}
