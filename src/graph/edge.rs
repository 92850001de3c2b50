//! Weighted similarity edges between notes

use super::node::NodeId;
use serde::{Deserialize, Serialize};

/// A similarity link between two nodes
///
/// Stored with a nominal direction (the newer node is the source) but
/// semantically symmetric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Node that was ingested when the edge was created
    pub source: NodeId,
    /// Pre-existing node it was compared against
    pub target: NodeId,
    /// Jaccard similarity of the two concept sets (0.0 - 1.0)
    pub weight: f64,
}

impl Edge {
    /// Create a new edge
    pub fn new(source: NodeId, target: NodeId, weight: f64) -> Self {
        Self {
            source,
            target,
            weight,
        }
    }

    /// Check if the edge joins `a` and `b`, in either direction
    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }

    /// Check if either endpoint is `id`
    pub fn touches(&self, id: NodeId) -> bool {
        self.source == id || self.target == id
    }

    /// The endpoint opposite `id`, if the edge touches it
    pub fn other(&self, id: NodeId) -> Option<NodeId> {
        if self.source == id {
            Some(self.target)
        } else if self.target == id {
            Some(self.source)
        } else {
            None
        }
    }
}
