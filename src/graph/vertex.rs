//! Shared-concept justifications backing edges

use super::node::NodeId;
use serde::{Deserialize, Serialize};

/// One concept shared by a pair of nodes
///
/// There is one vertex per (node pair, shared concept); several vertices
/// usually back a single edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vertex {
    pub source: NodeId,
    pub target: NodeId,
    pub concept: String,
}

impl Vertex {
    pub fn new(source: NodeId, target: NodeId, concept: impl Into<String>) -> Self {
        Self {
            source,
            target,
            concept: concept.into(),
        }
    }
}
