//! Node representation in the concept graph

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unique identifier for a node
///
/// Allocated monotonically by the owning [`ConceptGraph`](super::ConceptGraph);
/// never reused within a graph's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a NodeId from a raw integer
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw integer value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// An ingested note in the concept graph
///
/// Created once per note and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// Full source text of the note
    pub text: String,
    /// Concept labels in tagging order (duplicates allowed)
    pub concepts: Vec<String>,
}

impl Node {
    /// Create a new node
    pub fn new(id: NodeId, text: impl Into<String>, concepts: Vec<String>) -> Self {
        Self {
            id,
            text: text.into(),
            concepts,
        }
    }

    /// The node's concepts with duplicates collapsed
    pub fn concept_set(&self) -> BTreeSet<&str> {
        self.concepts.iter().map(String::as_str).collect()
    }

    /// Check whether the node carries the given concept
    pub fn has_concept(&self, concept: &str) -> bool {
        self.concepts.iter().any(|c| c == concept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concept_set_collapses_duplicates() {
        let node = Node::new(
            NodeId::new(1),
            "note",
            vec!["a".into(), "b".into(), "a".into()],
        );
        assert_eq!(node.concepts.len(), 3);
        assert_eq!(node.concept_set().len(), 2);
    }

    #[test]
    fn node_id_serializes_as_integer() {
        let json = serde_json::to_string(&NodeId::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
