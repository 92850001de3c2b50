//! ConceptGraph: the aggregate of notes, similarity edges and shared-concept vertices

use super::edge::Edge;
use super::engine::{GraphError, GraphResult};
use super::node::{Node, NodeId};
use super::similarity::jaccard;
use super::vertex::Vertex;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Summary counts for a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub vertices: usize,
    pub concepts: usize,
}

/// What a single `ingest` call added
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Identity allocated to the new node
    pub node_id: NodeId,
    /// Number of edges appended
    pub edges_added: usize,
    /// Number of vertices appended
    pub vertices_added: usize,
}

/// Append-only concept graph
///
/// Owns its identity allocator: every node added through [`ingest`](Self::ingest)
/// gets an id strictly greater than any id allocated or restored before.
#[derive(Debug, Clone)]
pub struct ConceptGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    vertices: Vec<Vertex>,
    /// `None` once `u64::MAX` has been handed out
    next_id: Option<u64>,
}

impl Default for ConceptGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ConceptGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            vertices: Vec::new(),
            next_id: Some(1),
        }
    }

    /// Rebuild a graph from previously persisted parts.
    ///
    /// References are taken as given; the allocator resumes after the
    /// highest node id present.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>, vertices: Vec<Vertex>) -> Self {
        let next_id = match nodes.iter().map(|n| n.id.get()).max() {
            Some(max) => max.checked_add(1),
            None => Some(1),
        };
        Self {
            nodes,
            edges,
            vertices,
            next_id,
        }
    }

    /// Add a note and link it to every existing node it shares concepts with.
    ///
    /// One edge per sharing node, weighted by Jaccard similarity, plus one
    /// vertex per shared concept. Earlier edges are never revised, so
    /// ingesting the same note twice yields parallel edges.
    ///
    /// Fails only with [`GraphError::IdsExhausted`], leaving the graph as it was.
    pub fn ingest(
        &mut self,
        text: impl Into<String>,
        concepts: Vec<String>,
    ) -> GraphResult<IngestReport> {
        let id = self.allocate_id()?;
        self.nodes.push(Node::new(id, text, concepts));
        let edges_before = self.edges.len();
        let vertices_before = self.vertices.len();

        let new_node = &self.nodes[self.nodes.len() - 1];
        for other in &self.nodes {
            if other.id == id {
                continue;
            }

            let weight = jaccard(&new_node.concepts, &other.concepts);
            if weight <= 0.0 {
                continue;
            }
            self.edges.push(Edge::new(id, other.id, weight));

            let mut seen = HashSet::new();
            for concept in &new_node.concepts {
                if seen.insert(concept.as_str()) && other.has_concept(concept) {
                    self.vertices.push(Vertex::new(id, other.id, concept.clone()));
                }
            }
        }

        let report = IngestReport {
            node_id: id,
            edges_added: self.edges.len() - edges_before,
            vertices_added: self.vertices.len() - vertices_before,
        };
        tracing::debug!(
            node_id = %id,
            edges = report.edges_added,
            vertices = report.vertices_added,
            "ingested note"
        );
        Ok(report)
    }

    /// Union of every node's concepts
    pub fn all_concepts(&self) -> BTreeSet<String> {
        self.nodes
            .iter()
            .flat_map(|n| n.concepts.iter().cloned())
            .collect()
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Check if a node exists
    pub fn has_node(&self, id: NodeId) -> bool {
        self.get_node(id).is_some()
    }

    /// Edges with `id` at either end
    pub fn edges_for(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.touches(id))
    }

    /// Vertices between `a` and `b`, in either direction
    pub fn shared_concepts(&self, a: NodeId, b: NodeId) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter().filter(move |v| {
            (v.source == a && v.target == b) || (v.source == b && v.target == a)
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Identity the next ingested node will receive, if any remain
    pub fn next_id(&self) -> Option<NodeId> {
        self.next_id.map(NodeId::new)
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.node_count(),
            edges: self.edge_count(),
            vertices: self.vertex_count(),
            concepts: self.all_concepts().len(),
        }
    }

    fn allocate_id(&mut self) -> GraphResult<NodeId> {
        let id = self.next_id.ok_or(GraphError::IdsExhausted)?;
        self.next_id = id.checked_add(1);
        Ok(NodeId::new(id))
    }
}
