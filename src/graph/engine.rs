//! GraphEngine: the concept graph behind a single lock, bound to its store

use super::concept_graph::{ConceptGraph, GraphStats, IngestReport};
use super::edge::Edge;
use super::node::{Node, NodeId};
use crate::storage::{GraphStore, StorageError};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Errors that can occur in engine operations
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node id space exhausted")]
    IdsExhausted,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for engine operations
pub type GraphResult<T> = Result<T, GraphError>;

/// A node together with every edge touching it
#[derive(Debug, Clone)]
pub struct NodeNeighborhood {
    pub node: Node,
    pub edges: Vec<Edge>,
}

/// The concept graph engine
///
/// Graph mutation and persistence share one mutual-exclusion boundary, so
/// concurrent ingests are serialized and the durable copy always matches
/// the in-memory graph.
pub struct GraphEngine {
    graph: Mutex<ConceptGraph>,
    store: Option<Arc<dyn GraphStore>>,
}

impl std::fmt::Debug for GraphEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphEngine")
            .field("stats", &self.stats())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl Default for GraphEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphEngine {
    /// Create an in-memory engine with no persistence
    pub fn new() -> Self {
        Self {
            graph: Mutex::new(ConceptGraph::new()),
            store: None,
        }
    }

    /// Create an engine backed by `store`, restoring whatever it holds.
    pub fn open(store: Arc<dyn GraphStore>) -> GraphResult<Self> {
        let graph = store.load_graph()?;
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            vertices = graph.vertex_count(),
            "concept graph restored"
        );
        Ok(Self {
            graph: Mutex::new(graph),
            store: Some(store),
        })
    }

    /// Ingest a note and persist the result.
    ///
    /// The note is applied to a copy of the graph; the live graph is only
    /// replaced once the store accepted the copy, so a failed write leaves
    /// both the memory and disk state untouched.
    pub fn ingest(&self, text: impl Into<String>, concepts: Vec<String>) -> GraphResult<IngestReport> {
        let mut graph = self.lock();
        let mut next = graph.clone();
        let report = next.ingest(text, concepts)?;

        if let Some(store) = &self.store {
            store.save_graph(&next)?;
        }
        *graph = next;

        tracing::info!(
            node_id = %report.node_id,
            edges_added = report.edges_added,
            vertices_added = report.vertices_added,
            "concept graph updated"
        );
        Ok(report)
    }

    /// Union of all concepts in the graph
    pub fn all_concepts(&self) -> BTreeSet<String> {
        self.lock().all_concepts()
    }

    pub fn stats(&self) -> GraphStats {
        self.lock().stats()
    }

    /// Look up a node and the edges touching it
    pub fn neighborhood(&self, id: NodeId) -> GraphResult<NodeNeighborhood> {
        let graph = self.lock();
        let node = graph.get_node(id).cloned().ok_or(GraphError::NodeNotFound(id))?;
        let edges = graph.edges_for(id).cloned().collect();
        Ok(NodeNeighborhood { node, edges })
    }

    /// Clone of the current graph
    pub fn snapshot(&self) -> ConceptGraph {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, ConceptGraph> {
        // The graph is only replaced wholesale after a successful save, so a
        // panic while holding the lock cannot leave it half-updated.
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
