//! Core concept-graph data structures

mod concept_graph;
mod edge;
mod engine;
mod node;
mod similarity;
mod vertex;


pub use concept_graph::{ConceptGraph, GraphStats, IngestReport};
pub use edge::Edge;
pub use engine::{GraphEngine, GraphError, GraphResult, NodeNeighborhood};
pub use node::{Node, NodeId};
pub use similarity::jaccard;
pub use vertex::Vertex;
