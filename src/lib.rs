//! Notegraph: voice notes linked by shared concepts
//!
//! Each uploaded recording is transcribed, summarized and tagged by hosted
//! collaborators, then ingested into an append-only concept graph where
//! notes that share tags are linked with Jaccard-weighted edges.
//!
//! # Core Concepts
//!
//! - **Nodes**: one transcribed note with its concept labels
//! - **Edges**: weighted similarity between two notes sharing a concept
//! - **Vertices**: the individual shared concepts justifying an edge
//!
//! # Example
//!
//! ```
//! use notegraph::GraphEngine;
//!
//! let engine = GraphEngine::new();
//! engine.ingest("rust ownership", vec!["rust".into(), "memory".into()]).unwrap();
//! let report = engine.ingest("rust async", vec!["rust".into(), "async".into()]).unwrap();
//! assert_eq!(report.edges_added, 1);
//! ```

pub mod collaborators;
pub mod config;
mod graph;
pub mod pipeline;
pub mod server;
pub mod storage;

pub use collaborators::{CollaboratorError, Collaborators, Stage};
pub use config::{Config, ConfigError};
pub use graph::{
    jaccard, ConceptGraph, Edge, GraphEngine, GraphError, GraphResult, GraphStats, IngestReport,
    Node, NodeId, NodeNeighborhood, Vertex,
};
pub use pipeline::{NoteOutcome, NotePipeline, PipelineError};
pub use storage::{FlatFileStore, GraphStore, RecordingStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
