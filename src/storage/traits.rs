//! Storage trait definitions

use crate::graph::ConceptGraph;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unsupported graph format version: {0}")]
    UnsupportedVersion(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),
}

impl StorageError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable home for the concept graph
///
/// Implementations must be thread-safe (Send + Sync); the engine calls them
/// while holding its graph lock.
pub trait GraphStore: Send + Sync {
    /// Load the stored graph, or an empty graph if nothing was stored yet
    fn load_graph(&self) -> StorageResult<ConceptGraph>;

    /// Replace the stored graph with `graph`
    fn save_graph(&self, graph: &ConceptGraph) -> StorageResult<()>;
}
