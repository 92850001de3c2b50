//! Storage backends
//!
//! The concept graph is persisted through the `GraphStore` trait; the
//! primary implementation is `FlatFileStore`. Processed recordings live in
//! SQLite via `RecordingStore`.

pub mod flatfile;
mod sqlite;
mod traits;

pub use flatfile::{read_graph, write_graph, FlatFileStore};
pub use sqlite::{NewRecording, Recording, RecordingStore};
pub use traits::{GraphStore, StorageError, StorageResult};
