//! Shared fixtures for integration tests

#![allow(dead_code)]

use notegraph::collaborators::MockCollaborators;
use notegraph::{Collaborators, FlatFileStore, GraphEngine, NotePipeline, RecordingStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A pipeline over mock collaborators with its stores in a temp dir
pub struct TestApp {
    pub dir: TempDir,
    pub mock: Arc<MockCollaborators>,
    pub pipeline: Arc<NotePipeline>,
}

impl TestApp {
    pub fn new(mock: MockCollaborators) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mock = Arc::new(mock);
        let pipeline = Arc::new(open_pipeline(dir.path(), Collaborators::mock(mock.clone())));
        Self {
            dir,
            mock,
            pipeline,
        }
    }

    /// Reopen the stores in the same directory, as after a restart
    pub fn restart(&self, mock: MockCollaborators) -> Arc<NotePipeline> {
        Arc::new(open_pipeline(
            self.dir.path(),
            Collaborators::mock(Arc::new(mock)),
        ))
    }

    pub fn graph_path(&self) -> PathBuf {
        graph_path(self.dir.path())
    }
}

fn graph_path(dir: &Path) -> PathBuf {
    dir.join("knowledge_graph.txt")
}

fn open_pipeline(dir: &Path, collaborators: Collaborators) -> NotePipeline {
    let engine = GraphEngine::open(Arc::new(FlatFileStore::new(graph_path(dir)))).expect("open graph");
    let recordings = RecordingStore::open(dir.join("notegraph.db")).expect("open recordings");
    NotePipeline::new(
        collaborators,
        Arc::new(engine),
        Arc::new(recordings),
        dir.join("recordings"),
    )
}
