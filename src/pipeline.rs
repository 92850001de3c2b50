//! Voice note pipeline
//!
//! One upload runs start to finish:
//! 1. Transcribe the audio
//! 2. Summarize the transcription
//! 3. Tag it, offering the graph's existing concepts as vocabulary
//! 4. Generate an insight
//! 5. Store the audio file
//! 6. Ingest the note into the concept graph (persisted under the graph lock)
//! 7. Record everything in the recording store
//!
//! Any failure aborts the request; there is no partial-success path.

use crate::collaborators::{CollaboratorError, Collaborators, Stage};
use crate::graph::{GraphEngine, GraphError, IngestReport, NodeId};
use crate::storage::{NewRecording, RecordingStore, StorageError};
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Errors that abort a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Audio upload is empty")]
    EmptyAudio,

    #[error("{stage} failed: {source}")]
    Collaborator {
        stage: Stage,
        #[source]
        source: CollaboratorError,
    },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Everything produced for one voice note
#[derive(Debug, Clone, Serialize)]
pub struct NoteOutcome {
    pub recording_id: i64,
    pub node_id: NodeId,
    pub transcription: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub insight: String,
    pub edges_added: usize,
    pub vertices_added: usize,
}

pub struct NotePipeline {
    collaborators: Collaborators,
    engine: Arc<GraphEngine>,
    recordings: Arc<RecordingStore>,
    recordings_dir: PathBuf,
}

impl std::fmt::Debug for NotePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotePipeline")
            .field("engine", &self.engine)
            .field("recordings_dir", &self.recordings_dir)
            .finish_non_exhaustive()
    }
}

impl NotePipeline {
    pub fn new(
        collaborators: Collaborators,
        engine: Arc<GraphEngine>,
        recordings: Arc<RecordingStore>,
        recordings_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            collaborators,
            engine,
            recordings,
            recordings_dir: recordings_dir.into(),
        }
    }

    pub fn engine(&self) -> &Arc<GraphEngine> {
        &self.engine
    }

    pub fn recordings(&self) -> &Arc<RecordingStore> {
        &self.recordings
    }

    /// Transcribe without touching the graph or the stores
    pub async fn transcribe_only(&self, audio: &[u8]) -> Result<String, PipelineError> {
        if audio.is_empty() {
            return Err(PipelineError::EmptyAudio);
        }
        timed(Stage::Transcribe, self.collaborators.transcriber.transcribe(audio)).await
    }

    /// Run the full pipeline for one uploaded recording
    pub async fn process(&self, audio: Vec<u8>) -> Result<NoteOutcome, PipelineError> {
        if audio.is_empty() {
            return Err(PipelineError::EmptyAudio);
        }
        let started = Instant::now();
        tracing::info!(bytes = audio.len(), "processing voice note");

        let transcription =
            timed(Stage::Transcribe, self.collaborators.transcriber.transcribe(&audio)).await?;
        tracing::info!(chars = transcription.len(), "transcription received");

        let summary =
            timed(Stage::Summarize, self.collaborators.summarizer.summarize(&transcription)).await?;

        let engine = self.engine.clone();
        let vocabulary = tokio::task::spawn_blocking(move || {
            engine.all_concepts().into_iter().collect::<Vec<String>>()
        })
        .await?;
        let tags = timed(
            Stage::Tag,
            self.collaborators.tagger.tag(&transcription, &vocabulary),
        )
        .await?;
        tracing::info!(?tags, "tags extracted");

        let notes = vec![transcription.clone()];
        let insight = timed(
            Stage::Insight,
            self.collaborators.insight.generate_insight(&notes, &vocabulary),
        )
        .await?;

        let audio_path = self.store_audio(audio).await?;
        let (report, recording_id) = match self
            .persist(&audio_path, &transcription, &summary, &tags, &insight)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                discard_audio(&audio_path).await;
                return Err(e);
            }
        };

        tracing::info!(
            recording_id,
            node_id = %report.node_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "voice note processed"
        );

        Ok(NoteOutcome {
            recording_id,
            node_id: report.node_id,
            transcription,
            summary,
            tags,
            insight,
            edges_added: report.edges_added,
            vertices_added: report.vertices_added,
        })
    }

    /// Ingest into the graph, then record the recording with its node id
    async fn persist(
        &self,
        audio_path: &Path,
        transcription: &str,
        summary: &str,
        tags: &[String],
        insight: &str,
    ) -> Result<(IngestReport, i64), PipelineError> {
        let engine = self.engine.clone();
        let (text, concepts) = (transcription.to_string(), tags.to_vec());
        let report = tokio::task::spawn_blocking(move || engine.ingest(text, concepts)).await??;

        let recording = NewRecording {
            audio_path: audio_path.display().to_string(),
            transcription: transcription.to_string(),
            summary: summary.to_string(),
            tags: tags.to_vec(),
            insight: insight.to_string(),
            node_id: Some(report.node_id),
        };
        let recordings = self.recordings.clone();
        let recording_id =
            tokio::task::spawn_blocking(move || recordings.insert(&recording)).await??;
        Ok((report, recording_id))
    }

    async fn store_audio(&self, audio: Vec<u8>) -> Result<PathBuf, PipelineError> {
        let dir = self.recordings_dir.clone();
        let path = dir.join(format!("{}.audio", uuid::Uuid::new_v4()));
        if let Err(e) = write_file(&dir, &path, audio).await {
            discard_audio(&path).await;
            return Err(e);
        }
        tracing::debug!(path = %path.display(), "audio stored");
        Ok(path)
    }
}

async fn write_file(dir: &Path, path: &Path, bytes: Vec<u8>) -> Result<(), PipelineError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(StorageError::from)?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(StorageError::from)?;
    Ok(())
}

async fn discard_audio(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "discarded audio of failed note"),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to discard audio of failed note"
        ),
    }
}

/// Await a collaborator call, logging how long it took
async fn timed<T>(
    stage: Stage,
    call: impl Future<Output = Result<T, CollaboratorError>>,
) -> Result<T, PipelineError> {
    let started = Instant::now();
    let result = call.await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(value) => {
            tracing::debug!(%stage, elapsed_ms, "stage finished");
            Ok(value)
        }
        Err(source) => {
            tracing::error!(%stage, elapsed_ms, error = %source, "stage failed");
            Err(PipelineError::Collaborator { stage, source })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MockCollaborators;
    use crate::graph::ConceptGraph;
    use crate::storage::{FlatFileStore, GraphStore, StorageResult};

    struct ReadOnlyStore;

    impl GraphStore for ReadOnlyStore {
        fn load_graph(&self) -> StorageResult<ConceptGraph> {
            Ok(ConceptGraph::new())
        }

        fn save_graph(&self, _graph: &ConceptGraph) -> StorageResult<()> {
            Err(StorageError::Io(std::io::Error::other("read-only filesystem")))
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        mock: Arc<MockCollaborators>,
        pipeline: NotePipeline,
        graph_path: PathBuf,
    }

    fn fixture(mock: MockCollaborators) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let graph_path = dir.path().join("graph.txt");
        let engine = GraphEngine::open(Arc::new(FlatFileStore::new(&graph_path))).unwrap();
        let mock = Arc::new(mock);
        let pipeline = NotePipeline::new(
            Collaborators::mock(mock.clone()),
            Arc::new(engine),
            Arc::new(RecordingStore::open_in_memory().unwrap()),
            dir.path().join("recordings"),
        );
        Fixture {
            _dir: dir,
            mock,
            pipeline,
            graph_path,
        }
    }

    #[tokio::test]
    async fn process_runs_every_stage_and_persists() {
        let fx = fixture(
            MockCollaborators::new()
                .with_transcription("we talked about rust and audio")
                .with_tags(["rust", "audio"]),
        );

        let outcome = fx.pipeline.process(b"RIFF....".to_vec()).await.unwrap();

        assert_eq!(
            fx.mock.calls(),
            vec![Stage::Transcribe, Stage::Summarize, Stage::Tag, Stage::Insight]
        );
        assert_eq!(outcome.transcription, "we talked about rust and audio");
        assert_eq!(outcome.tags, vec!["rust", "audio"]);
        assert_eq!(outcome.edges_added, 0);

        let stored = fx.pipeline.recordings().get(outcome.recording_id).unwrap().unwrap();
        assert_eq!(stored.node_id, Some(outcome.node_id));
        assert!(Path::new(&stored.audio_path).exists());

        let saved = std::fs::read_to_string(&fx.graph_path).unwrap();
        assert!(saved.contains("Text: we talked about rust and audio"));
    }

    #[tokio::test]
    async fn second_note_links_and_receives_vocabulary() {
        let fx = fixture(MockCollaborators::new().with_tags(["rust", "audio"]));

        fx.pipeline.process(vec![1, 2, 3]).await.unwrap();
        let second = fx.pipeline.process(vec![4, 5, 6]).await.unwrap();

        assert_eq!(second.edges_added, 1);
        assert_eq!(second.vertices_added, 2);

        let vocabularies = fx.mock.vocabularies();
        assert!(vocabularies[0].is_empty());
        assert_eq!(vocabularies[1], vec!["audio", "rust"]);
    }

    #[tokio::test]
    async fn collaborator_failure_aborts_without_side_effects() {
        let fx = fixture(
            MockCollaborators::new()
                .with_tags(["rust"])
                .failing_at(Stage::Insight),
        );

        let err = fx.pipeline.process(vec![1]).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Collaborator { stage: Stage::Insight, .. }
        ));
        assert_eq!(fx.pipeline.engine().stats().nodes, 0);
        assert_eq!(fx.pipeline.recordings().count().unwrap(), 0);
        assert!(!fx.graph_path.exists());
    }

    #[tokio::test]
    async fn empty_audio_rejected() {
        let fx = fixture(MockCollaborators::new());

        assert!(matches!(
            fx.pipeline.process(Vec::new()).await,
            Err(PipelineError::EmptyAudio)
        ));
        assert!(matches!(
            fx.pipeline.transcribe_only(&[]).await,
            Err(PipelineError::EmptyAudio)
        ));
        assert!(fx.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn transcribe_only_leaves_graph_alone() {
        let fx = fixture(MockCollaborators::new().with_transcription("just words"));

        let text = fx.pipeline.transcribe_only(b"audio").await.unwrap();
        assert_eq!(text, "just words");
        assert_eq!(fx.mock.calls(), vec![Stage::Transcribe]);
        assert_eq!(fx.pipeline.engine().stats().nodes, 0);
    }

    #[tokio::test]
    async fn failed_graph_save_discards_stored_audio() {
        let dir = tempfile::tempdir().unwrap();
        let recordings_dir = dir.path().join("recordings");
        let pipeline = NotePipeline::new(
            Collaborators::mock(Arc::new(MockCollaborators::new().with_tags(["rust"]))),
            Arc::new(GraphEngine::open(Arc::new(ReadOnlyStore)).unwrap()),
            Arc::new(RecordingStore::open_in_memory().unwrap()),
            &recordings_dir,
        );

        let err = pipeline.process(vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, PipelineError::Graph(GraphError::Storage(_))));

        let leftover = std::fs::read_dir(&recordings_dir).unwrap().count();
        assert_eq!(leftover, 0);
        assert_eq!(pipeline.recordings().count().unwrap(), 0);
        assert_eq!(pipeline.engine().stats().nodes, 0);
    }

    #[test]
    fn debug_omits_collaborators() {
        let pipeline = NotePipeline::new(
            Collaborators::mock(Arc::new(MockCollaborators::new())),
            Arc::new(GraphEngine::new()),
            Arc::new(RecordingStore::open_in_memory().unwrap()),
            "/tmp/recordings",
        );
        let rendered = format!("{pipeline:?}");
        assert!(rendered.starts_with("NotePipeline"));
        assert!(rendered.contains("recordings_dir"));
    }
}
