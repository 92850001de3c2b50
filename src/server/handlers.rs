//! HTTP request handlers
//!
//! Graph and recording reads take blocking locks, so they run on the
//! blocking pool.

use super::error::ServerError;
use crate::graph::{Edge, GraphStats, Node, NodeId};
use crate::pipeline::{NoteOutcome, NotePipeline};
use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

type AppState = State<Arc<NotePipeline>>;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    pub transcription: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub graph: GraphStats,
    pub recordings: usize,
}

#[derive(Debug, Serialize)]
pub struct NodeResponse {
    pub node: Node,
    pub edges: Vec<Edge>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
    })
}

/// POST /upload — raw audio body, full pipeline
pub async fn upload(
    State(pipeline): AppState,
    body: Bytes,
) -> Result<Json<NoteOutcome>, ServerError> {
    let outcome = pipeline.process(body.to_vec()).await?;
    Ok(Json(outcome))
}

/// POST /transcribe — raw audio body, transcription only
pub async fn transcribe(
    State(pipeline): AppState,
    body: Bytes,
) -> Result<Json<TranscriptionResponse>, ServerError> {
    let transcription = pipeline.transcribe_only(&body).await?;
    Ok(Json(TranscriptionResponse { transcription }))
}

/// GET /graph/stats
pub async fn graph_stats(State(pipeline): AppState) -> Result<Json<StatsResponse>, ServerError> {
    let engine = pipeline.engine().clone();
    let recordings = pipeline.recordings().clone();
    let response = tokio::task::spawn_blocking(move || -> Result<_, ServerError> {
        Ok(StatsResponse {
            graph: engine.stats(),
            recordings: recordings.count()?,
        })
    })
    .await??;
    Ok(Json(response))
}

/// GET /graph/concepts
pub async fn graph_concepts(State(pipeline): AppState) -> Result<Json<Vec<String>>, ServerError> {
    let engine = pipeline.engine().clone();
    let concepts =
        tokio::task::spawn_blocking(move || engine.all_concepts().into_iter().collect::<Vec<_>>())
            .await?;
    Ok(Json(concepts))
}

/// GET /graph/nodes/{id}
pub async fn graph_node(
    State(pipeline): AppState,
    Path(id): Path<u64>,
) -> Result<Json<NodeResponse>, ServerError> {
    let engine = pipeline.engine().clone();
    let hood = tokio::task::spawn_blocking(move || engine.neighborhood(NodeId::new(id))).await??;
    Ok(Json(NodeResponse {
        node: hood.node,
        edges: hood.edges,
    }))
}
