//! HTTP error mapping

use crate::collaborators::Stage;
use crate::graph::GraphError;
use crate::pipeline::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Errors surfaced by request handlers
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Error response body for HTTP endpoints
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

impl ServerError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Pipeline(PipelineError::EmptyAudio) => (StatusCode::BAD_REQUEST, "EMPTY_AUDIO"),
            Self::Pipeline(PipelineError::Collaborator { .. }) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
            }
            Self::Graph(GraphError::NodeNotFound(_)) => (StatusCode::NOT_FOUND, "NODE_NOT_FOUND"),
            Self::Pipeline(PipelineError::Graph(_) | PipelineError::Storage(_))
            | Self::Graph(GraphError::Storage(_))
            | Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            Self::Pipeline(PipelineError::Task(_))
            | Self::Graph(GraphError::IdsExhausted)
            | Self::Task(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        } else {
            tracing::warn!(error = %self, code, "request rejected");
        }

        let stage = match &self {
            Self::Pipeline(PipelineError::Collaborator { stage, .. }) => Some(*stage),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.to_string(),
            code,
            stage,
        };
        (status, Json(body)).into_response()
    }
}
