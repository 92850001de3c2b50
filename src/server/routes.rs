//! Route definitions

use super::handlers;
use crate::pipeline::NotePipeline;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the router; audio bodies above `max_upload_bytes` get 413.
pub fn create_router(pipeline: Arc<NotePipeline>, max_upload_bytes: usize) -> Router {
    let graph = Router::new()
        .route("/stats", get(handlers::graph_stats))
        .route("/concepts", get(handlers::graph_concepts))
        .route("/nodes/{id}", get(handlers::graph_node));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/upload", post(handlers::upload))
        .route("/transcribe", post(handlers::transcribe))
        .nest("/graph", graph)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}
