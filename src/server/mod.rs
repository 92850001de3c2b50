//! HTTP front end
//!
//! Wires the configured stores and hosted collaborators into a
//! [`NotePipeline`] and serves it over axum until ctrl-c or SIGTERM.

mod error;
mod handlers;
mod routes;

pub use error::{ErrorResponse, ServerError};
pub use handlers::{HealthResponse, NodeResponse, StatsResponse, TranscriptionResponse};
pub use routes::create_router;

use crate::collaborators::{AssemblyAiClient, CollaboratorError, Collaborators, OpenAiClient};
use crate::config::{Config, ConfigError};
use crate::graph::{GraphEngine, GraphError};
use crate::pipeline::NotePipeline;
use crate::storage::{FlatFileStore, RecordingStore, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;

/// Failures before or while serving
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to open graph: {0}")]
    Graph(#[from] GraphError),

    #[error("Failed to open recording store: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] CollaboratorError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(std::io::Error),
}

/// Open the stores under `config.storage` and connect the hosted services.
pub fn build_pipeline(config: &Config) -> Result<NotePipeline, StartupError> {
    let assemblyai = AssemblyAiClient::new(
        config.assemblyai.base_url.clone(),
        config.assemblyai.api_key()?,
    )?
    .with_polling(config.assemblyai.poll_interval(), config.assemblyai.max_polls);
    let openai = OpenAiClient::new(config.openai.base_url.clone(), config.openai.api_key()?)?
        .with_model(config.openai.model.clone());

    let (engine, recordings) = open_stores(config)?;
    Ok(NotePipeline::new(
        Collaborators::hosted(assemblyai, openai),
        Arc::new(engine),
        Arc::new(recordings),
        config.storage.recordings_path(),
    ))
}

/// Load the concept graph and open the recording database.
pub fn open_stores(config: &Config) -> Result<(GraphEngine, RecordingStore), StartupError> {
    let storage = &config.storage;
    std::fs::create_dir_all(&storage.data_dir).map_err(StorageError::from)?;

    let graph_path = storage.graph_path();
    let engine = GraphEngine::open(Arc::new(FlatFileStore::new(&graph_path)))?;
    let stats = engine.stats();
    tracing::info!(
        path = %graph_path.display(),
        nodes = stats.nodes,
        edges = stats.edges,
        "concept graph loaded"
    );

    let recordings = RecordingStore::open(storage.database_path())?;
    Ok((engine, recordings))
}

/// Serve `pipeline` on the configured address until shutdown.
pub async fn serve(config: &Config, pipeline: Arc<NotePipeline>) -> Result<(), StartupError> {
    let addr = config.server.bind_addr();
    let router = create_router(pipeline, config.server.max_upload_bytes);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!(%addr, "notegraph server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("notegraph server stopped");
    Ok(())
}

/// Build everything from `config` and serve.
pub async fn run(config: Config) -> Result<(), StartupError> {
    let pipeline = Arc::new(build_pipeline(&config)?);
    serve(&config, pipeline).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
