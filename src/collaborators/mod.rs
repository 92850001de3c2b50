//! Third-party text collaborators: speech-to-text and LLM-derived text
//!
//! Each collaborator is an async trait so the pipeline does not depend on
//! how a provider is reached. Implementations:
//! - `AssemblyAiClient`: speech-to-text over the AssemblyAI REST API
//! - `OpenAiClient`: summary, tags and insight via chat completions
//! - `MockCollaborators`: preconfigured outputs (testing)

mod assemblyai;
mod mock;
mod openai;

pub use assemblyai::{AssemblyAiClient, DEFAULT_BASE_URL as ASSEMBLYAI_BASE_URL};
pub use mock::MockCollaborators;
pub use openai::{
    parse_tags, OpenAiClient, DEFAULT_BASE_URL as OPENAI_BASE_URL, DEFAULT_MODEL as OPENAI_MODEL,
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Errors from collaborator calls. Propagated as-is; never retried.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} response missing field '{field}'")]
    MissingField {
        service: &'static str,
        field: &'static str,
    },
    #[error("{service} failed: {message}")]
    Failed {
        service: &'static str,
        message: String,
    },
    #[error("{service} returned an empty response")]
    EmptyResponse { service: &'static str },
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Pipeline stage a collaborator serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Transcribe,
    Summarize,
    Tag,
    Insight,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Transcribe => "transcribe",
            Stage::Summarize => "summarize",
            Stage::Tag => "tag",
            Stage::Insight => "insight",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speech-to-text
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> CollaboratorResult<String>;
}

/// Text summarization
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> CollaboratorResult<String>;
}

/// Concept extraction.
///
/// `vocabulary` lists concepts already in the graph so the provider can
/// reuse existing labels; an empty slice is always valid.
#[async_trait]
pub trait Tagger: Send + Sync {
    async fn tag(&self, text: &str, vocabulary: &[String]) -> CollaboratorResult<Vec<String>>;
}

/// Insight generation over a group of notes
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate_insight(
        &self,
        notes: &[String],
        vocabulary: &[String],
    ) -> CollaboratorResult<String>;
}

/// The full set of collaborators the pipeline drives
#[derive(Clone)]
pub struct Collaborators {
    pub transcriber: Arc<dyn Transcriber>,
    pub summarizer: Arc<dyn Summarizer>,
    pub tagger: Arc<dyn Tagger>,
    pub insight: Arc<dyn InsightGenerator>,
}

impl Collaborators {
    /// Speech-to-text from AssemblyAI, everything else from OpenAI
    pub fn hosted(assemblyai: AssemblyAiClient, openai: OpenAiClient) -> Self {
        let openai = Arc::new(openai);
        Self {
            transcriber: Arc::new(assemblyai),
            summarizer: openai.clone(),
            tagger: openai.clone(),
            insight: openai,
        }
    }

    /// Every stage served by one mock
    pub fn mock(mock: Arc<MockCollaborators>) -> Self {
        Self {
            transcriber: mock.clone(),
            summarizer: mock.clone(),
            tagger: mock.clone(),
            insight: mock,
        }
    }
}

fn http_client(service: &'static str, timeout: std::time::Duration) -> CollaboratorResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .timeout(timeout)
        .build()
        .map_err(|source| CollaboratorError::Transport { service, source })
}

/// Send a request and decode a JSON body, mapping non-2xx to `Status`.
async fn send_json<T: DeserializeOwned>(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> CollaboratorResult<T> {
    let response = request
        .send()
        .await
        .map_err(|source| CollaboratorError::Transport { service, source })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(service, status = status.as_u16(), "provider returned error status");
        return Err(CollaboratorError::Status {
            service,
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|source| CollaboratorError::Transport { service, source })
}
