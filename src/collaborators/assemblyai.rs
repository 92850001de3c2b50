//! AssemblyAI speech-to-text client
//!
//! Upload the raw audio, request a transcript for the returned URL, then
//! poll the transcript until it completes or fails.

use super::{http_client, send_json, CollaboratorError, CollaboratorResult, Transcriber};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const SERVICE: &str = "assemblyai";

pub const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: Option<String>,
    status: Option<String>,
    text: Option<String>,
    error: Option<String>,
}

pub struct AssemblyAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl AssemblyAiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> CollaboratorResult<Self> {
        Ok(Self {
            client: http_client(SERVICE, Duration::from_secs(120))?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            poll_interval: Duration::from_secs(3),
            max_polls: 200,
        })
    }

    /// Set how often and how many times the transcript status is polled
    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls.max(1);
        self
    }

    async fn upload(&self, audio: &[u8]) -> CollaboratorResult<String> {
        let request = self
            .client
            .post(format!("{}/v2/upload", self.base_url))
            .header("authorization", &self.api_key)
            .header("content-type", "application/octet-stream")
            .body(audio.to_vec());

        let response: UploadResponse = send_json(SERVICE, request).await?;
        response.upload_url.ok_or(CollaboratorError::MissingField {
            service: SERVICE,
            field: "upload_url",
        })
    }

    async fn request_transcript(&self, audio_url: &str) -> CollaboratorResult<String> {
        let request = self
            .client
            .post(format!("{}/v2/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&json!({ "audio_url": audio_url }));

        let response: TranscriptResponse = send_json(SERVICE, request).await?;
        response.id.ok_or(CollaboratorError::MissingField {
            service: SERVICE,
            field: "id",
        })
    }

    async fn await_transcript(&self, id: &str) -> CollaboratorResult<String> {
        for attempt in 1..=self.max_polls {
            let request = self
                .client
                .get(format!("{}/v2/transcript/{id}", self.base_url))
                .header("authorization", &self.api_key);
            let response: TranscriptResponse = send_json(SERVICE, request).await?;

            match response.status.as_deref() {
                Some("completed") => {
                    return response.text.ok_or(CollaboratorError::MissingField {
                        service: SERVICE,
                        field: "text",
                    });
                }
                Some("error") => {
                    return Err(CollaboratorError::Failed {
                        service: SERVICE,
                        message: response
                            .error
                            .unwrap_or_else(|| "transcription failed".to_string()),
                    });
                }
                Some(status) => {
                    tracing::debug!(transcript_id = id, status, attempt, "transcript not ready");
                }
                None => {
                    return Err(CollaboratorError::MissingField {
                        service: SERVICE,
                        field: "status",
                    });
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(CollaboratorError::Failed {
            service: SERVICE,
            message: format!("transcript {id} not ready after {} polls", self.max_polls),
        })
    }
}

#[async_trait]
impl Transcriber for AssemblyAiClient {
    async fn transcribe(&self, audio: &[u8]) -> CollaboratorResult<String> {
        let upload_url = self.upload(audio).await?;
        let transcript_id = self.request_transcript(&upload_url).await?;
        tracing::debug!(transcript_id, "transcript requested");
        self.await_transcript(&transcript_id).await
    }
}
