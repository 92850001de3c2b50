//! OpenAI chat-completions client for summary, tags and insight

use super::{
    http_client, send_json, CollaboratorError, CollaboratorResult, InsightGenerator, Summarizer,
    Tagger,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const SERVICE: &str = "openai";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const SUMMARY_PROMPT: &str = "You are an AI assistant tasked with summarizing a transcription. \
Give a concise summary of the provided transcription.";

const TAGGING_PROMPT: &str = "You are an AI assistant tasked with extracting tags or topics from a transcription. \
List the relevant tags or topics based on the provided transcription. \
Respond with one short tag per line and nothing else.";

const INSIGHT_PROMPT: &str = "You are an AI assistant tasked with generating insights from grouped notes. \
Provide insights based on the provided grouped notes.";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> CollaboratorResult<Self> {
        Ok(Self {
            client: http_client(SERVICE, Duration::from_secs(120))?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// One system + user exchange, returning the first choice's content
    async fn complete(&self, system: &str, user: &str) -> CollaboratorResult<String> {
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": user },
                ],
            }));

        let response: ChatResponse = send_json(SERVICE, request).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or(CollaboratorError::EmptyResponse { service: SERVICE })?;

        if content.trim().is_empty() {
            return Err(CollaboratorError::EmptyResponse { service: SERVICE });
        }
        Ok(content)
    }
}

fn with_vocabulary(prompt: &str, intro: &str, vocabulary: &[String]) -> String {
    if vocabulary.is_empty() {
        prompt.to_string()
    } else {
        format!("{prompt}\n{intro}: {}", vocabulary.join(", "))
    }
}

#[async_trait]
impl Summarizer for OpenAiClient {
    async fn summarize(&self, text: &str) -> CollaboratorResult<String> {
        self.complete(SUMMARY_PROMPT, text).await
    }
}

#[async_trait]
impl Tagger for OpenAiClient {
    async fn tag(&self, text: &str, vocabulary: &[String]) -> CollaboratorResult<Vec<String>> {
        let system = with_vocabulary(
            TAGGING_PROMPT,
            "Reuse these existing tags where they fit",
            vocabulary,
        );
        let raw = self.complete(&system, text).await?;
        Ok(parse_tags(&raw))
    }
}

#[async_trait]
impl InsightGenerator for OpenAiClient {
    async fn generate_insight(
        &self,
        notes: &[String],
        vocabulary: &[String],
    ) -> CollaboratorResult<String> {
        let system = with_vocabulary(
            INSIGHT_PROMPT,
            "Concepts already in the knowledge graph",
            vocabulary,
        );
        self.complete(&system, &notes.join("\n")).await
    }
}

/// Turn a one-tag-per-line model reply into normalized concept labels.
///
/// Strips list markers (`-`, `*`, `•`, `1. `, `2) `), hash prefixes and
/// surrounding quotes, then trims and lowercases. Blank lines are dropped.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            let line = line.trim();
            let line = line.trim_start_matches(['-', '*', '•']).trim_start();
            let line = strip_numbering(line);
            let line = line.trim_start_matches('#');
            line.trim().trim_matches(['"', '\'']).trim().to_lowercase()
        })
        .filter(|tag| !tag.is_empty())
        .collect()
}

fn strip_numbering(line: &str) -> &str {
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return line;
    }
    match line[digits..].strip_prefix(['.', ')']) {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => line,
    }
}
