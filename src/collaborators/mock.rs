//! Mock collaborators for testing — return preconfigured outputs.

use super::{
    CollaboratorError, CollaboratorResult, InsightGenerator, Stage, Summarizer, Tagger,
    Transcriber,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

const SERVICE: &str = "mock";

/// Serves every stage from fixed values, optionally failing chosen stages.
///
/// Records the vocabulary handed to each `tag` call so tests can check what
/// the pipeline fed the tagger.
pub struct MockCollaborators {
    transcription: String,
    summary: String,
    tags: Vec<String>,
    insight: String,
    failing: HashSet<Stage>,
    calls: Mutex<Vec<Stage>>,
    vocabularies: Mutex<Vec<Vec<String>>>,
}

impl Default for MockCollaborators {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCollaborators {
    pub fn new() -> Self {
        Self {
            transcription: "mock transcription".to_string(),
            summary: "mock summary".to_string(),
            tags: Vec::new(),
            insight: "mock insight".to_string(),
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
            vocabularies: Mutex::new(Vec::new()),
        }
    }

    pub fn with_transcription(mut self, text: impl Into<String>) -> Self {
        self.transcription = text.into();
        self
    }

    pub fn with_summary(mut self, text: impl Into<String>) -> Self {
        self.summary = text.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_insight(mut self, text: impl Into<String>) -> Self {
        self.insight = text.into();
        self
    }

    /// Make `stage` fail with `CollaboratorError::Failed`
    pub fn failing_at(mut self, stage: Stage) -> Self {
        self.failing.insert(stage);
        self
    }

    /// Stages invoked so far, in call order
    pub fn calls(&self) -> Vec<Stage> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Vocabulary passed to each `tag` call
    pub fn vocabularies(&self) -> Vec<Vec<String>> {
        self.vocabularies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn enter(&self, stage: Stage) -> CollaboratorResult<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(stage);
        if self.failing.contains(&stage) {
            return Err(CollaboratorError::Failed {
                service: SERVICE,
                message: format!("mock failure at {stage}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transcriber for MockCollaborators {
    async fn transcribe(&self, _audio: &[u8]) -> CollaboratorResult<String> {
        self.enter(Stage::Transcribe)?;
        Ok(self.transcription.clone())
    }
}

#[async_trait]
impl Summarizer for MockCollaborators {
    async fn summarize(&self, _text: &str) -> CollaboratorResult<String> {
        self.enter(Stage::Summarize)?;
        Ok(self.summary.clone())
    }
}

#[async_trait]
impl Tagger for MockCollaborators {
    async fn tag(&self, _text: &str, vocabulary: &[String]) -> CollaboratorResult<Vec<String>> {
        self.vocabularies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(vocabulary.to_vec());
        self.enter(Stage::Tag)?;
        Ok(self.tags.clone())
    }
}

#[async_trait]
impl InsightGenerator for MockCollaborators {
    async fn generate_insight(
        &self,
        _notes: &[String],
        _vocabulary: &[String],
    ) -> CollaboratorResult<String> {
        self.enter(Stage::Insight)?;
        Ok(self.insight.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_configured_values() {
        let mock = MockCollaborators::new()
            .with_transcription("hello")
            .with_tags(["a", "b"]);

        assert_eq!(mock.transcribe(b"audio").await.unwrap(), "hello");
        assert_eq!(mock.tag("hello", &[]).await.unwrap(), vec!["a", "b"]);
        assert_eq!(mock.calls(), vec![Stage::Transcribe, Stage::Tag]);
    }

    #[tokio::test]
    async fn mock_failing_stage_returns_error() {
        let mock = MockCollaborators::new().failing_at(Stage::Summarize);

        let err = mock.summarize("text").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Failed { .. }));
        assert!(mock.generate_insight(&[], &[]).await.is_ok());
    }
}
