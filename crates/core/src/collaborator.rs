//! Collaborator traits: the external services Quill consumes.
//!
//! None of these are implemented in the core. The router and memory store
//! hold them as `Arc<dyn Trait>` and wrap every call in a timeout; any error
//! returned here is converted into a fallback transition by the caller.
//!
//! Implementations: `quill-providers` (OpenAI-compatible HTTP),
//! `quill-memory` (session stores), and test doubles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CollaboratorError, PersistenceError};

/// A large language model that answers a single prompt with text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// A human-readable name (e.g., "openai", "scripted").
    fn name(&self) -> &str;

    /// Send a prompt and return the raw reply text.
    async fn send(&self, prompt: &str) -> std::result::Result<String, CollaboratorError>;
}

/// A text-embedding model.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    /// Embed every text; the output has one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, CollaboratorError>;
}

/// The shape of summary requested from a [`Summarizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryKind {
    #[default]
    KeyPoints,
    Tldr,
    Headline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    #[default]
    Short,
    Medium,
    Long,
}

/// Options passed along with a summarization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryOptions {
    pub kind: SummaryKind,
    pub length: SummaryLength,
}

impl SummaryOptions {
    /// Short key-points form, used for response compaction.
    pub fn key_points() -> Self {
        Self {
            kind: SummaryKind::KeyPoints,
            length: SummaryLength::Short,
        }
    }
}

/// A text summarization service.
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    async fn summarize(
        &self,
        text: &str,
        options: SummaryOptions,
    ) -> std::result::Result<String, CollaboratorError>;
}

/// Session-scoped key-value persistence.
///
/// The host clears it at session end. Implementations: in-memory, file, no-op.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The backend name (e.g., "memory", "file", "none").
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> std::result::Result<Option<String>, PersistenceError>;

    async fn set(&self, key: &str, value: &str) -> std::result::Result<(), PersistenceError>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> std::result::Result<(), PersistenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoModel;

    #[async_trait]
    impl LanguageModel for EchoModel {
        fn name(&self) -> &str {
            "echo"
        }

        async fn send(&self, prompt: &str) -> std::result::Result<String, CollaboratorError> {
            Ok(prompt.to_string())
        }
    }

    #[test]
    fn key_points_defaults() {
        let options = SummaryOptions::key_points();
        assert_eq!(options, SummaryOptions::default());
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("key-points"));
        assert!(json.contains("short"));
    }

    #[tokio::test]
    async fn language_model_is_object_safe() {
        let model: std::sync::Arc<dyn LanguageModel> = std::sync::Arc::new(EchoModel);
        assert_eq!(model.send("hello").await.unwrap(), "hello");
        assert_eq!(model.name(), "echo");
    }
}
