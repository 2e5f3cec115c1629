//! OpenAI-compatible HTTP client.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, and any
//! endpoint exposing `/chat/completions` and `/embeddings`.
//!
//! One client implements all three model-backed collaborators:
//! - [`LanguageModel`]: single-turn chat completion
//! - [`Embedder`]: batch embeddings
//! - [`Summarizer`]: chat completion with a summarization instruction

use async_trait::async_trait;
use quill_config::ProviderConfig;
use quill_core::collaborator::{
    Embedder, LanguageModel, SummaryKind, SummaryLength, SummaryOptions, Summarizer,
};
use quill_core::error::CollaboratorError;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// An OpenAI-compatible model endpoint.
pub struct OpenAiCompatClient {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    embedding_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let defaults = ProviderConfig::default();
        // The router and memory store apply their own shorter timeouts
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: defaults.model,
            embedding_model: defaults.embedding_model,
            client,
        }
    }

    /// OpenAI (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Ollama (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    /// Build from configuration. `None` when no API key is configured.
    pub fn from_config(config: &ProviderConfig) -> Option<Self> {
        let api_key = config.api_key.as_deref().filter(|k| !k.trim().is_empty())?;
        Some(
            Self::new("openai-compat", &config.api_url, api_key)
                .with_model(&config.model)
                .with_embedding_model(&config.embedding_model),
        )
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    fn chat_body(&self, prompt: &str, temperature: f32) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": temperature,
            "stream": false,
        })
    }

    /// POST `body` to `path`, mapping transport failures and non-200
    /// statuses to [`CollaboratorError`].
    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, CollaboratorError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(CollaboratorError::Api {
                status_code: status,
                message: "Rate limited".into(),
            });
        }

        if status == 401 || status == 403 {
            return Err(CollaboratorError::Api {
                status_code: status,
                message: "Invalid API key or insufficient permissions".into(),
            });
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(provider = %self.name, status, body = %error_body, "Provider returned error");
            return Err(CollaboratorError::Api {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }

    async fn chat(&self, prompt: &str, temperature: f32) -> Result<String, CollaboratorError> {
        debug!(provider = %self.name, model = %self.model, "Sending completion request");

        let response = self
            .post("/chat/completions", &self.chat_body(prompt, temperature))
            .await?;
        let api_response: ApiResponse = response.json().await.map_err(|e| {
            CollaboratorError::MalformedReply(format!("Failed to parse response: {e}"))
        })?;
        first_choice_content(api_response)
    }
}

fn first_choice_content(api_response: ApiResponse) -> Result<String, CollaboratorError> {
    api_response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| CollaboratorError::ClassifierUnavailable("No choices in response".into()))
}

fn ordered_embeddings(
    api_response: EmbeddingApiResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, CollaboratorError> {
    let mut data = api_response.data;
    if data.len() != expected {
        return Err(CollaboratorError::EmbeddingUnavailable(format!(
            "expected {expected} embeddings, got {}",
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

/// Instruction for a summarization request.
pub fn summary_prompt(text: &str, options: SummaryOptions) -> String {
    let shape = match options.kind {
        SummaryKind::KeyPoints => "the key points of the text as a short bulleted list",
        SummaryKind::Tldr => "a TL;DR of the text",
        SummaryKind::Headline => "a single headline for the text",
    };
    let length = match options.length {
        SummaryLength::Short => "Be brief.",
        SummaryLength::Medium => "Use a moderate amount of detail.",
        SummaryLength::Long => "Be thorough.",
    };
    format!("Write {shape}. {length} Reply with the summary only.\n\nText:\n{text}")
}

#[async_trait]
impl LanguageModel for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, prompt: &str) -> Result<String, CollaboratorError> {
        self.chat(prompt, 0.0).await
    }
}

#[async_trait]
impl Embedder for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CollaboratorError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.embedding_model,
            "input": texts,
            "encoding_format": "float",
        });

        debug!(
            provider = %self.name,
            model = %self.embedding_model,
            count = texts.len(),
            "Sending embedding request"
        );

        let response = self.post("/embeddings", &body).await?;
        let api_resp: EmbeddingApiResponse = response.json().await.map_err(|e| {
            CollaboratorError::MalformedReply(format!("Failed to parse embedding response: {e}"))
        })?;
        ordered_embeddings(api_resp, texts.len())
    }
}

#[async_trait]
impl Summarizer for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn summarize(
        &self,
        text: &str,
        options: SummaryOptions,
    ) -> Result<String, CollaboratorError> {
        let summary = self.chat(&summary_prompt(text, options), 0.3).await?;
        if summary.trim().is_empty() {
            return Err(CollaboratorError::SummarizerUnavailable(
                "empty summary returned".into(),
            ));
        }
        Ok(summary.trim().to_string())
    }
}

// --- Chat API types ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

// --- Embedding API types ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_constructor() {
        let client = OpenAiCompatClient::openai("sk-test");
        assert_eq!(LanguageModel::name(&client), "openai");
        assert_eq!(client.base_url(), "https://api.openai.com/v1");
        assert_eq!(client.model(), "gpt-4o-mini");
        assert_eq!(client.embedding_model(), "text-embedding-3-small");
    }

    #[test]
    fn ollama_constructor() {
        let client = OpenAiCompatClient::ollama(None);
        assert_eq!(Embedder::name(&client), "ollama");
        assert!(client.base_url().contains("localhost:11434"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = OpenAiCompatClient::new("x", "http://localhost:8000/v1/", "k");
        assert_eq!(client.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn from_config_requires_api_key() {
        let mut config = ProviderConfig::default();
        assert!(OpenAiCompatClient::from_config(&config).is_none());

        config.api_key = Some("   ".into());
        assert!(OpenAiCompatClient::from_config(&config).is_none());

        config.api_key = Some("sk-test".into());
        config.model = "llama3".into();
        let client = OpenAiCompatClient::from_config(&config).unwrap();
        assert_eq!(client.model(), "llama3");
    }

    #[test]
    fn chat_body_is_single_user_message() {
        let client = OpenAiCompatClient::openai("k").with_model("gpt-test");
        let body = client.chat_body("classify this", 0.0);
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "classify this");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn parse_chat_response() {
        let data = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"intent\":\"write\"}"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(first_choice_content(parsed).unwrap(), r#"{"intent":"write"}"#);
    }

    #[test]
    fn empty_choices_is_an_error() {
        let parsed: ApiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            first_choice_content(parsed),
            Err(CollaboratorError::ClassifierUnavailable(_))
        ));
    }

    #[test]
    fn parse_embedding_response_in_index_order() {
        let data = r#"{
            "data": [
                {"embedding": [0.4, 0.5, 0.6], "index": 1},
                {"embedding": [0.1, 0.2, 0.3], "index": 0}
            ],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 8, "total_tokens": 8}
        }"#;
        let parsed: EmbeddingApiResponse = serde_json::from_str(data).unwrap();
        let vectors = ordered_embeddings(parsed, 2).unwrap();
        assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
        assert_eq!(vectors[1], vec![0.4, 0.5, 0.6]);
    }

    #[test]
    fn embedding_count_mismatch_is_an_error() {
        let parsed: EmbeddingApiResponse =
            serde_json::from_str(r#"{"data": [{"embedding": [1.0], "index": 0}]}"#).unwrap();
        assert!(ordered_embeddings(parsed, 3).is_err());
    }

    #[test]
    fn summary_prompt_reflects_options() {
        let prompt = summary_prompt("long text", SummaryOptions::key_points());
        assert!(prompt.contains("key points"));
        assert!(prompt.contains("Be brief."));
        assert!(prompt.ends_with("long text"));

        let headline = summary_prompt(
            "t",
            SummaryOptions {
                kind: SummaryKind::Headline,
                length: SummaryLength::Long,
            },
        );
        assert!(headline.contains("single headline"));
    }

    #[tokio::test]
    async fn empty_embedding_batch_skips_request() {
        // Unroutable address: any request would fail
        let client = OpenAiCompatClient::new("x", "http://127.0.0.1:9", "k");
        assert!(client.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        let client = OpenAiCompatClient::new("x", "http://127.0.0.1:9", "k");
        let err = client.send("hello").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Network(_)));
    }
}
