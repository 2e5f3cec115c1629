//! Configuration loading, validation, and management for Quill.
//!
//! Loads configuration from `~/.quill/config.toml` with environment
//! variable overrides. Validates all settings at load time. Every field has a
//! documented default so an embedding application can override only what it
//! needs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.quill/config.toml`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Intent router settings
    #[serde(default)]
    pub router: RouterConfig,

    /// Context memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Collaborator endpoint settings
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("router", &self.router)
            .field("memory", &self.memory)
            .field("provider", &self.provider)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Minimum average cosine similarity for the embedding strategy to answer.
    #[serde(default = "default_classification_threshold")]
    pub classification_threshold: f32,

    /// Hard timeout applied to every collaborator call, in milliseconds.
    #[serde(default = "default_strategy_timeout_ms")]
    pub strategy_timeout_ms: u64,

    #[serde(default = "default_true")]
    pub ai_enabled: bool,

    #[serde(default = "default_true")]
    pub embedding_enabled: bool,

    /// How much of the reference excerpt is embedded in the classifier prompt.
    #[serde(default = "default_reference_excerpt_chars")]
    pub reference_excerpt_chars: usize,
}

fn default_classification_threshold() -> f32 {
    0.65
}
fn default_strategy_timeout_ms() -> u64 {
    4000
}
fn default_reference_excerpt_chars() -> usize {
    300
}
fn default_true() -> bool {
    true
}

impl RouterConfig {
    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            classification_threshold: default_classification_threshold(),
            strategy_timeout_ms: default_strategy_timeout_ms(),
            ai_enabled: true,
            embedding_enabled: true,
            reference_excerpt_chars: default_reference_excerpt_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Responses longer than this many characters are summarized before storage.
    #[serde(default = "default_compaction_threshold")]
    pub compaction_threshold: usize,

    /// Maximum number of records kept; the oldest is evicted beyond this.
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Stored queries are cut to this many characters plus a `...` marker.
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    /// Session store key the whole collection is serialized under.
    #[serde(default = "default_session_key")]
    pub session_key: String,

    #[serde(default = "default_persistence_timeout_ms")]
    pub persistence_timeout_ms: u64,

    /// Timeout for the summarizer used by compaction, in milliseconds.
    #[serde(default = "default_strategy_timeout_ms")]
    pub summarizer_timeout_ms: u64,
}

fn default_compaction_threshold() -> usize {
    500
}
fn default_max_items() -> usize {
    50
}
fn default_max_query_length() -> usize {
    200
}
fn default_session_key() -> String {
    "quill_context_memory".into()
}
fn default_persistence_timeout_ms() -> u64 {
    2000
}

impl MemoryConfig {
    pub fn persistence_timeout(&self) -> Duration {
        Duration::from_millis(self.persistence_timeout_ms)
    }

    pub fn summarizer_timeout(&self) -> Duration {
        Duration::from_millis(self.summarizer_timeout_ms)
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            compaction_threshold: default_compaction_threshold(),
            max_items: default_max_items(),
            max_query_length: default_max_query_length(),
            session_key: default_session_key(),
            persistence_timeout_ms: default_persistence_timeout_ms(),
            summarizer_timeout_ms: default_strategy_timeout_ms(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for the OpenAI-compatible endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Chat model used for classification, explanations and summaries
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.quill/config.toml).
    ///
    /// Environment overrides:
    /// - `QUILL_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `QUILL_API_URL`
    /// - `QUILL_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.provider.api_key.is_none() {
            config.provider.api_key = std::env::var("QUILL_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(url) = std::env::var("QUILL_API_URL") {
            config.provider.api_url = url;
        }

        if let Ok(model) = std::env::var("QUILL_MODEL") {
            config.provider.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".quill")
    }

    /// Directory the CLI keeps its session store in.
    pub fn session_dir() -> PathBuf {
        Self::config_dir().join("session")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.router.classification_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ValidationError(
                "router.classification_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if self.router.strategy_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "router.strategy_timeout_ms must be > 0".into(),
            ));
        }

        if self.memory.max_items == 0 {
            return Err(ConfigError::ValidationError(
                "memory.max_items must be > 0".into(),
            ));
        }

        if self.memory.max_query_length == 0 || self.memory.compaction_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "memory.max_query_length and memory.compaction_threshold must be > 0".into(),
            ));
        }

        if self.memory.session_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "memory.session_key must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for quill_core::Error {
    fn from(e: ConfigError) -> Self {
        quill_core::Error::Config {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.router.classification_threshold - 0.65).abs() < f32::EPSILON);
        assert_eq!(config.memory.compaction_threshold, 500);
        assert_eq!(config.memory.max_items, 50);
        assert_eq!(config.memory.max_query_length, 200);
        assert_eq!(config.router.strategy_timeout(), Duration::from_secs(4));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.memory.session_key, config.memory.session_key);
        assert_eq!(parsed.provider.model, config.provider.model);
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
[memory]
max_items = 10

[router]
ai_enabled = false
"#,
        )
        .unwrap();
        assert_eq!(config.memory.max_items, 10);
        assert_eq!(config.memory.compaction_threshold, 500);
        assert!(!config.router.ai_enabled);
        assert!(config.router.embedding_enabled);
    }

    #[test]
    fn invalid_threshold_rejected() {
        let mut config = AppConfig::default();
        config.router.classification_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_capacity_rejected() {
        let result = AppConfig::from_toml("[memory]\nmax_items = 0\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().memory.max_items, 50);
    }

    #[test]
    fn parse_error_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[memory\nmax_items = ").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        match err {
            ConfigError::ParseError { path, .. } => assert_eq!(path, file.path()),
            other => panic!("Expected ParseError, got: {other:?}"),
        }
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("quill_context_memory"));
        assert!(toml_str.contains("classification_threshold"));
    }
}
