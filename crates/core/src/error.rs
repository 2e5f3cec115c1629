//! Error types for the Quill domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Only
//! [`Error::InvalidInput`] and [`Error::MalformedImport`] are ever surfaced to
//! callers of the router and memory store; collaborator and persistence errors
//! are caught at the tier/step that produced them.

use thiserror::Error;

/// The top-level error type for all Quill operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Caller input ---
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed import payload: {0}")]
    MalformedImport(String),

    // --- Persistence ---
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    // --- External collaborators ---
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures raised by the language model, embedding and summarization services.
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Summarizer unavailable: {0}")]
    SummarizerUnavailable(String),

    #[error("{collaborator} timed out after {timeout_ms}ms")]
    Timeout {
        collaborator: String,
        timeout_ms: u64,
    },

    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures raised by the session key-value store.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    #[error("Failed to read session key '{key}': {reason}")]
    Read { key: String, reason: String },

    #[error("Failed to write session key '{key}': {reason}")]
    Write { key: String, reason: String },

    #[error("Corrupt session payload: {0}")]
    Corrupt(String),
}
