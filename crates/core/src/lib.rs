//! # Quill Core
//!
//! Domain types, collaborator traits, and error definitions for the Quill
//! writing assistant. It performs no I/O of its own; it defines the model
//! the router and memory crates build on.
//!
//! ## Layout
//!
//! - [`intent`]: the closed intent vocabulary and classification results
//! - [`memory`]: stored conversation records and retrieval results
//! - [`collaborator`]: traits for the external services Quill consumes
//!   (language model, embedder, summarizer, session store)
//! - [`error`]: the error taxonomy

pub mod collaborator;
pub mod error;
pub mod intent;
pub mod memory;

// Re-export key types at crate root for ergonomics
pub use collaborator::{Embedder, LanguageModel, SessionStore, SummaryOptions, Summarizer};
pub use error::{CollaboratorError, Error, PersistenceError, Result};
pub use intent::{
    ClassificationMethod, ClassificationResult, ClassifyContext, IntentLabel, OutputType, Tone,
};
pub use memory::{MemoryRecord, MemoryStats, RetrievalMode, RetrievalResult};
