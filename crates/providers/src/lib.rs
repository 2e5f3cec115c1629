//! Model-backed collaborator implementations for Quill.
//!
//! [`OpenAiCompatClient`] implements `quill_core::LanguageModel`,
//! `quill_core::Embedder` and `quill_core::Summarizer` over any
//! OpenAI-compatible HTTP endpoint.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatClient;
