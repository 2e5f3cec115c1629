//! Intent routing for Quill.
//!
//! [`IntentRouter`] maps free-form user text to an intent, an optional output
//! type and tone tags. It tries progressively cheaper strategies:
//!
//! 1. [`ai`]: a language model answers with JSON (optional collaborator)
//! 2. [`embedding`]: cosine similarity against labelled examples (optional)
//! 3. [`patterns`]: ordered regular-expression rules
//! 4. [`contextual`]: reference-text heuristics, never fails
//!
//! Collaborators are injected through [`IntentRouter::builder`].

pub mod ai;
pub mod contextual;
pub mod embedding;
pub mod patterns;
pub mod router;

pub use patterns::{detect_output_type, detect_tones};
pub use router::{IntentRouter, IntentRouterBuilder};
