//! Context memory for Quill: bounded conversation log, ranking utilities,
//! and session store backends.

pub mod bm25;
pub mod file_backend;
pub mod in_memory;
pub mod noop;
pub mod recency;
pub mod store;
pub mod text;
pub mod vector;

pub use bm25::Bm25Index;
pub use file_backend::FileSessionStore;
pub use in_memory::InMemorySessionStore;
pub use noop::NoopSessionStore;
pub use recency::is_chronological_query;
pub use store::ContextMemoryStore;
pub use text::tokenize;
pub use vector::{cosine_similarity, mean_similarity};
