//! Memory domain types: stored conversation records and retrieval results.
//!
//! A [`MemoryRecord`] is created once when a request/response pair completes
//! and is never mutated afterwards. Compaction happens before insertion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One completed request/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique opaque ID
    pub id: String,

    /// When the exchange completed
    pub created_at: DateTime<Utc>,

    /// The user's query, possibly truncated with a trailing marker
    pub query: String,

    /// The response text, possibly replaced by a compacted summary
    pub response: String,

    /// Character count of the response before any compaction
    pub original_response_length: usize,

    #[serde(default)]
    pub was_compacted: bool,

    /// Intent, output type, tone and caller-supplied extras
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl MemoryRecord {
    /// The text BM25 ranks against: query and response joined by a space.
    pub fn document_text(&self) -> String {
        format!("{} {}", self.query, self.response)
    }

    /// The `intent` metadata value, if the caller recorded one.
    pub fn intent(&self) -> Option<&str> {
        self.metadata.get("intent").map(String::as_str)
    }
}

/// How a retrieval result was ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Recency order with synthetic descending scores
    Chronological,
    /// BM25 relevance order
    Semantic,
}

impl RetrievalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Chronological => "chronological",
            RetrievalMode::Semantic => "semantic",
        }
    }
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record paired with its score for one retrieval call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub record: MemoryRecord,
    pub score: f32,
    pub mode: RetrievalMode,
}

/// Administrative summary of a memory store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_records: usize,
    pub compacted_records: usize,
    /// `compacted_records / total_records`, zero when empty
    pub compaction_ratio: f32,
    pub total_original_chars: usize,
    pub total_stored_chars: usize,
    /// Record count per `intent` metadata value (`unknown` when absent)
    pub intent_breakdown: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MemoryRecord {
        MemoryRecord {
            id: "mem_001".into(),
            created_at: Utc::now(),
            query: "draft a cover letter".into(),
            response: "Dear hiring manager".into(),
            original_response_length: 19,
            was_compacted: false,
            metadata: BTreeMap::from([("intent".to_string(), "write".to_string())]),
        }
    }

    #[test]
    fn document_text_joins_query_and_response() {
        assert_eq!(record().document_text(), "draft a cover letter Dear hiring manager");
    }

    #[test]
    fn record_serialization_roundtrip() {
        let original = record();
        let json = serde_json::to_string(&original).unwrap();
        assert!(json.contains("original_response_length"));
        let parsed: MemoryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(parsed.intent(), Some("write"));
    }

    #[test]
    fn retrieval_mode_serializes_snake_case() {
        let json = serde_json::to_string(&RetrievalMode::Chronological).unwrap();
        assert_eq!(json, "\"chronological\"");
        assert_eq!(RetrievalMode::Semantic.to_string(), "semantic");
    }
}
