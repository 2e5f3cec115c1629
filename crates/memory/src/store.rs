//! Context memory store: a bounded FIFO log of completed exchanges.
//!
//! The store owns its records for the session lifetime and is the only
//! writer. Readers get clones. Mutation goes through `&mut self`; a session
//! is single-threaded from the caller's point of view, so there is no lock.
//!
//! Append order is fixed: compact → evict oldest if full → push → persist.
//! A crash between push and persist loses at most the newest record.

use chrono::Utc;
use quill_config::MemoryConfig;
use quill_core::collaborator::{SessionStore, SummaryOptions, Summarizer};
use quill_core::error::{CollaboratorError, Error, PersistenceError, Result};
use quill_core::memory::{MemoryRecord, MemoryStats, RetrievalMode, RetrievalResult};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bm25::Bm25Index;
use crate::recency::{is_chronological_query, recency_score};
use crate::text::truncate_with_marker;

/// Session-scoped conversation memory with recency and BM25 retrieval.
pub struct ContextMemoryStore {
    config: MemoryConfig,
    /// Oldest first.
    records: VecDeque<MemoryRecord>,
    session: Arc<dyn SessionStore>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl ContextMemoryStore {
    /// Create an empty store. Nothing is read from `session` until [`Self::restore`].
    pub fn new(config: MemoryConfig, session: Arc<dyn SessionStore>) -> Self {
        Self {
            config,
            records: VecDeque::new(),
            session,
            summarizer: None,
        }
    }

    /// Create a store and restore any records the session already holds.
    pub async fn load(config: MemoryConfig, session: Arc<dyn SessionStore>) -> Self {
        let mut store = Self::new(config, session);
        store.restore().await;
        store
    }

    /// Attach the summarizer used to compact long responses.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replace in-memory state with whatever the session store holds.
    ///
    /// Any failure (timeout, read error, corrupt payload) leaves the store
    /// empty. Returns the number of records restored.
    pub async fn restore(&mut self) -> usize {
        self.records.clear();
        let key = self.config.session_key.clone();

        let payload = match tokio::time::timeout(
            self.config.persistence_timeout(),
            self.session.get(&key),
        )
        .await
        {
            Ok(Ok(Some(payload))) => payload,
            Ok(Ok(None)) => return 0,
            Ok(Err(e)) => {
                warn!(backend = self.session.name(), error = %e, "Memory restore failed, starting empty");
                return 0;
            }
            Err(_) => {
                warn!(
                    backend = self.session.name(),
                    timeout_ms = self.config.persistence_timeout_ms,
                    "Memory restore timed out, starting empty"
                );
                return 0;
            }
        };

        let parsed = serde_json::from_str::<Vec<MemoryRecord>>(&payload)
            .map_err(|e| e.to_string())
            .and_then(|records| ensure_unique_ids(&records).map(|()| records));
        match parsed {
            Ok(records) => {
                self.records = self.keep_newest(records);
                info!(count = self.records.len(), "Context memory restored");
                self.records.len()
            }
            Err(e) => {
                let err = PersistenceError::Corrupt(e);
                warn!(error = %err, "Ignoring corrupt session payload");
                0
            }
        }
    }

    /// Record a completed exchange.
    ///
    /// Fails only on blank `query` or `response`. Compaction and persistence
    /// failures are logged and never abort the append.
    pub async fn append(
        &mut self,
        query: &str,
        response: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<MemoryRecord> {
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("query must not be empty".into()));
        }
        if response.trim().is_empty() {
            return Err(Error::InvalidInput("response must not be empty".into()));
        }

        let original_response_length = response.chars().count();
        let (stored_response, was_compacted) =
            if original_response_length > self.config.compaction_threshold {
                match self.compact(response).await {
                    Ok(summary) => (summary, true),
                    Err(e) => {
                        warn!(error = %e, "Compaction failed, storing response unmodified");
                        (response.to_string(), false)
                    }
                }
            } else {
                (response.to_string(), false)
            };

        let record = MemoryRecord {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            query: truncate_with_marker(query, self.config.max_query_length),
            response: stored_response,
            original_response_length,
            was_compacted,
            metadata,
        };

        if self.records.len() >= self.capacity() {
            if let Some(evicted) = self.records.pop_front() {
                debug!(id = %evicted.id, "Evicted oldest memory record");
            }
        }
        self.records.push_back(record.clone());
        debug!(id = %record.id, compacted = was_compacted, size = self.records.len(), "Memory record appended");

        self.persist().await;
        Ok(record)
    }

    /// Up to `count` records, newest first.
    pub fn retrieve_recent(&self, count: usize) -> Vec<MemoryRecord> {
        self.records.iter().rev().take(count).cloned().collect()
    }

    /// Up to `top_k` records ranked for `query`, best first.
    ///
    /// Queries about conversation order ("what did I ask earlier") are
    /// answered by recency; everything else by BM25 over every record.
    pub fn retrieve_relevant(&self, query: &str, top_k: usize) -> Vec<RetrievalResult> {
        if self.records.is_empty() || top_k == 0 {
            return Vec::new();
        }

        if is_chronological_query(query) {
            return self
                .records
                .iter()
                .rev()
                .take(top_k)
                .enumerate()
                .map(|(rank, record)| RetrievalResult {
                    record: record.clone(),
                    score: recency_score(rank),
                    mode: RetrievalMode::Chronological,
                })
                .collect();
        }

        let index = Bm25Index::new(self.records.iter().map(MemoryRecord::document_text));
        let scores = index.score_all(query);

        let mut ranked: Vec<(f32, &MemoryRecord)> = scores.into_iter().zip(&self.records).collect();
        // Stable: equal scores keep insertion order.
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(top_k);

        ranked
            .into_iter()
            .map(|(score, record)| RetrievalResult {
                record: record.clone(),
                score,
                mode: RetrievalMode::Semantic,
            })
            .collect()
    }

    /// Render the records relevant to `query` as a prompt prefix.
    ///
    /// Returns an empty string when nothing is stored.
    pub fn build_context(&self, query: &str, top_k: usize) -> String {
        let results = self.retrieve_relevant(query, top_k);
        if results.is_empty() {
            return String::new();
        }

        let mut out = String::from("Previous conversation context:\n");
        for (i, result) in results.iter().enumerate() {
            out.push_str(&format!(
                "{}. Q: {}\n   A: {}\n",
                i + 1,
                result.record.query,
                result.record.response
            ));
        }
        out
    }

    pub fn get(&self, id: &str) -> Option<MemoryRecord> {
        self.records.iter().find(|r| r.id == id).cloned()
    }

    /// Remove a single record. Returns whether anything was removed.
    pub async fn delete(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        let deleted = self.records.len() < before;
        if deleted {
            self.persist().await;
        }
        deleted
    }

    /// Remove every record.
    pub async fn clear(&mut self) {
        let count = self.records.len();
        self.records.clear();
        self.persist().await;
        info!(count, "Context memory cleared");
    }

    /// A copy of every record, oldest first.
    pub fn export_all(&self) -> Vec<MemoryRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    /// Replace the collection with `records`, keeping the newest `max_items`.
    /// Returns the number of records now stored.
    ///
    /// Records sharing an id are rejected with [`Error::MalformedImport`]
    /// and existing state is untouched.
    pub async fn import_all(&mut self, records: Vec<MemoryRecord>) -> Result<usize> {
        ensure_unique_ids(&records).map_err(Error::MalformedImport)?;
        self.records = self.keep_newest(records);
        self.persist().await;
        info!(count = self.records.len(), "Context memory imported");
        Ok(self.records.len())
    }

    /// Import a JSON array of records.
    ///
    /// A payload that is not an array, or whose elements are not records, is
    /// rejected with [`Error::MalformedImport`] and existing state is untouched.
    pub async fn import_json(&mut self, payload: &str) -> Result<usize> {
        let value: serde_json::Value = serde_json::from_str(payload)
            .map_err(|e| Error::MalformedImport(format!("invalid JSON: {e}")))?;
        if !value.is_array() {
            return Err(Error::MalformedImport("expected a JSON array of records".into()));
        }
        let records: Vec<MemoryRecord> = serde_json::from_value(value)
            .map_err(|e| Error::MalformedImport(format!("invalid record: {e}")))?;
        self.import_all(records).await
    }

    pub fn stats(&self) -> MemoryStats {
        let total_records = self.records.len();
        let compacted_records = self.records.iter().filter(|r| r.was_compacted).count();

        let mut intent_breakdown: BTreeMap<String, usize> = BTreeMap::new();
        for record in &self.records {
            let intent = record.intent().unwrap_or("unknown").to_string();
            *intent_breakdown.entry(intent).or_insert(0) += 1;
        }

        MemoryStats {
            total_records,
            compacted_records,
            compaction_ratio: if total_records == 0 {
                0.0
            } else {
                compacted_records as f32 / total_records as f32
            },
            total_original_chars: self.records.iter().map(|r| r.original_response_length).sum(),
            total_stored_chars: self.records.iter().map(|r| r.response.chars().count()).sum(),
            intent_breakdown,
            oldest: self.records.iter().map(|r| r.created_at).min(),
            newest: self.records.iter().map(|r| r.created_at).max(),
        }
    }

    /// Summarize `response` into short key points, under timeout.
    async fn compact(&self, response: &str) -> std::result::Result<String, CollaboratorError> {
        let summarizer = self.summarizer.as_ref().ok_or_else(|| {
            CollaboratorError::SummarizerUnavailable("no summarizer configured".into())
        })?;

        let timeout = self.config.summarizer_timeout();
        let summary = tokio::time::timeout(
            timeout,
            summarizer.summarize(response, SummaryOptions::key_points()),
        )
        .await
        .map_err(|_| CollaboratorError::Timeout {
            collaborator: summarizer.name().to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })??;

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(CollaboratorError::SummarizerUnavailable(
                "summarizer returned empty text".into(),
            ));
        }
        Ok(summary.to_string())
    }

    /// Write the whole collection under the session key. Best-effort.
    async fn persist(&self) {
        let payload = match serde_json::to_string(&self.records) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Failed to serialize context memory");
                return;
            }
        };

        match tokio::time::timeout(
            self.config.persistence_timeout(),
            self.session.set(&self.config.session_key, &payload),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(backend = self.session.name(), error = %e, "Failed to persist context memory");
            }
            Err(_) => {
                warn!(
                    backend = self.session.name(),
                    timeout_ms = self.config.persistence_timeout_ms,
                    "Persisting context memory timed out"
                );
            }
        }
    }

    /// `max_items`, floored at one so a zero setting still keeps the newest record.
    fn capacity(&self) -> usize {
        self.config.max_items.max(1)
    }

    fn keep_newest(&self, records: Vec<MemoryRecord>) -> VecDeque<MemoryRecord> {
        let mut records = VecDeque::from(records);
        let capacity = self.capacity();
        if records.len() > capacity {
            records.drain(..records.len() - capacity);
        }
        records
    }
}

fn ensure_unique_ids(records: &[MemoryRecord]) -> std::result::Result<(), String> {
    let mut seen = HashSet::with_capacity(records.len());
    match records.iter().find(|r| !seen.insert(r.id.as_str())) {
        Some(dup) => Err(format!("duplicate record id {}", dup.id)),
        None => Ok(()),
    }
}
