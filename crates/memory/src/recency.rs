//! Chronological-cue detection.
//!
//! A query that asks about *when* something happened in the conversation
//! ("what did I ask earlier?") is answered by recency, not relevance.

use regex_lite::Regex;
use std::sync::LazyLock;

static CHRONOLOGICAL_CUES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(previous(ly)?|last|recent(ly)?|earlier|before|past|ago)\b",
        r"\bwhat did (i|we)\b",
        r"\b(remind me|recall)\b",
        r"\bhistory\b",
        r"\bjust now\b",
    ]
    .into_iter()
    .filter_map(|p| Regex::new(&format!("(?i){p}")).ok())
    .collect()
});

/// Whether `query` asks about conversation order rather than a topic.
pub fn is_chronological_query(query: &str) -> bool {
    CHRONOLOGICAL_CUES.iter().any(|re| re.is_match(query))
}

/// Synthetic score for the `rank`-th most recent record: 1.0, 0.9, 0.8, ...
/// floored at zero.
pub fn recency_score(rank: usize) -> f32 {
    (1.0 - 0.1 * rank as f32).max(0.0)
}
