//! Tokenization and string-bounding helpers shared by ranking and storage.

/// Tokens of this many characters or fewer are discarded.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Marker appended to text that was cut short.
pub const TRUNCATION_MARKER: &str = "...";

/// Lower-case, strip punctuation, split on whitespace, and drop short tokens.
///
/// Punctuation is removed rather than replaced, so `"don't"` becomes `"dont"`
/// and `"e-mail"` becomes `"email"`.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .filter(|t| t.chars().count() > MIN_TOKEN_CHARS)
        .map(String::from)
        .collect()
}

/// Lower-cased text with every character that is not alphanumeric, `_` or
/// whitespace removed.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect()
}

/// Cut `text` to at most `max_chars` characters, appending
/// [`TRUNCATION_MARKER`] when anything was removed.
pub fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}
