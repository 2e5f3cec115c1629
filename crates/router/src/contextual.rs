//! Terminal tier: decides between `write` and `rewrite` from the reference
//! context alone. Never fails.

use crate::patterns;
use quill_core::intent::{
    ClassificationMethod, ClassificationResult, ClassifyContext, IntentLabel,
};
use regex_lite::Regex;
use std::sync::LazyLock;

/// Confidence reported by the contextual fallback.
pub const FALLBACK_CONFIDENCE: f32 = 0.7;

// "write something about/for/regarding the attached text"
static REFERENCE_CUE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(about|for|regarding|to|in response)\b").ok());

// "change this / fix it / shorten the text"
static MODIFICATION_CUE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(this|it|the text)\b").ok());

fn matches(cue: &LazyLock<Option<Regex>>, text: &str) -> bool {
    cue.as_ref().is_some_and(|re| re.is_match(text))
}

fn fallback_intent(input: &str, context: &ClassifyContext) -> IntentLabel {
    if !context.has_reference_text {
        return IntentLabel::Write;
    }
    let lowered = input.to_lowercase();
    if matches(&REFERENCE_CUE, &lowered) {
        IntentLabel::Write
    } else if matches(&MODIFICATION_CUE, &lowered) {
        IntentLabel::Rewrite
    } else {
        IntentLabel::Write
    }
}

pub fn classify(input: &str, context: &ClassifyContext) -> ClassificationResult {
    ClassificationResult::new(
        fallback_intent(input, context),
        patterns::detect_output_type(input),
        patterns::detect_tones(input),
        FALLBACK_CONFIDENCE,
        ClassificationMethod::Fallback,
    )
}
