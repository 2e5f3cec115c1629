//! Rule-based classification: always available, no external dependency.
//!
//! Three independent rule sets run over the lower-cased input:
//!
//! - **intent**: ordered, first match wins. Order is priority: specific
//!   requests come before generic verbs, so "translate this letter to
//!   Spanish" never falls to the generic `write` rule.
//! - **output type**: ordered, first match wins.
//! - **tone**: every matching rule contributes, in rule order.

use quill_core::intent::{
    ClassificationMethod, ClassificationResult, IntentLabel, OutputType, Tone,
};
use regex_lite::Regex;
use std::sync::LazyLock;

/// Confidence reported for a pattern match.
pub const PATTERN_CONFIDENCE: f32 = 0.9;

const LANGUAGES: &str = "english|french|spanish|german|italian|portuguese|dutch|russian|chinese|mandarin|cantonese|japanese|korean|arabic|hindi|bengali|turkish|polish|swedish|norwegian|danish|finnish|greek|hebrew|vietnamese|thai|indonesian|ukrainian";

struct Rule<T> {
    label: T,
    regex: Regex,
}

fn compile<T: Copy>(rules: &[(T, String)]) -> Vec<Rule<T>> {
    rules
        .iter()
        .filter_map(|(label, pattern)| {
            Regex::new(pattern).ok().map(|regex| Rule {
                label: *label,
                regex,
            })
        })
        .collect()
}

static INTENT_RULES: LazyLock<Vec<Rule<IntentLabel>>> = LazyLock::new(|| {
    compile(&[
        // Translate with an explicit target language
        (
            IntentLabel::Translate,
            r"\btranslat\w*\b.*\b(to|into)\s+[a-z]+".to_string(),
        ),
        (
            IntentLabel::Translate,
            format!(r"\b(say|convert|put|render)\b.*\b(in|into|to)\s+({LANGUAGES})\b"),
        ),
        (
            IntentLabel::Translate,
            r"\btranslat\w*\b|\bhow do (you|i) say\b".to_string(),
        ),
        (
            IntentLabel::Proofread,
            concat!(
                r"\b(proofread\w*|proof-read|proof read|spell\s?check\w*|grammar|typos?|misspell\w*)\b",
                r"|\bfix (the |my |any )?(spelling|grammar|punctuation|errors|mistakes|typos)\b",
                r"|\bcheck (my |the |this )?(\w+ )?(for )?(spelling|grammar|errors|mistakes)\b",
            )
            .to_string(),
        ),
        (
            IntentLabel::Summarize,
            r"\b(summari[sz]\w*|summary|tl;?dr|recap|condense|key (points|takeaways)|main points|gist|in a nutshell)\b"
                .to_string(),
        ),
        (
            IntentLabel::Rewrite,
            concat!(
                r"\b(rewrite|re-write|rephrase|paraphrase|reword|revise|polish|shorten|simplify|improve)\b",
                r"|\bmake (it|this|that|the text) (more|less|sound|shorter|longer|clearer|simpler|better)\b",
            )
            .to_string(),
        ),
        (
            IntentLabel::Write,
            r"\b(write|draft|compose|create|generate|prepare|craft|reply|respond)\b".to_string(),
        ),
        (
            IntentLabel::Other,
            r"^\s*(hi|hello|hey|thanks|thank you|what is|what are|who is|who are|why|when|where|explain|tell me)\b"
                .to_string(),
        ),
    ])
});

static OUTPUT_TYPE_RULES: LazyLock<Vec<Rule<OutputType>>> = LazyLock::new(|| {
    compile(&[
        (OutputType::Email, r"\be-?mails?\b".to_string()),
        (OutputType::Letter, r"\bletters?\b".to_string()),
        (
            OutputType::Post,
            r"\b(posts?|tweets?|linkedin|social media|blog)\b".to_string(),
        ),
        (
            OutputType::Document,
            r"\b(documents?|report|essay|proposal|memo|whitepaper)\b".to_string(),
        ),
        (
            OutputType::List,
            r"\b(list|bullet(ed)?|checklist)\b".to_string(),
        ),
        (
            OutputType::Script,
            r"\b(script|screenplay|dialogue)\b".to_string(),
        ),
        (
            OutputType::Summary,
            r"\b(summari[sz]\w*|summary|tl;?dr|recap)\b".to_string(),
        ),
        (
            OutputType::Response,
            r"\b(reply|replies|response|respond|answer)\b".to_string(),
        ),
        (OutputType::Announcement, r"\bannounc\w*\b".to_string()),
        (
            OutputType::Tutorial,
            r"\b(tutorial|guide|how-to|walkthrough|step[- ]by[- ]step)\b".to_string(),
        ),
    ])
});

static TONE_RULES: LazyLock<Vec<Rule<Tone>>> = LazyLock::new(|| {
    compile(&[
        (
            Tone::Formal,
            r"\b(formal|formally|professional|professionally|official)\b".to_string(),
        ),
        (
            Tone::Casual,
            r"\b(casual|casually|informal|friendly|relaxed|conversational)\b".to_string(),
        ),
        (
            Tone::Persuasive,
            r"\b(persuasive|persuade|convince|convincing|compelling)\b".to_string(),
        ),
        (
            Tone::Urgent,
            r"\b(urgent|urgently|asap|immediately|time-sensitive)\b".to_string(),
        ),
        (
            Tone::Diplomatic,
            r"\b(diplomatic|diplomatically|tactful|polite|politely|gentle|gently)\b".to_string(),
        ),
        (
            Tone::Confident,
            r"\b(confident|confidently|assertive|bold|decisive)\b".to_string(),
        ),
        (
            Tone::Empathetic,
            r"\b(empathetic|empathy|compassionate|sympathetic|caring|understanding)\b".to_string(),
        ),
    ])
});

/// First intent rule matching `input`, if any.
pub fn match_intent(input: &str) -> Option<IntentLabel> {
    let lowered = input.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|rule| rule.regex.is_match(&lowered))
        .map(|rule| rule.label)
}

/// First output-type rule matching `input`, if any.
pub fn detect_output_type(input: &str) -> Option<OutputType> {
    let lowered = input.to_lowercase();
    OUTPUT_TYPE_RULES
        .iter()
        .find(|rule| rule.regex.is_match(&lowered))
        .map(|rule| rule.label)
}

/// Every tone whose rule matches `input`, in rule order.
pub fn detect_tones(input: &str) -> Vec<Tone> {
    let lowered = input.to_lowercase();
    TONE_RULES
        .iter()
        .filter(|rule| rule.regex.is_match(&lowered))
        .map(|rule| rule.label)
        .collect()
}

/// Classify by rules alone. `None` when no intent rule matches.
pub fn classify(input: &str) -> Option<ClassificationResult> {
    let intent = match_intent(input)?;
    Some(ClassificationResult::new(
        intent,
        detect_output_type(input),
        detect_tones(input),
        PATTERN_CONFIDENCE,
        ClassificationMethod::Pattern,
    ))
}
