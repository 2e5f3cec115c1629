//! Intent vocabulary and classification results.
//!
//! The intent set is closed: extending it means adding pattern rules and
//! embedding examples in `quill-router` as well as a variant here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// What action the user wants performed on text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentLabel {
    Proofread,
    Summarize,
    Write,
    Rewrite,
    Translate,
    Other,
}

impl IntentLabel {
    /// Every label, in declaration order.
    pub const ALL: [IntentLabel; 6] = [
        IntentLabel::Proofread,
        IntentLabel::Summarize,
        IntentLabel::Write,
        IntentLabel::Rewrite,
        IntentLabel::Translate,
        IntentLabel::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentLabel::Proofread => "proofread",
            IntentLabel::Summarize => "summarize",
            IntentLabel::Write => "write",
            IntentLabel::Rewrite => "rewrite",
            IntentLabel::Translate => "translate",
            IntentLabel::Other => "other",
        }
    }
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentLabel {
    type Err = String;

    /// Strict parse: anything outside the fixed set is an error, never `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        IntentLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| format!("unknown intent '{s}'"))
    }
}

/// The shape of the artifact the user wants produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    Email,
    Letter,
    Post,
    Document,
    List,
    Script,
    Summary,
    Response,
    Announcement,
    Tutorial,
}

impl OutputType {
    pub const ALL: [OutputType; 10] = [
        OutputType::Email,
        OutputType::Letter,
        OutputType::Post,
        OutputType::Document,
        OutputType::List,
        OutputType::Script,
        OutputType::Summary,
        OutputType::Response,
        OutputType::Announcement,
        OutputType::Tutorial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::Email => "email",
            OutputType::Letter => "letter",
            OutputType::Post => "post",
            OutputType::Document => "document",
            OutputType::List => "list",
            OutputType::Script => "script",
            OutputType::Summary => "summary",
            OutputType::Response => "response",
            OutputType::Announcement => "announcement",
            OutputType::Tutorial => "tutorial",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        OutputType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown output type '{s}'"))
    }
}

/// A non-exclusive stylistic modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Formal,
    Casual,
    Persuasive,
    Urgent,
    Diplomatic,
    Confident,
    Empathetic,
}

impl Tone {
    pub const ALL: [Tone; 7] = [
        Tone::Formal,
        Tone::Casual,
        Tone::Persuasive,
        Tone::Urgent,
        Tone::Diplomatic,
        Tone::Confident,
        Tone::Empathetic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Formal => "formal",
            Tone::Casual => "casual",
            Tone::Persuasive => "persuasive",
            Tone::Urgent => "urgent",
            Tone::Diplomatic => "diplomatic",
            Tone::Confident => "confident",
            Tone::Empathetic => "empathetic",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Tone::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown tone '{s}'"))
    }
}

/// Which strategy produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationMethod {
    AiClassifier,
    Embedding,
    Pattern,
    Fallback,
}

impl ClassificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationMethod::AiClassifier => "ai-classifier",
            ClassificationMethod::Embedding => "embedding",
            ClassificationMethod::Pattern => "pattern",
            ClassificationMethod::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ClassificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of classifying one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub intent: IntentLabel,

    #[serde(default)]
    pub output_type: Option<OutputType>,

    /// Detection order, no duplicates.
    #[serde(default)]
    pub tones: Vec<Tone>,

    /// Always within `[0, 1]`.
    pub confidence: f32,

    pub method: ClassificationMethod,

    /// Only set by the AI classifier or a plan-mode explanation call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl ClassificationResult {
    pub fn new(
        intent: IntentLabel,
        output_type: Option<OutputType>,
        tones: Vec<Tone>,
        confidence: f32,
        method: ClassificationMethod,
    ) -> Self {
        let mut deduped: Vec<Tone> = Vec::with_capacity(tones.len());
        for tone in tones {
            if !deduped.contains(&tone) {
                deduped.push(tone);
            }
        }
        Self {
            intent,
            output_type,
            tones: deduped,
            confidence: clamp_unit(confidence),
            method,
            reasoning: None,
        }
    }

    /// Returns a copy of this result carrying the given reasoning.
    pub fn with_reasoning(self, reasoning: impl Into<String>) -> Self {
        let reasoning = reasoning.into();
        let trimmed = reasoning.trim();
        Self {
            reasoning: if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            },
            ..self
        }
    }

    /// Metadata entries recorded alongside a memory record: `intent`, and
    /// `output_type` / `tone` (comma-joined) when present.
    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();
        meta.insert("intent".to_string(), self.intent.to_string());
        if let Some(output_type) = self.output_type {
            meta.insert("output_type".to_string(), output_type.to_string());
        }
        if !self.tones.is_empty() {
            let tones: Vec<&str> = self.tones.iter().map(Tone::as_str).collect();
            meta.insert("tone".to_string(), tones.join(","));
        }
        meta
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Caller-supplied context for a classification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyContext {
    /// Whether the user has selected or attached text to act on.
    #[serde(default)]
    pub has_reference_text: bool,

    #[serde(default)]
    pub reference_excerpt: Option<String>,

    #[serde(default)]
    pub plan_mode_active: bool,
}

impl ClassifyContext {
    /// Context carrying a reference excerpt.
    pub fn with_reference(excerpt: impl Into<String>) -> Self {
        Self {
            has_reference_text: true,
            reference_excerpt: Some(excerpt.into()),
            plan_mode_active: false,
        }
    }

    pub fn plan_mode(mut self) -> Self {
        self.plan_mode_active = true;
        self
    }
}
