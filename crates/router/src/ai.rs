//! AI classifier tier: prompt construction and reply parsing.
//!
//! The language model is asked to answer with a single JSON object. Models
//! often wrap it in prose or code fences, so the reply is scanned for the
//! outermost `{...}` span before parsing.
//!
//! Parsing is lenient about optional fields and strict about the intent:
//!
//! | Field        | Missing / unknown value          |
//! |--------------|----------------------------------|
//! | `intent`     | failure, the tier falls through  |
//! | `outputType` | `None` (alias `output_type`)     |
//! | `tones`      | unknown entries dropped          |
//! | `confidence` | [`DEFAULT_AI_CONFIDENCE`]        |
//! | `reasoning`  | `None`                           |

use quill_core::error::CollaboratorError;
use quill_core::intent::{
    ClassificationMethod, ClassificationResult, ClassifyContext, IntentLabel, OutputType, Tone,
};
use quill_memory::text::truncate_with_marker;
use serde::Deserialize;

/// Confidence assumed when the model omits one.
pub const DEFAULT_AI_CONFIDENCE: f32 = 0.8;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiReply {
    intent: String,
    #[serde(default, alias = "output_type")]
    output_type: Option<String>,
    #[serde(default)]
    tones: Vec<serde_json::Value>,
    #[serde(default)]
    confidence: Option<serde_json::Value>,
    #[serde(default)]
    reasoning: Option<String>,
}

fn join_labels<T: std::fmt::Display>(labels: &[T]) -> String {
    labels
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the classification prompt for `input`.
pub fn build_prompt(input: &str, context: &ClassifyContext, excerpt_chars: usize) -> String {
    let mut prompt = String::from(
        "You are an intent classifier for a writing assistant. \
         Classify the user's request.\n\n",
    );
    prompt.push_str(&format!("Intents: {}\n", join_labels(&IntentLabel::ALL)));
    prompt.push_str(&format!("Output types: {}\n", join_labels(&OutputType::ALL)));
    prompt.push_str(&format!("Tones: {}\n\n", join_labels(&Tone::ALL)));

    prompt.push_str(&format!("User request: \"{input}\"\n"));
    prompt.push_str(&format!(
        "Has reference text: {}\n",
        context.has_reference_text
    ));
    if let Some(excerpt) = context
        .reference_excerpt
        .as_deref()
        .filter(|e| !e.trim().is_empty())
    {
        prompt.push_str(&format!(
            "Reference text excerpt: \"{}\"\n",
            truncate_with_marker(excerpt, excerpt_chars)
        ));
    }

    prompt.push_str(
        "\nRespond with only a JSON object of the form \
         {\"intent\": \"...\", \"outputType\": \"...\" or null, \
         \"tones\": [\"...\"], \"confidence\": 0.0-1.0",
    );
    if context.plan_mode_active {
        prompt.push_str(", \"reasoning\": \"one sentence explaining the classification\"");
    }
    prompt.push('}');
    prompt
}

/// Build the secondary prompt asking the model to justify a classification
/// produced by another tier.
pub fn build_explain_prompt(input: &str, result: &ClassificationResult) -> String {
    let mut prompt = format!(
        "A writing assistant classified the request \"{input}\" as intent '{}'",
        result.intent
    );
    if let Some(output_type) = result.output_type {
        prompt.push_str(&format!(" with output type '{output_type}'"));
    }
    if !result.tones.is_empty() {
        prompt.push_str(&format!(" and tones {}", join_labels(&result.tones)));
    }
    prompt.push_str(". Explain this classification in one sentence. Reply with the sentence only.");
    prompt
}

/// The first `{` through the last `}` of `reply`, if both exist in order.
pub fn extract_json(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Parse a classifier reply into a result tagged `ai-classifier`.
pub fn parse_reply(reply: &str) -> Result<ClassificationResult, CollaboratorError> {
    let json = extract_json(reply).ok_or_else(|| {
        CollaboratorError::MalformedReply("no JSON object in classifier reply".into())
    })?;
    let parsed: AiReply = serde_json::from_str(json)
        .map_err(|e| CollaboratorError::MalformedReply(format!("invalid classifier JSON: {e}")))?;

    let intent: IntentLabel = parsed
        .intent
        .parse()
        .map_err(CollaboratorError::MalformedReply)?;

    let output_type = parsed
        .output_type
        .as_deref()
        .and_then(|s| s.parse::<OutputType>().ok());

    let tones: Vec<Tone> = parsed
        .tones
        .iter()
        .filter_map(|v| v.as_str())
        .filter_map(|s| s.parse::<Tone>().ok())
        .collect();

    let confidence = parsed
        .confidence
        .as_ref()
        .and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .map(|c| c as f32)
        .unwrap_or(DEFAULT_AI_CONFIDENCE);

    let result = ClassificationResult::new(
        intent,
        output_type,
        tones,
        confidence,
        ClassificationMethod::AiClassifier,
    );
    Ok(match parsed.reasoning {
        Some(reasoning) => result.with_reasoning(reasoning),
        None => result,
    })
}
