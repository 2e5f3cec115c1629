//! Embedding similarity tier.
//!
//! A small labelled example corpus is embedded once and cached for the
//! router's lifetime. Each request is embedded, compared by cosine similarity
//! against every example, averaged per intent, and the best average wins if
//! it clears the threshold.

use crate::patterns;
use quill_core::collaborator::Embedder;
use quill_core::error::CollaboratorError;
use quill_core::intent::{ClassificationMethod, ClassificationResult, IntentLabel};
use quill_memory::vector::mean_similarity;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Labelled example requests, grouped by intent.
pub const EXAMPLES: [(IntentLabel, [&str; 3]); 5] = [
    (
        IntentLabel::Proofread,
        [
            "Check this text for spelling and grammar mistakes",
            "Proofread my essay and fix any typos",
            "Correct the punctuation errors in this paragraph",
        ],
    ),
    (
        IntentLabel::Summarize,
        [
            "Summarize this article in a few sentences",
            "Give me the key points of this document",
            "What is the main idea of this text in brief",
        ],
    ),
    (
        IntentLabel::Write,
        [
            "Write an email to my manager asking for time off",
            "Draft a blog post about remote work",
            "Compose a thank-you note for a colleague",
        ],
    ),
    (
        IntentLabel::Rewrite,
        [
            "Rewrite this paragraph to sound more professional",
            "Rephrase this sentence so it is clearer",
            "Make this text shorter and more engaging",
        ],
    ),
    (
        IntentLabel::Translate,
        [
            "Translate this message into Spanish",
            "How do I say this in French",
            "Convert this paragraph to German",
        ],
    ),
];

struct ExampleSet {
    intent: IntentLabel,
    vectors: Vec<Vec<f32>>,
}

pub struct EmbeddingClassifier {
    embedder: Arc<dyn Embedder>,
    threshold: f32,
    examples: OnceCell<Vec<ExampleSet>>,
}

impl EmbeddingClassifier {
    pub fn new(embedder: Arc<dyn Embedder>, threshold: f32) -> Self {
        Self {
            embedder,
            threshold,
            examples: OnceCell::new(),
        }
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    /// Whether the example corpus has been embedded.
    pub fn is_warm(&self) -> bool {
        self.examples.initialized()
    }

    /// Embed the example corpus if not done yet. A failure leaves the cache
    /// empty so the next call retries.
    pub async fn warm_up(&self) -> Result<usize, CollaboratorError> {
        let sets = self.example_sets().await?;
        Ok(sets.iter().map(|s| s.vectors.len()).sum())
    }

    async fn example_sets(&self) -> Result<&Vec<ExampleSet>, CollaboratorError> {
        self.examples
            .get_or_try_init(|| async {
                let texts: Vec<String> = EXAMPLES
                    .iter()
                    .flat_map(|(_, examples)| examples.iter().map(|e| e.to_string()))
                    .collect();
                let mut vectors = self.embedder.embed(&texts).await?;
                if vectors.len() != texts.len() {
                    return Err(CollaboratorError::MalformedReply(format!(
                        "expected {} example embeddings, got {}",
                        texts.len(),
                        vectors.len()
                    )));
                }

                let mut sets = Vec::with_capacity(EXAMPLES.len());
                for (intent, examples) in EXAMPLES.iter() {
                    let rest = vectors.split_off(examples.len());
                    sets.push(ExampleSet {
                        intent: *intent,
                        vectors: std::mem::replace(&mut vectors, rest),
                    });
                }
                debug!(
                    embedder = %self.embedder.name(),
                    examples = texts.len(),
                    "Embedding example corpus cached"
                );
                Ok::<_, CollaboratorError>(sets)
            })
            .await
    }

    /// Classify `input` by similarity. `Ok(None)` when the best average
    /// similarity is below the threshold.
    pub async fn classify(
        &self,
        input: &str,
    ) -> Result<Option<ClassificationResult>, CollaboratorError> {
        let sets = self.example_sets().await?;

        let query = self
            .embedder
            .embed(&[input.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CollaboratorError::MalformedReply("empty embedding response".into()))?;

        let mut best: Option<(IntentLabel, f32)> = None;
        for set in sets {
            let Some(score) = mean_similarity(&query, &set.vectors) else {
                continue;
            };
            // Strictly greater: ties keep the earlier intent
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((set.intent, score));
            }
        }

        let Some((intent, score)) = best else {
            return Ok(None);
        };
        if score < self.threshold {
            debug!(
                intent = %intent,
                score,
                threshold = self.threshold,
                "Embedding similarity below threshold"
            );
            return Ok(None);
        }

        Ok(Some(ClassificationResult::new(
            intent,
            patterns::detect_output_type(input),
            patterns::detect_tones(input),
            score,
            ClassificationMethod::Embedding,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quill_core::intent::{OutputType, Tone};
    use std::sync::Mutex;

    /// Embeds example `i` as the one-hot axis of its intent group and every
    /// single-text request as `query`.
    struct AxisEmbedder {
        query: Vec<f32>,
        fail_first: bool,
        call_count: Mutex<usize>,
    }

    impl AxisEmbedder {
        fn new(query: Vec<f32>) -> Self {
            Self {
                query,
                fail_first: false,
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl Embedder for AxisEmbedder {
        fn name(&self) -> &str {
            "axis"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CollaboratorError> {
            let call = {
                let mut count = self.call_count.lock().unwrap();
                *count += 1;
                *count
            };
            if self.fail_first && call == 1 {
                return Err(CollaboratorError::Network("connection refused".into()));
            }
            if texts.len() == 1 {
                return Ok(vec![self.query.clone()]);
            }
            Ok((0..texts.len())
                .map(|i| {
                    let mut v = vec![0.0; EXAMPLES.len()];
                    v[i / 3] = 1.0;
                    v
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn best_average_wins() {
        let embedder = Arc::new(AxisEmbedder::new(vec![0.0, 0.0, 0.0, 0.0, 1.0]));
        let classifier = EmbeddingClassifier::new(embedder, 0.65);
        let result = classifier
            .classify("please put this into formal Spanish")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.intent, IntentLabel::Translate);
        assert_eq!(result.method, ClassificationMethod::Embedding);
        assert!((result.confidence - 1.0).abs() < 1e-6);
        assert_eq!(result.tones, vec![Tone::Formal]);
    }

    #[tokio::test]
    async fn output_type_comes_from_patterns() {
        let embedder = Arc::new(AxisEmbedder::new(vec![0.0, 0.0, 1.0, 0.0, 0.0]));
        let classifier = EmbeddingClassifier::new(embedder, 0.65);
        let result = classifier.classify("a note to HR by email").await.unwrap().unwrap();
        assert_eq!(result.intent, IntentLabel::Write);
        assert_eq!(result.output_type, Some(OutputType::Email));
    }

    #[tokio::test]
    async fn below_threshold_is_none() {
        let embedder = Arc::new(AxisEmbedder::new(vec![1.0, 1.0, 1.0, 1.0, 1.0]));
        let classifier = EmbeddingClassifier::new(embedder, 0.65);
        assert!(classifier.classify("hmm").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ties_keep_first_intent() {
        let embedder = Arc::new(AxisEmbedder::new(vec![1.0, 1.0, 0.0, 0.0, 0.0]));
        let classifier = EmbeddingClassifier::new(embedder, 0.5);
        let result = classifier.classify("anything").await.unwrap().unwrap();
        assert_eq!(result.intent, IntentLabel::Proofread);
    }

    #[tokio::test]
    async fn corpus_is_embedded_once() {
        let embedder = Arc::new(AxisEmbedder::new(vec![0.0, 1.0, 0.0, 0.0, 0.0]));
        let classifier = EmbeddingClassifier::new(embedder.clone(), 0.65);
        assert!(!classifier.is_warm());
        assert_eq!(classifier.warm_up().await.unwrap(), 15);
        assert!(classifier.is_warm());

        classifier.classify("one").await.unwrap();
        classifier.classify("two").await.unwrap();
        // one corpus call + one call per request
        assert_eq!(embedder.calls(), 3);
    }

    #[tokio::test]
    async fn failed_warm_up_is_retried() {
        let embedder = Arc::new(AxisEmbedder {
            fail_first: true,
            ..AxisEmbedder::new(vec![0.0, 0.0, 0.0, 1.0, 0.0])
        });
        let classifier = EmbeddingClassifier::new(embedder.clone(), 0.65);

        assert!(classifier.classify("reword it").await.is_err());
        assert!(!classifier.is_warm());

        let result = classifier.classify("reword it").await.unwrap().unwrap();
        assert_eq!(result.intent, IntentLabel::Rewrite);
        assert!(classifier.is_warm());
    }

    #[test]
    fn corpus_covers_every_actionable_intent() {
        let intents: Vec<IntentLabel> = EXAMPLES.iter().map(|(i, _)| *i).collect();
        for intent in IntentLabel::ALL {
            assert_eq!(intents.contains(&intent), intent != IntentLabel::Other);
        }
    }
}
