//! The intent router: an ordered chain of classification tiers.
//!
//! ```text
//! AI classifier ──fail──▶ embedding ──fail/below──▶ pattern ──no match──▶ fallback
//! ```
//!
//! The first tier that produces a result wins; results are never blended.
//! Every collaborator call runs under the configured strategy timeout, and a
//! failure or timeout is logged and moves on to the next tier.

use crate::{ai, contextual, embedding::EmbeddingClassifier, patterns};
use quill_config::RouterConfig;
use quill_core::collaborator::{Embedder, LanguageModel};
use quill_core::error::{CollaboratorError, Error, Result};
use quill_core::intent::{ClassificationResult, ClassifyContext};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builder for [`IntentRouter`]. Collaborators are optional; without them
/// the router runs on pattern rules and the contextual fallback.
pub struct IntentRouterBuilder {
    config: RouterConfig,
    language_model: Option<Arc<dyn LanguageModel>>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl IntentRouterBuilder {
    pub fn language_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.language_model = Some(model);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Build the router. Collaborators whose tier is disabled in the config
    /// are dropped here.
    pub fn build(self) -> IntentRouter {
        let language_model = self.language_model.filter(|_| self.config.ai_enabled);
        let embedding = self
            .embedder
            .filter(|_| self.config.embedding_enabled)
            .map(|e| EmbeddingClassifier::new(e, self.config.classification_threshold));

        debug!(
            language_model = language_model.as_ref().map(|m| m.name()).unwrap_or("none"),
            embedder = embedding.as_ref().map(|e| e.embedder_name()).unwrap_or("none"),
            "Intent router built"
        );

        IntentRouter {
            config: self.config,
            language_model,
            embedding,
        }
    }
}

pub struct IntentRouter {
    config: RouterConfig,
    language_model: Option<Arc<dyn LanguageModel>>,
    embedding: Option<EmbeddingClassifier>,
}

impl IntentRouter {
    pub fn builder(config: RouterConfig) -> IntentRouterBuilder {
        IntentRouterBuilder {
            config,
            language_model: None,
            embedder: None,
        }
    }

    /// A router with no collaborators.
    pub fn new(config: RouterConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn has_language_model(&self) -> bool {
        self.language_model.is_some()
    }

    pub fn has_embedder(&self) -> bool {
        self.embedding.is_some()
    }

    /// Pre-embed the example corpus. Returns the number of cached example
    /// vectors, `0` when no embedder is configured.
    pub async fn warm_up(&self) -> std::result::Result<usize, CollaboratorError> {
        match &self.embedding {
            Some(embedding) => {
                self.timed("embedder", embedding.warm_up()).await
            }
            None => Ok(0),
        }
    }

    /// Classify `input`. Fails only on empty or whitespace-only input.
    pub async fn classify(
        &self,
        input: &str,
        context: &ClassifyContext,
    ) -> Result<ClassificationResult> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidInput("input text is empty".into()));
        }

        let result = if let Some(result) = self.try_ai(input, context).await {
            result
        } else if let Some(result) = self.try_embedding(input).await {
            result
        } else {
            self.classify_by_rules(input, context)
        };

        if context.plan_mode_active && result.reasoning.is_none() {
            return Ok(self.explain(input, result).await);
        }
        Ok(result)
    }

    /// Pattern rules, then the contextual fallback. Never fails.
    fn classify_by_rules(&self, input: &str, context: &ClassifyContext) -> ClassificationResult {
        if let Some(result) = patterns::classify(input) {
            debug!(intent = %result.intent, "Pattern rule matched");
            return result;
        }
        let result = contextual::classify(input, context);
        debug!(
            intent = %result.intent,
            has_reference = context.has_reference_text,
            "No pattern matched, using contextual fallback"
        );
        result
    }

    async fn try_ai(&self, input: &str, context: &ClassifyContext) -> Option<ClassificationResult> {
        let model = self.language_model.as_ref()?;
        debug!(model = %model.name(), "Trying AI classifier");

        let prompt = ai::build_prompt(input, context, self.config.reference_excerpt_chars);
        let outcome = self
            .timed(model.name(), model.send(&prompt))
            .await
            .and_then(|reply| ai::parse_reply(&reply));

        match outcome {
            Ok(result) => {
                debug!(intent = %result.intent, confidence = result.confidence, "AI classifier answered");
                Some(result)
            }
            Err(e) => {
                warn!(model = %model.name(), error = %e, "AI classifier failed, trying next tier");
                None
            }
        }
    }

    async fn try_embedding(&self, input: &str) -> Option<ClassificationResult> {
        let embedding = self.embedding.as_ref()?;
        debug!(embedder = %embedding.embedder_name(), "Trying embedding similarity");

        match self.timed(embedding.embedder_name(), embedding.classify(input)).await {
            Ok(Some(result)) => {
                debug!(intent = %result.intent, confidence = result.confidence, "Embedding similarity answered");
                Some(result)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(
                    embedder = %embedding.embedder_name(),
                    error = %e,
                    "Embedding classifier failed, trying next tier"
                );
                None
            }
        }
    }

    /// Ask the language model to justify `result`. Any failure returns the
    /// result unchanged.
    async fn explain(&self, input: &str, result: ClassificationResult) -> ClassificationResult {
        let Some(model) = self.language_model.as_ref() else {
            return result;
        };
        let prompt = ai::build_explain_prompt(input, &result);
        match self.timed(model.name(), model.send(&prompt)).await {
            Ok(reasoning) => result.with_reasoning(reasoning),
            Err(e) => {
                warn!(model = %model.name(), error = %e, "Plan-mode explanation failed");
                result
            }
        }
    }

    async fn timed<T>(
        &self,
        collaborator: &str,
        call: impl Future<Output = std::result::Result<T, CollaboratorError>>,
    ) -> std::result::Result<T, CollaboratorError> {
        match tokio::time::timeout(self.config.strategy_timeout(), call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(CollaboratorError::Timeout {
                collaborator: collaborator.to_string(),
                timeout_ms: self.config.strategy_timeout_ms,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quill_core::intent::{ClassificationMethod, IntentLabel, OutputType};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replies from a queue; an empty queue is a network error.
    struct ScriptedModel {
        replies: Mutex<VecDeque<std::result::Result<String, CollaboratorError>>>,
        delay: Option<Duration>,
        call_count: Mutex<usize>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
                delay: None,
                call_count: Mutex::new(0),
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new(vec![r#"{"intent":"write"}"#])
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send(&self, _prompt: &str) -> std::result::Result<String, CollaboratorError> {
            *self.call_count.lock().unwrap() += 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CollaboratorError::Network("script exhausted".into())))
        }
    }

    /// Example `i` embeds to the axis of its intent group; requests embed to `query`.
    struct FixedEmbedder {
        query: Vec<f32>,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn embed(
            &self,
            texts: &[String],
        ) -> std::result::Result<Vec<Vec<f32>>, CollaboratorError> {
            if texts.len() == 1 {
                return Ok(vec![self.query.clone()]);
            }
            Ok((0..texts.len())
                .map(|i| {
                    let mut v = vec![0.0; 5];
                    v[i / 3] = 1.0;
                    v
                })
                .collect())
        }
    }

    fn pattern_only() -> IntentRouter {
        IntentRouter::new(RouterConfig::default())
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        for input in ["", "   ", "\n\t"] {
            let err = pattern_only()
                .classify(input, &ClassifyContext::default())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn translate_without_collaborators_uses_patterns() {
        let result = pattern_only()
            .classify("translate this to French", &ClassifyContext::default())
            .await
            .unwrap();
        assert_eq!(result.intent, IntentLabel::Translate);
        assert_eq!(result.method, ClassificationMethod::Pattern);
        assert!(result.reasoning.is_none());
    }

    #[tokio::test]
    async fn unmatched_input_reaches_contextual_fallback() {
        let router = pattern_only();
        let plain = router
            .classify("tighter, this is long", &ClassifyContext::default())
            .await
            .unwrap();
        assert_eq!(plain.intent, IntentLabel::Write);
        assert_eq!(plain.method, ClassificationMethod::Fallback);

        let with_ref = router
            .classify("tighter, this is long", &ClassifyContext::with_reference("Hi all"))
            .await
            .unwrap();
        assert_eq!(with_ref.intent, IntentLabel::Rewrite);
        assert_eq!(with_ref.method, ClassificationMethod::Fallback);
    }

    #[tokio::test]
    async fn every_input_gets_an_in_domain_intent() {
        let router = pattern_only();
        for input in ["?", "42", "ünïcödé", "lorem ipsum dolor", "translate", "!!!"] {
            let result = router.classify(input, &ClassifyContext::default()).await.unwrap();
            assert!(IntentLabel::ALL.contains(&result.intent), "{input}");
            assert!((0.0..=1.0).contains(&result.confidence));
        }
    }

    #[tokio::test]
    async fn ai_answer_wins() {
        let model = Arc::new(ScriptedModel::new(vec![
            r#"{"intent":"summarize","outputType":"list","tones":["casual"],"confidence":0.95}"#,
        ]));
        let router = IntentRouter::builder(RouterConfig::default())
            .language_model(model.clone())
            .build();

        let result = router
            .classify("write me something", &ClassifyContext::default())
            .await
            .unwrap();
        assert_eq!(result.intent, IntentLabel::Summarize);
        assert_eq!(result.output_type, Some(OutputType::List));
        assert_eq!(result.method, ClassificationMethod::AiClassifier);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn malformed_ai_reply_falls_through() {
        let model = Arc::new(ScriptedModel::new(vec!["I'd say it's a writing task."]));
        let router = IntentRouter::builder(RouterConfig::default())
            .language_model(model.clone())
            .build();

        let result = router
            .classify("translate this to French", &ClassifyContext::default())
            .await
            .unwrap();
        assert_eq!(result.intent, IntentLabel::Translate);
        assert_eq!(result.method, ClassificationMethod::Pattern);
        // no retry
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn out_of_domain_ai_intent_falls_through() {
        let model = Arc::new(ScriptedModel::new(vec![r#"{"intent":"brainstorm","confidence":0.99}"#]));
        let router = IntentRouter::builder(RouterConfig::default())
            .language_model(model)
            .build();

        let result = router
            .classify("proofread my essay", &ClassifyContext::default())
            .await
            .unwrap();
        assert_eq!(result.intent, IntentLabel::Proofread);
        assert_eq!(result.method, ClassificationMethod::Pattern);
    }

    #[tokio::test(start_paused = true)]
    async fn ai_timeout_falls_through() {
        let model = Arc::new(ScriptedModel::slow(Duration::from_secs(30)));
        let router = IntentRouter::builder(RouterConfig::default())
            .language_model(model.clone())
            .build();

        let result = router
            .classify("summarize the report", &ClassifyContext::default())
            .await
            .unwrap();
        assert_eq!(result.intent, IntentLabel::Summarize);
        assert_eq!(result.method, ClassificationMethod::Pattern);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn ai_failure_moves_to_embedding() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let router = IntentRouter::builder(RouterConfig::default())
            .language_model(model.clone())
            .embedder(Arc::new(FixedEmbedder {
                query: vec![0.0, 0.0, 0.0, 1.0, 0.0],
            }))
            .build();

        let result = router
            .classify("write it again but nicer", &ClassifyContext::default())
            .await
            .unwrap();
        assert_eq!(result.intent, IntentLabel::Rewrite);
        assert_eq!(result.method, ClassificationMethod::Embedding);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn embedding_below_threshold_defers_to_pattern() {
        let router = IntentRouter::builder(RouterConfig::default())
            .embedder(Arc::new(FixedEmbedder {
                query: vec![1.0, 1.0, 1.0, 1.0, 1.0],
            }))
            .build();

        let result = router
            .classify("draft a cover letter", &ClassifyContext::default())
            .await
            .unwrap();
        assert_eq!(result.intent, IntentLabel::Write);
        assert_eq!(result.method, ClassificationMethod::Pattern);
        assert_eq!(result.output_type, Some(OutputType::Letter));
    }

    #[tokio::test]
    async fn every_tier_failing_ends_at_contextual_fallback() {
        let model = Arc::new(ScriptedModel::new(vec!["not json"]));
        let router = IntentRouter::builder(RouterConfig::default())
            .language_model(model.clone())
            .embedder(Arc::new(FixedEmbedder {
                query: vec![1.0, 1.0, 1.0, 1.0, 1.0],
            }))
            .build();

        let result = router
            .classify("tighter, this is long", &ClassifyContext::with_reference("Hi all"))
            .await
            .unwrap();
        assert_eq!(result.intent, IntentLabel::Rewrite);
        assert_eq!(result.method, ClassificationMethod::Fallback);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn disabled_tiers_are_skipped() {
        let model = Arc::new(ScriptedModel::new(vec![r#"{"intent":"other"}"#]));
        let config = RouterConfig {
            ai_enabled: false,
            embedding_enabled: false,
            ..RouterConfig::default()
        };
        let router = IntentRouter::builder(config)
            .language_model(model.clone())
            .embedder(Arc::new(FixedEmbedder {
                query: vec![0.0, 0.0, 0.0, 0.0, 1.0],
            }))
            .build();
        assert!(!router.has_language_model());
        assert!(!router.has_embedder());

        let result = router
            .classify("proofread my essay", &ClassifyContext::default())
            .await
            .unwrap();
        assert_eq!(result.method, ClassificationMethod::Pattern);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn plan_mode_explains_deterministic_result() {
        let model = Arc::new(ScriptedModel::new(vec![
            "not json",
            "The request names a target language.",
        ]));
        let router = IntentRouter::builder(RouterConfig::default())
            .language_model(model.clone())
            .build();

        let result = router
            .classify(
                "translate this to French",
                &ClassifyContext::default().plan_mode(),
            )
            .await
            .unwrap();
        assert_eq!(result.method, ClassificationMethod::Pattern);
        assert_eq!(
            result.reasoning.as_deref(),
            Some("The request names a target language.")
        );
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn plan_mode_keeps_ai_reasoning_without_second_call() {
        let model = Arc::new(ScriptedModel::new(vec![
            r#"{"intent":"write","reasoning":"Asks for a new email."}"#,
        ]));
        let router = IntentRouter::builder(RouterConfig::default())
            .language_model(model.clone())
            .build();

        let result = router
            .classify("an email to Sam", &ClassifyContext::default().plan_mode())
            .await
            .unwrap();
        assert_eq!(result.reasoning.as_deref(), Some("Asks for a new email."));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn plan_mode_explanation_failure_leaves_reasoning_empty() {
        let model = Arc::new(ScriptedModel::new(vec!["garbage"]));
        let router = IntentRouter::builder(RouterConfig::default())
            .language_model(model)
            .build();

        let result = router
            .classify("rewrite this", &ClassifyContext::default().plan_mode())
            .await
            .unwrap();
        assert_eq!(result.intent, IntentLabel::Rewrite);
        assert!(result.reasoning.is_none());
    }

    #[tokio::test]
    async fn plan_mode_without_model_has_no_reasoning() {
        let result = pattern_only()
            .classify("rewrite this", &ClassifyContext::default().plan_mode())
            .await
            .unwrap();
        assert!(result.reasoning.is_none());
    }

    #[tokio::test]
    async fn warm_up_counts_examples() {
        assert_eq!(pattern_only().warm_up().await.unwrap(), 0);

        let router = IntentRouter::builder(RouterConfig::default())
            .embedder(Arc::new(FixedEmbedder { query: vec![1.0; 5] }))
            .build();
        assert_eq!(router.warm_up().await.unwrap(), 15);
    }
}
