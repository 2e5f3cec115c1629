//! `quill classify`: Route a request through the intent router.

use quill_config::AppConfig;
use quill_core::intent::ClassifyContext;
use quill_providers::OpenAiCompatClient;
use quill_router::IntentRouter;
use std::sync::Arc;

/// Router wired to the configured endpoint when an API key is available,
/// pattern-only otherwise.
pub fn build_router(config: &AppConfig) -> IntentRouter {
    let mut builder = IntentRouter::builder(config.router.clone());
    if let Some(client) = OpenAiCompatClient::from_config(&config.provider) {
        let client = Arc::new(client);
        builder = builder.language_model(client.clone()).embedder(client);
    }
    builder.build()
}

pub async fn run(
    text: &str,
    reference: Option<String>,
    plan: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let router = build_router(&config);

    let mut context = match reference {
        Some(excerpt) => ClassifyContext::with_reference(excerpt),
        None => ClassifyContext::default(),
    };
    if plan {
        context = context.plan_mode();
    }

    let result = router.classify(text, &context).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("🧭 Classification");
    println!("=================");
    println!("  Intent:      {}", result.intent);
    println!(
        "  Output type: {}",
        result
            .output_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".into())
    );
    if result.tones.is_empty() {
        println!("  Tones:       -");
    } else {
        let tones: Vec<&str> = result.tones.iter().map(|t| t.as_str()).collect();
        println!("  Tones:       {}", tones.join(", "));
    }
    println!("  Confidence:  {:.2}", result.confidence);
    println!("  Method:      {}", result.method);
    if let Some(reasoning) = &result.reasoning {
        println!("  Reasoning:   {reasoning}");
    }

    Ok(())
}
