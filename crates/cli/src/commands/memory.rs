//! `quill memory`: Session context memory commands.
//!
//! Every command opens the session store under `~/.quill/session`, so
//! records added by one invocation are visible to the next.

use quill_config::AppConfig;
use quill_core::collaborator::SessionStore;
use quill_core::intent::ClassifyContext;
use quill_memory::{ContextMemoryStore, FileSessionStore};
use quill_providers::OpenAiCompatClient;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::classify::build_router;

fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

async fn open_store(config: &AppConfig) -> ContextMemoryStore {
    let session: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(AppConfig::session_dir()));
    let store = ContextMemoryStore::load(config.memory.clone(), session).await;
    match OpenAiCompatClient::from_config(&config.provider) {
        Some(client) => store.with_summarizer(Arc::new(client)),
        None => store,
    }
}

/// Parse `key=value` pairs. Keys are trimmed; an entry without `=` is an error.
pub fn parse_meta(entries: &[String]) -> Result<BTreeMap<String, String>, String> {
    let mut meta = BTreeMap::new();
    for entry in entries {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| format!("Invalid metadata '{entry}', expected KEY=VALUE"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("Invalid metadata '{entry}', key is empty"));
        }
        meta.insert(key.to_string(), value.trim().to_string());
    }
    Ok(meta)
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}

pub async fn add(
    query: &str,
    response: &str,
    meta: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let overrides = parse_meta(meta)?;

    // Tag the record with the query's classification; explicit --meta wins
    let mut metadata = match build_router(&config)
        .classify(query, &ClassifyContext::default())
        .await
    {
        Ok(result) => result.to_metadata(),
        Err(e) => {
            tracing::debug!(error = %e, "Query not classified, storing without intent");
            BTreeMap::new()
        }
    };
    metadata.extend(overrides);

    let mut store = open_store(&config).await;
    let record = store.append(query, response, metadata).await?;

    println!("🧠 Stored record {}", record.id);
    if record.was_compacted {
        println!(
            "   Response compacted: {} → {} chars",
            record.original_response_length,
            record.response.chars().count()
        );
    }
    println!("   Records in session: {}/{}", store.len(), config.memory.max_items);
    Ok(())
}

pub async fn recent(count: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_store(&config).await;

    let records = store.retrieve_recent(count);
    if records.is_empty() {
        println!("   No records in this session.");
        return Ok(());
    }

    println!("🕑 {} most recent record(s)", records.len());
    for (i, record) in records.iter().enumerate() {
        println!(
            "  {:>2}. [{}] {}",
            i + 1,
            record.created_at.format("%H:%M:%S"),
            preview(&record.query, 70)
        );
        println!("      id: {}  intent: {}", record.id, record.intent().unwrap_or("unknown"));
    }
    Ok(())
}

pub async fn search(query: &str, top_k: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_store(&config).await;

    println!("🔍 Searching session memory for: \"{query}\"");
    println!();

    let results = store.retrieve_relevant(query, top_k);
    if results.is_empty() {
        println!("   No records in this session.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "  {:>2}. [score: {:.2}, {}] {}",
            i + 1,
            result.score,
            result.mode,
            preview(&result.record.query, 70)
        );
        println!("      {}", preview(&result.record.response, 90));
    }
    Ok(())
}

pub async fn context(query: &str, top_k: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_store(&config).await;

    let block = store.build_context(query, top_k);
    if block.is_empty() {
        println!("   No records in this session.");
    } else {
        print!("{block}");
    }
    Ok(())
}

pub async fn stats() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_store(&config).await;
    let stats = store.stats();

    println!("🧠 Memory Statistics");
    println!("====================");
    println!("  Records:     {}/{}", stats.total_records, config.memory.max_items);
    println!(
        "  Compacted:   {} ({:.0}%)",
        stats.compacted_records,
        stats.compaction_ratio * 100.0
    );
    println!(
        "  Characters:  {} stored / {} original",
        stats.total_stored_chars, stats.total_original_chars
    );
    if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
        println!("  Oldest:      {}", oldest.to_rfc3339());
        println!("  Newest:      {}", newest.to_rfc3339());
    }
    if !stats.intent_breakdown.is_empty() {
        println!("  Intents:");
        for (intent, count) in &stats.intent_breakdown {
            println!("    {intent:<10} {count}");
        }
    }
    println!(
        "  Session dir: {}",
        AppConfig::session_dir().display()
    );
    Ok(())
}

pub async fn export(output: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_store(&config).await;

    let json = store.export_json()?;
    std::fs::write(output, &json)?;
    println!("📤 Exported {} records to {output}", store.len());
    Ok(())
}

pub async fn import(input: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let mut store = open_store(&config).await;

    let payload = std::fs::read_to_string(input)?;
    let kept = store.import_json(&payload).await?;
    println!("📥 Imported {kept} records from {input}");
    Ok(())
}

pub async fn delete(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let mut store = open_store(&config).await;

    if store.delete(id).await {
        println!("🗑️  Deleted record {id}");
    } else {
        println!("   No record with id {id}");
    }
    Ok(())
}

pub async fn clear(confirm: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !confirm {
        println!("⚠️  This will delete ALL records in the current session.");
        println!("   Run with --confirm to proceed:");
        println!("   quill memory clear --confirm");
        return Ok(());
    }

    let config = load_config()?;
    let mut store = open_store(&config).await;
    let count = store.len();
    store.clear().await;

    println!("✅ Cleared {count} records.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_meta_pairs() {
        let meta = parse_meta(&["source = cli".into(), "intent=write".into(), "empty=".into()])
            .unwrap();
        assert_eq!(meta.get("source").map(String::as_str), Some("cli"));
        assert_eq!(meta.get("intent").map(String::as_str), Some("write"));
        assert_eq!(meta.get("empty").map(String::as_str), Some(""));
    }

    #[test]
    fn parse_meta_rejects_malformed() {
        assert!(parse_meta(&["no-equals".into()]).is_err());
        assert!(parse_meta(&[" =value".into()]).is_err());
    }

    #[test]
    fn preview_flattens_and_cuts() {
        assert_eq!(preview("a\nb", 10), "a b");
        assert_eq!(preview("abcdef", 3), "abc…");
    }
}
