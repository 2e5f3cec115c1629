//! `quill config`: Configuration management commands.

use quill_config::AppConfig;

/// TOML rendering of `config` with the API key masked.
pub fn render_redacted(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.provider.api_key.is_some() {
        shown.provider.api_key = Some("[REDACTED]".into());
    }
    toml::to_string_pretty(&shown)
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", render_redacted(&config)?);
    if !config.has_api_key() {
        println!("# No API key set (QUILL_API_KEY or OPENAI_API_KEY): pattern rules only");
    }
    Ok(())
}

pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if config_path.exists() {
        println!("  Config file exists: {}", config_path.display());
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config file: {}", config_path.display());
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
