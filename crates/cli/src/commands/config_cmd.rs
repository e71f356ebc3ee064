//! `quillpad config` — Print the effective configuration.

use quillpad_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("🪶 Quillpad Configuration");
    println!("   File: {}\n", AppConfig::config_dir().join("config.toml").display());

    // Debug impl redacts provider API keys
    println!("{config:#?}");

    Ok(())
}
