//! `quillpad serve` — Start the HTTP gateway.

use quillpad_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🪶 Quillpad Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Database:  {}", config.store.database_path);
    println!("   Model:     {}", config.default_model);

    quillpad_gateway::start(config).await?;

    Ok(())
}
