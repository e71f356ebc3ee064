//! `quillpad init` — First-time setup.

use quillpad_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🪶 Quillpad — First-Time Setup");
    println!("==============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("   Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run init.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Add a provider API key to {}", config_path.display());
        println!("      (or export OPENAI_API_KEY / ANTHROPIC_API_KEY)");
        println!("   2. Add an [actors.<token>] entry so the gateway can authenticate you");
        println!("   3. Run: quillpad serve");
        println!("   4. Run: quillpad chat \"hello\" --token <token>\n");
    }

    Ok(())
}
