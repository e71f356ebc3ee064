//! `quillpad doctor` — Diagnose setup problems.

use quillpad_config::AppConfig;
use quillpad_providers::ProviderKind;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Quillpad Doctor — Setup Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ❌ No config file — run `quillpad init`");
        issues += 1;
    }

    match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config loads and validates");

            match ProviderKind::classify(&config.default_model) {
                Ok(kind) => {
                    let key_present = config
                        .providers
                        .get(kind.config_key())
                        .and_then(|p| p.api_key.as_ref())
                        .is_some();
                    if key_present {
                        println!("  ✅ API key configured for {} ({})", kind.config_key(), config.default_model);
                    } else {
                        println!(
                            "  ⚠️  default_model is {} but no {} API key is configured",
                            config.default_model,
                            kind.config_key()
                        );
                        issues += 1;
                    }
                }
                Err(_) => {
                    println!("  ❌ default_model {:?} matches no known provider", config.default_model);
                    issues += 1;
                }
            }

            if config.actors.is_empty() {
                println!("  ⚠️  No actors configured — the gateway will refuse every request");
                issues += 1;
            } else {
                println!("  ✅ {} actor token(s) configured", config.actors.len());
            }

            let db_path = std::path::Path::new(&config.store.database_path);
            if db_path.exists() {
                println!("  ✅ Database file exists: {}", config.store.database_path);
            } else {
                println!("     Database will be created at: {}", config.store.database_path);
            }
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
