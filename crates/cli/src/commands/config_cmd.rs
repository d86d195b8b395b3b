//! `dsatutor config`: Configuration management commands.

use dsatutor_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   Config parsed successfully");

            let mut warnings = Vec::new();

            if !config.has_api_key() {
                warnings.push("No API key set (set DSATUTOR_API_KEY or GEMINI_API_KEY)");
            }

            if config.topic_gate.whole_word {
                warnings.push("Topic gate uses whole-word matching; embedded keywords are allowed");
            }

            if config.gateway.host == "0.0.0.0" && config.gateway.allowed_origins.is_empty() {
                warnings.push("Gateway bound to 0.0.0.0 with CORS open to every origin");
            }

            if warnings.is_empty() {
                println!("   All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   warning: {w}");
                }
            }

            println!();
            println!("   Provider:  {}", config.default_provider);
            println!("   Model:     {}", config.effective_model());
            println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);
            println!("   History:   {}", config.history.backend);
            println!("   Context:   {} turns", config.tutor.max_context_turns);
            println!("   Keywords:  {}", config.topic_gate.keywords.len());
        }
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", toml::to_string_pretty(&redacted(config))?);
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

fn redacted(mut config: AppConfig) -> AppConfig {
    let mask = |key: &mut Option<String>| {
        if key.is_some() {
            *key = Some("[REDACTED]".into());
        }
    };
    mask(&mut config.api_key);
    for provider in config.providers.values_mut() {
        mask(&mut provider.api_key);
    }
    config
}
