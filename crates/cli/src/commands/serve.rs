//! `dsatutor serve`: Start the HTTP API server.

use dsatutor_config::AppConfig;

use super::chat::missing_key_help;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    if let Err(e) = config.require_api_key() {
        missing_key_help();
        return Err(e.into());
    }

    println!("DSA Tutor API");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.default_provider, config.effective_model());
    println!("   History:   {}", config.history.backend);

    dsatutor_gateway::start(config).await?;

    Ok(())
}
