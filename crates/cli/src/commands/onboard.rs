//! `dsatutor onboard`: First-time setup.

use dsatutor_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("DSA Tutor: First-Time Setup");
    println!("============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    let history_dir = AppConfig::default().history.resolved_directory();
    if !history_dir.exists() {
        std::fs::create_dir_all(&history_dir)?;
        println!("  Created history directory: {}", history_dir.display());
    }

    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Created config.toml at: {}", config_path.display());
        println!("\n  Next steps:");
        println!("   1. Set GEMINI_API_KEY (or add api_key to {})", config_path.display());
        println!("   2. Run: dsatutor chat");
        println!("   3. Or serve the web API: dsatutor serve\n");
    }

    Ok(())
}
