//! `stepwise onboard`: first-time setup.

use stepwise_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let workspace_dir = AppConfig::workspace_dir();

    println!("Stepwise: First-Time Setup");
    println!("==========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !workspace_dir.exists() {
        std::fs::create_dir_all(&workspace_dir)?;
        println!("  Created workspace directory: {}", workspace_dir.display());
    }

    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Created config.toml at: {}", config_path.display());
        println!("\n  Next steps:");
        println!("   1. Set ANTHROPIC_API_KEY or add api_key to {}", config_path.display());
        println!("   2. Set [sandbox] kind = \"local\" if Docker is not installed");
        println!("   3. Run: stepwise run \"<your task>\"\n");
    }

    println!("  Setup complete.\n");
    Ok(())
}
