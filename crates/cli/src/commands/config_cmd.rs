//! `stepwise config`: configuration management commands.

use stepwise_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   Config parsed successfully");

            let mut warnings = Vec::new();
            if !config.has_api_key() {
                warnings.push("No API key set (set STEPWISE_API_KEY or ANTHROPIC_API_KEY)".to_string());
            }
            if config.agent.max_errors > config.agent.max_iterations {
                warnings.push(format!(
                    "max_errors ({}) exceeds max_iterations ({}); the error threshold can never trigger",
                    config.agent.max_errors, config.agent.max_iterations
                ));
            }
            for root in &config.files.allowed_roots {
                if !root.starts_with('/') && !root.starts_with('~') {
                    warnings.push(format!("allowed root '{root}' is not absolute"));
                }
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
            println!("   Model:      {}", config.model);
            println!("   Max tokens: {}", config.max_tokens);
            println!(
                "   Limits:     {} iterations, {} errors",
                config.agent.max_iterations, config.agent.max_errors
            );
            println!("   Sandbox:    {:?}", config.sandbox.kind);
        }
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
