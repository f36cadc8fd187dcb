//! `stepwise doctor`: diagnose system health.

use stepwise_config::{AppConfig, SandboxKind};
use stepwise_core::provider::Provider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Stepwise Doctor: System Diagnostics");
    println!("===================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    let config = if config_path.exists() {
        match AppConfig::load() {
            Ok(config) => {
                println!("  [ok]   Config file valid");
                Some(config)
            }
            Err(e) => {
                println!("  [fail] Config file invalid: {e}");
                issues += 1;
                None
            }
        }
    } else {
        println!("  [warn] No config file; defaults in use (run `stepwise onboard`)");
        AppConfig::load().ok()
    };

    if let Some(config) = &config {
        if config.has_api_key() {
            println!("  [ok]   API key configured");
            match stepwise_providers::build_from_config(config) {
                Ok(provider) => match check_provider(&provider).await {
                    Ok(line) => println!("  [ok]   {line}"),
                    Err(line) => {
                        println!("  [fail] {line}");
                        issues += 1;
                    }
                },
                Err(e) => {
                    println!("  [fail] {e}");
                    issues += 1;
                }
            }
        } else {
            println!("  [fail] No API key; set ANTHROPIC_API_KEY or api_key in config.toml");
            issues += 1;
        }

        match config.sandbox.kind {
            SandboxKind::Docker => {
                let docker = tokio::process::Command::new("docker")
                    .arg("--version")
                    .output()
                    .await;
                match docker {
                    Ok(out) if out.status.success() => {
                        println!("  [ok]   {}", String::from_utf8_lossy(&out.stdout).trim());
                    }
                    _ => {
                        println!("  [fail] Docker sandbox selected but `docker` is not available");
                        issues += 1;
                    }
                }
            }
            SandboxKind::Local => {
                let workspace = config.sandbox_workspace();
                if workspace.exists() {
                    println!("  [ok]   Workspace directory exists: {}", workspace.display());
                } else {
                    println!("  [warn] Workspace {} will be created on first command", workspace.display());
                }
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Ask the provider whether it is reachable with the configured key.
async fn check_provider(provider: &dyn Provider) -> Result<String, String> {
    match provider.health_check().await {
        Ok(true) => Ok(format!("Provider '{}' reachable", provider.name())),
        Ok(false) => Err(format!("Provider '{}' rejected the API key", provider.name())),
        Err(e) => Err(format!("Provider '{}' unreachable: {e}", provider.name())),
    }
}
