//! Stepwise CLI: the main entry point.
//!
//! Commands:
//! - `run`      Run one task to completion
//! - `onboard`  Initialize config & workspace
//! - `config`   Show, locate or validate the configuration
//! - `doctor`   Diagnose system health

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "stepwise",
    about = "Stepwise: a plan-driven autonomous agent loop",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one task until the agent delivers a result or gives up
    Run {
        /// The task description
        message: String,

        /// Maximum number of model queries
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Number of failed tool calls that ends the run
        #[arg(long)]
        max_errors: Option<u32>,

        /// Print the full run report as JSON instead of the summary
        #[arg(long)]
        json: bool,
    },

    /// Initialize configuration and workspace
    Onboard,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose system health
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Validate the config file
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            message,
            max_iterations,
            max_errors,
            json,
        } => commands::run::run(message, max_iterations, max_errors, json).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
