//! `stepwise run`: drive one task to a terminal state.

use std::sync::Arc;
use stepwise_agent::{AgentLoop, RunReport};
use stepwise_channels::ConsoleChannel;
use stepwise_config::{AppConfig, SandboxKind};
use stepwise_core::channel::UserChannel;
use stepwise_core::event::{EventBus, RunEvent};
use stepwise_core::sandbox::SandboxExecutor;
use stepwise_core::state::LoopState;
use stepwise_core::tool::ToolStatus;
use stepwise_security::PathPolicy;
use stepwise_tools::{
    DockerSandbox, DockerSettings, FileTool, LocalSandbox, MessageTool, ShellTool, ToolDispatcher,
    standard_registry,
};
use tokio::sync::broadcast::error::RecvError;

pub async fn run(
    message: String,
    max_iterations: Option<u32>,
    max_errors: Option<u32>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(max) = max_iterations {
        config.agent.max_iterations = max;
    }
    if let Some(max) = max_errors {
        config.agent.max_errors = max;
    }
    config.validate()?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    STEPWISE_API_KEY   = 'sk-ant-...'");
        eprintln!("    ANTHROPIC_API_KEY  = 'sk-ant-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let bus = Arc::new(EventBus::default());
    let agent = build_agent(&config, Arc::new(ConsoleChannel::new()), bus.clone())?;

    let mut events = bus.subscribe();
    drop(bus);
    let renderer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = describe(&event) {
                        eprintln!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("  ... {skipped} events skipped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let outcome = agent.run(message).await;
    // Dropping the agent closes the bus so the renderer drains and exits
    drop(agent);
    let _ = renderer.await;

    let report = outcome?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    match report.state {
        LoopState::Failed { reason } => Err(format!("Run failed: {reason}").into()),
        _ => Ok(()),
    }
}

/// Wire the configured provider, sandbox and path policy into an agent loop.
pub fn build_agent(
    config: &AppConfig,
    channel: Arc<dyn UserChannel>,
    bus: Arc<EventBus>,
) -> Result<AgentLoop, Box<dyn std::error::Error>> {
    let provider = Arc::new(stepwise_providers::build_from_config(config)?);

    let sandbox: Arc<dyn SandboxExecutor> = match config.sandbox.kind {
        SandboxKind::Local => Arc::new(LocalSandbox::new(config.sandbox_workspace())),
        SandboxKind::Docker => Arc::new(DockerSandbox::new(DockerSettings {
            image: config.sandbox.image.clone(),
            memory_limit: config.sandbox.memory_limit.clone(),
            cpu_quota: config.sandbox.cpu_quota,
            network: config.sandbox.network.clone(),
        })),
    };
    let policy = PathPolicy::new(&config.files.allowed_roots, &config.files.forbidden_paths);

    let dispatcher = Arc::new(ToolDispatcher::new(
        Arc::new(standard_registry()),
        MessageTool::new(channel),
        ShellTool::new(sandbox),
        FileTool::new(policy),
    ));

    let agent = AgentLoop::new(provider, dispatcher, bus)
        .with_model(&config.model)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
        .with_limits(config.agent.limits());

    Ok(match &config.agent.system_prompt_override {
        Some(prompt) => agent.with_system_prompt(prompt),
        None => agent,
    })
}

/// One progress line per event worth showing.
fn describe(event: &RunEvent) -> Option<String> {
    match event {
        RunEvent::IterationStarted { iteration, .. } => Some(format!("  [{iteration}] thinking...")),
        RunEvent::ToolExecuted {
            tool_name,
            status,
            duration_ms,
            ..
        } => {
            let mark = match status {
                ToolStatus::Success => "ok",
                ToolStatus::Error => "error",
            };
            Some(format!("      {tool_name} -> {mark} ({duration_ms} ms)"))
        }
        RunEvent::ToolCallsDiscarded { discarded, .. } => Some(format!(
            "      ignored {} extra tool call(s)",
            discarded.len()
        )),
        _ => None,
    }
}

fn print_summary(report: &RunReport) {
    println!();
    match &report.state {
        LoopState::Completed { payload: Some(text) } => println!("{text}"),
        LoopState::Completed { payload: None } => {
            println!("Agent finished without delivering a result.")
        }
        LoopState::Failed { reason } => eprintln!("Run failed: {reason}"),
        LoopState::Running => {}
    }
    eprintln!(
        "  {} iterations, {} failed tool calls",
        report.iterations, report.errors
    );
}
