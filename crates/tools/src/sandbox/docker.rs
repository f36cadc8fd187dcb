//! Container executor: one `docker run --rm` per command.

use async_trait::async_trait;
use stepwise_core::error::SandboxError;
use stepwise_core::sandbox::{ExecOutput, ExecRequest, SandboxExecutor};
use tokio::process::Command;
use tracing::debug;

use super::{SessionLog, run_with_timeout};

/// Container image and resource limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerSettings {
    pub image: String,
    pub memory_limit: String,
    pub cpu_quota: u64,
    pub network: String,
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self {
            image: "ubuntu:22.04".into(),
            memory_limit: "512m".into(),
            cpu_quota: 100_000,
            network: "bridge".into(),
        }
    }
}

pub struct DockerSandbox {
    settings: DockerSettings,
    sessions: SessionLog,
}

impl DockerSandbox {
    pub fn new(settings: DockerSettings) -> Self {
        Self {
            settings,
            sessions: SessionLog::default(),
        }
    }

    /// Arguments passed to `docker` for one command.
    pub fn run_args(&self, command: &str) -> Vec<String> {
        vec![
            "run".into(),
            "--rm".into(),
            "--memory".into(),
            self.settings.memory_limit.clone(),
            "--cpu-quota".into(),
            self.settings.cpu_quota.to_string(),
            "--network".into(),
            self.settings.network.clone(),
            self.settings.image.clone(),
            "bash".into(),
            "-c".into(),
            command.into(),
        ]
    }
}

#[async_trait]
impl SandboxExecutor for DockerSandbox {
    fn name(&self) -> &str {
        "docker"
    }

    async fn exec(&self, request: ExecRequest) -> Result<ExecOutput, SandboxError> {
        let mut command = Command::new("docker");
        command.args(self.run_args(&request.command));

        debug!(image = %self.settings.image, session = %request.session, "Starting container");
        let output = run_with_timeout(command, request.timeout_secs).await?;
        self.sessions.record(&request.session, &output);
        Ok(output)
    }

    async fn view(&self, session: &str) -> Result<ExecOutput, SandboxError> {
        self.sessions.get(session)
    }
}
