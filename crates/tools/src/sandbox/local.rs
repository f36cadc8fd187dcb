//! Host executor: `sh -c` in a fixed working directory.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use stepwise_core::error::SandboxError;
use stepwise_core::sandbox::{ExecOutput, ExecRequest, SandboxExecutor};
use tokio::process::Command;
use tracing::debug;

use super::{SessionLog, run_with_timeout};

pub struct LocalSandbox {
    workspace: PathBuf,
    sessions: SessionLog,
}

impl LocalSandbox {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
            sessions: SessionLog::default(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }
}

#[async_trait]
impl SandboxExecutor for LocalSandbox {
    fn name(&self) -> &str {
        "local"
    }

    async fn exec(&self, request: ExecRequest) -> Result<ExecOutput, SandboxError> {
        tokio::fs::create_dir_all(&self.workspace)
            .await
            .map_err(|e| SandboxError::SpawnFailed(format!("workspace {}: {e}", self.workspace.display())))?;

        let mut command = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", &request.command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", &request.command]);
            c
        };
        command.current_dir(&self.workspace);

        let output = run_with_timeout(command, request.timeout_secs).await?;
        debug!(session = %request.session, exit_code = output.exit_code, "Local command finished");
        self.sessions.record(&request.session, &output);
        Ok(output)
    }

    async fn view(&self, session: &str) -> Result<ExecOutput, SandboxError> {
        self.sessions.get(session)
    }
}
