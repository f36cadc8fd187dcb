//! Sandbox executors backing the `shell` tool.
//!
//! - [`LocalSandbox`] runs `sh -c` on the host inside a workspace directory.
//! - [`DockerSandbox`] runs each command in a throwaway container.
//!
//! Both keep the last output of every session so `view` can replay it.

pub mod docker;
pub mod local;

pub use docker::{DockerSandbox, DockerSettings};
pub use local::LocalSandbox;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use stepwise_core::error::SandboxError;
use stepwise_core::sandbox::ExecOutput;
use tokio::process::Command;

/// Last recorded output per session id.
#[derive(Debug, Default)]
pub(crate) struct SessionLog {
    last: Mutex<HashMap<String, ExecOutput>>,
}

impl SessionLog {
    pub(crate) fn record(&self, session: &str, output: &ExecOutput) {
        if let Ok(mut last) = self.last.lock() {
            last.insert(session.to_string(), output.clone());
        }
    }

    pub(crate) fn get(&self, session: &str) -> Result<ExecOutput, SandboxError> {
        self.last
            .lock()
            .ok()
            .and_then(|last| last.get(session).cloned())
            .ok_or_else(|| SandboxError::UnknownSession(session.to_string()))
    }
}

/// Run a prepared command to completion, killing it once `timeout_secs` elapse.
pub(crate) async fn run_with_timeout(
    mut command: Command,
    timeout_secs: u64,
) -> Result<ExecOutput, SandboxError> {
    command.kill_on_drop(true);
    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), command.output())
        .await
        .map_err(|_| SandboxError::Timeout { timeout_secs })?
        .map_err(|e| SandboxError::SpawnFailed(e.to_string()))?;

    Ok(ExecOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}
