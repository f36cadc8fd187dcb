//! SandboxExecutor trait: where `shell` commands actually run.
//!
//! The loop treats the executor as opaque: it hands over a command, a
//! session id and an advisory timeout, and blocks until the executor
//! returns. Container lifecycle and resource limits belong to the
//! implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::SandboxError;

/// Default advisory timeout for a command, in seconds.
pub const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 30;

/// A command to run inside a sandbox session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecRequest {
    pub command: String,
    pub session: String,
    /// Advisory; enforcement is up to the executor.
    pub timeout_secs: u64,
}

/// Captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait SandboxExecutor: Send + Sync {
    /// A human-readable name for this executor (e.g., "local", "docker").
    fn name(&self) -> &str;

    /// Run a command and wait for it to finish.
    async fn exec(&self, request: ExecRequest) -> Result<ExecOutput, SandboxError>;

    /// The most recent output recorded for `session`.
    async fn view(&self, session: &str) -> Result<ExecOutput, SandboxError>;
}
