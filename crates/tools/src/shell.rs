//! Shell tool: run commands through a [`SandboxExecutor`].
//!
//! `exec` blocks until the command finishes; `view` returns the last
//! output recorded for a session. A non-zero exit status is a failure.

use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use stepwise_core::error::ToolError;
use stepwise_core::sandbox::{DEFAULT_EXEC_TIMEOUT_SECS, ExecOutput, ExecRequest, SandboxExecutor};
use stepwise_core::tool::{FieldSchema, ToolKind, ToolSchema};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ShellAction {
    Exec,
    View,
}

#[derive(Debug, Deserialize)]
struct ShellInput {
    action: ShellAction,
    command: Option<String>,
    session: String,
    #[serde(default = "default_timeout")]
    timeout: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_EXEC_TIMEOUT_SECS
}

pub fn schema() -> ToolSchema {
    ToolSchema::new(
        ToolKind::Shell,
        "Execute a shell command in a sandboxed environment and return stdout, stderr and \
         the exit code. Use 'view' to see the latest output of a session.",
        vec![
            FieldSchema::string("action", "exec runs a command; view shows the last output")
                .one_of(&["exec", "view"])
                .required(),
            FieldSchema::string("command", "The command to execute (exec only)"),
            FieldSchema::string("session", "Identifier of the shell session").required(),
            FieldSchema::integer("timeout", "Timeout in seconds")
                .default_value(json!(DEFAULT_EXEC_TIMEOUT_SECS)),
        ],
    )
}

pub(crate) fn output_payload(output: &ExecOutput) -> Value {
    json!({
        "output": output.stdout,
        "stderr": output.stderr,
        "exit_code": output.exit_code,
    })
}

pub struct ShellTool {
    sandbox: Arc<dyn SandboxExecutor>,
}

impl ShellTool {
    pub fn new(sandbox: Arc<dyn SandboxExecutor>) -> Self {
        Self { sandbox }
    }

    pub async fn handle(&self, input: Value) -> Result<Value, ToolError> {
        let input: ShellInput = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidArguments(format!("shell: {e}")))?;

        match input.action {
            ShellAction::Exec => {
                let command = input
                    .command
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| ToolError::InvalidArguments("shell: 'exec' requires command".into()))?;

                debug!(
                    sandbox = self.sandbox.name(),
                    session = %input.session,
                    command = %command,
                    "Executing shell command"
                );
                let output = self
                    .sandbox
                    .exec(ExecRequest {
                        command: command.clone(),
                        session: input.session,
                        timeout_secs: input.timeout,
                    })
                    .await?;

                if !output.success() {
                    warn!(command = %command, exit_code = output.exit_code, "Command failed");
                    return Err(ToolError::CommandFailed { output });
                }
                Ok(output_payload(&output))
            }
            ShellAction::View => {
                let output = self.sandbox.view(&input.session).await?;
                Ok(output_payload(&output))
            }
        }
    }
}
