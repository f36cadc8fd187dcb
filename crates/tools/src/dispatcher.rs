//! Tool dispatcher: turns a [`ToolCall`] into a [`ToolResult`].
//!
//! Handler failures never escape [`ToolDispatcher::dispatch`]. They become
//! `error` results and, unless the failure is exempt, are charged to the
//! run's [`ErrorCounter`].

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use stepwise_core::error::{PlanError, ToolError};
use stepwise_core::plan::PlanTracker;
use stepwise_core::state::ErrorCounter;
use stepwise_core::tool::{DispatchErrorKind, ToolCall, ToolKind, ToolRegistry, ToolResult};
use tracing::{info, warn};

use crate::file::FileTool;
use crate::message::MessageTool;
use crate::plan;
use crate::shell::{self, ShellTool};

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    message: MessageTool,
    shell: ShellTool,
    file: FileTool,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, message: MessageTool, shell: ShellTool, file: FileTool) -> Self {
        Self {
            registry,
            message,
            shell,
            file,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Execute one call against the run's plan and error counter.
    pub async fn dispatch(&self, call: &ToolCall, plan: &mut PlanTracker, errors: &mut ErrorCounter) -> ToolResult {
        let Some(schema) = self.registry.get(&call.name) else {
            warn!(tool = %call.name, call_id = %call.id, "Unknown tool requested");
            return ToolResult::error(
                &call.id,
                DispatchErrorKind::UnknownTool,
                format!("Unknown tool '{}'. Available tools: {}", call.name, self.registry.names().join(", ")),
            );
        };
        let kind = schema.kind;

        let start = Instant::now();
        let outcome = match schema.prepare_input(&call.input) {
            Ok(input) => self.run_handler(kind, input, plan).await,
            Err(reason) => Err(ToolError::InvalidArguments(format!("{kind}: {reason}"))),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(payload) => {
                info!(tool = %kind, call_id = %call.id, duration_ms, "Tool call succeeded");
                ToolResult::success(&call.id, payload)
            }
            Err(e) => {
                let counted = e.counts_toward_threshold();
                if counted {
                    errors.record();
                }
                warn!(
                    tool = %kind,
                    call_id = %call.id,
                    duration_ms,
                    counted,
                    errors = errors.count(),
                    error = %e,
                    "Tool call failed"
                );
                let error_kind = match e {
                    ToolError::Plan(PlanError::NoActivePlan) => DispatchErrorKind::NoActivePlan,
                    _ => DispatchErrorKind::HandlerFailure,
                };
                let result = ToolResult::error(&call.id, error_kind, e.to_string());
                match &e {
                    ToolError::CommandFailed { output } => result.with_details(shell::output_payload(output)),
                    _ => result,
                }
            }
        }
    }

    async fn run_handler(&self, kind: ToolKind, input: Value, tracker: &mut PlanTracker) -> Result<Value, ToolError> {
        match kind {
            ToolKind::Plan => plan::handle(input, tracker),
            ToolKind::Message => self.message.handle(input).await,
            ToolKind::Shell => self.shell.handle(input).await,
            ToolKind::File => self.file.handle(input).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::LocalSandbox;
    use crate::standard_registry;
    use async_trait::async_trait;
    use serde_json::json;
    use stepwise_core::channel::{UserChannel, UserMessage};
    use stepwise_core::error::ChannelError;
    use stepwise_core::tool::ToolStatus;
    use stepwise_security::PathPolicy;

    struct SilentChannel;

    #[async_trait]
    impl UserChannel for SilentChannel {
        fn name(&self) -> &str {
            "silent"
        }
        async fn notify(&self, _message: &UserMessage) -> Result<(), ChannelError> {
            Ok(())
        }
        async fn ask(&self, _message: &UserMessage) -> Result<String, ChannelError> {
            Err(ChannelError::Closed)
        }
    }

    fn dispatcher(workspace: &std::path::Path) -> ToolDispatcher {
        ToolDispatcher::new(
            Arc::new(standard_registry()),
            MessageTool::new(Arc::new(SilentChannel)),
            ShellTool::new(Arc::new(LocalSandbox::new(workspace))),
            FileTool::new(PathPolicy::permissive()),
        )
    }

    fn call(name: &str, input: Value) -> ToolCall {
        ToolCall {
            id: "toolu_01".into(),
            name: name.into(),
            input,
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        let d = dispatcher(dir.path());
        let (mut plan, mut errors) = (PlanTracker::new(), ErrorCounter::new());

        let result = d.dispatch(&call("browser", json!({})), &mut plan, &mut errors).await;

        assert_eq!(result.status, ToolStatus::Error);
        assert_eq!(result.error_kind, Some(DispatchErrorKind::UnknownTool));
        assert_eq!(result.call_id, "toolu_01");
        assert_eq!(errors.count(), 0);
    }

    #[tokio::test]
    async fn handler_failure_counts_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let d = dispatcher(dir.path());
        let (mut plan, mut errors) = (PlanTracker::new(), ErrorCounter::new());

        let result = d
            .dispatch(
                &call("shell", json!({"action": "exec", "command": "false", "session": "s"})),
                &mut plan,
                &mut errors,
            )
            .await;

        assert_eq!(result.error_kind, Some(DispatchErrorKind::HandlerFailure));
        assert!(result.payload["message"].as_str().unwrap().contains("status 1"));
        assert_eq!(errors.count(), 1);
    }

    #[tokio::test]
    async fn failed_command_result_carries_output() {
        let dir = tempfile::tempdir().unwrap();
        let d = dispatcher(dir.path());
        let (mut plan, mut errors) = (PlanTracker::new(), ErrorCounter::new());

        let result = d
            .dispatch(
                &call(
                    "shell",
                    json!({"action": "exec", "command": "echo 3 tests FAILED; echo boom >&2; exit 1", "session": "s"}),
                ),
                &mut plan,
                &mut errors,
            )
            .await;

        assert_eq!(result.error_kind, Some(DispatchErrorKind::HandlerFailure));
        assert!(result.payload["output"].as_str().unwrap().contains("3 tests FAILED"));
        assert!(result.payload["stderr"].as_str().unwrap().contains("boom"));
        assert_eq!(result.payload["exit_code"], 1);
        assert_eq!(result.payload["kind"], "handler_failure");

        let content = result.to_content();
        assert!(content.contains(r#""status":"error""#));
        assert!(content.contains("3 tests FAILED"));
        assert_eq!(errors.count(), 1);
    }

    #[tokio::test]
    async fn schema_violation_is_handler_failure() {
        let dir = tempfile::tempdir().unwrap();
        let d = dispatcher(dir.path());
        let (mut plan, mut errors) = (PlanTracker::new(), ErrorCounter::new());

        let result = d
            .dispatch(&call("shell", json!({"action": "exec", "command": "ls"})), &mut plan, &mut errors)
            .await;
        assert_eq!(result.error_kind, Some(DispatchErrorKind::HandlerFailure));
        assert!(result.payload["message"].as_str().unwrap().contains("session"));

        let result = d
            .dispatch(&call("file", json!({"action": "delete", "path": "/tmp/x"})), &mut plan, &mut errors)
            .await;
        assert_eq!(result.error_kind, Some(DispatchErrorKind::HandlerFailure));
        assert_eq!(errors.count(), 2);
    }

    #[tokio::test]
    async fn advance_without_plan_is_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        let d = dispatcher(dir.path());
        let (mut plan, mut errors) = (PlanTracker::new(), ErrorCounter::new());

        let result = d
            .dispatch(
                &call("plan", json!({"action": "advance", "current_phase_id": 1, "next_phase_id": 2})),
                &mut plan,
                &mut errors,
            )
            .await;

        assert_eq!(result.error_kind, Some(DispatchErrorKind::NoActivePlan));
        assert_eq!(errors.count(), 0);
        assert!(plan.plan().is_none());
    }

    #[tokio::test]
    async fn advance_missing_target_without_plan_is_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        let d = dispatcher(dir.path());
        let (mut plan, mut errors) = (PlanTracker::new(), ErrorCounter::new());

        let result = d
            .dispatch(
                &call("plan", json!({"action": "advance", "current_phase_id": 1})),
                &mut plan,
                &mut errors,
            )
            .await;

        assert_eq!(result.error_kind, Some(DispatchErrorKind::NoActivePlan));
        assert_eq!(errors.count(), 0);
    }

    #[tokio::test]
    async fn update_then_advance() {
        let dir = tempfile::tempdir().unwrap();
        let d = dispatcher(dir.path());
        let (mut plan, mut errors) = (PlanTracker::new(), ErrorCounter::new());

        let update = d
            .dispatch(
                &call(
                    "plan",
                    json!({
                        "action": "update",
                        "goal": "Tidy the repo",
                        "current_phase_id": 1,
                        "phases": [{"id": 1, "title": "Scan"}, {"id": 2, "title": "Fix"}]
                    }),
                ),
                &mut plan,
                &mut errors,
            )
            .await;
        assert!(update.is_success());

        let advance = d
            .dispatch(
                &call("plan", json!({"action": "advance", "current_phase_id": 1, "next_phase_id": 2})),
                &mut plan,
                &mut errors,
            )
            .await;
        assert!(advance.is_success());
        assert_eq!(advance.payload["current_phase_id"], 2);
        assert_eq!(plan.plan().unwrap().current_phase_id, Some(2));
        assert_eq!(errors.count(), 0);
    }

    #[tokio::test]
    async fn shell_timeout_default_is_filled() {
        let dir = tempfile::tempdir().unwrap();
        let d = dispatcher(dir.path());
        let (mut plan, mut errors) = (PlanTracker::new(), ErrorCounter::new());

        let result = d
            .dispatch(
                &call("shell", json!({"action": "exec", "command": "echo ok", "session": "s"})),
                &mut plan,
                &mut errors,
            )
            .await;
        assert!(result.is_success());
        assert!(result.to_content().contains(r#""status":"success""#));
    }

    #[tokio::test]
    async fn channel_failure_is_handler_failure() {
        let dir = tempfile::tempdir().unwrap();
        let d = dispatcher(dir.path());
        let (mut plan, mut errors) = (PlanTracker::new(), ErrorCounter::new());

        let result = d
            .dispatch(&call("message", json!({"type": "ask", "text": "Proceed?"})), &mut plan, &mut errors)
            .await;
        assert_eq!(result.error_kind, Some(DispatchErrorKind::HandlerFailure));
        assert_eq!(errors.count(), 1);
    }
}
