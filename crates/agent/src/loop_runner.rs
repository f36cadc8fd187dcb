//! The agent loop state machine.
//!
//! One `run` owns a fresh [`RunState`]. Each iteration sends the
//! conversation to the model, executes at most one tool call and then
//! decides whether to continue, complete or fail.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use stepwise_core::event::{EventBus, RunEvent};
use stepwise_core::message::{ContentBlock, Conversation, Turn};
use stepwise_core::plan::Plan;
use stepwise_core::provider::{Provider, ProviderRequest, StopReason};
use stepwise_core::state::{FailureReason, LoopState, RunLimits, RunState};
use stepwise_core::tool::ToolCall;
use stepwise_tools::{ToolDispatcher, message};
use tracing::{debug, info, warn};

use crate::prompt;

const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Outcome of one `run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub state: LoopState,
    /// Number of model queries issued
    pub iterations: u32,
    /// Final value of the error counter
    pub errors: u32,
    pub conversation: Conversation,
    pub plan: Option<Plan>,
}

impl RunReport {
    /// The result-message text, when the run delivered one.
    pub fn payload(&self) -> Option<&str> {
        match &self.state {
            LoopState::Completed { payload } => payload.as_deref(),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, LoopState::Completed { .. })
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.state {
            LoopState::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// The core agent loop that orchestrates model calls and tool execution.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    dispatcher: Arc<ToolDispatcher>,
    limits: RunLimits,
    system_prompt: Option<String>,
    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, dispatcher: Arc<ToolDispatcher>, event_bus: Arc<EventBus>) -> Self {
        Self {
            provider,
            model: DEFAULT_MODEL.into(),
            temperature: 0.7,
            max_tokens: DEFAULT_MAX_TOKENS,
            dispatcher,
            limits: RunLimits::default(),
            system_prompt: None,
            event_bus,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the maximum number of model queries per run.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.limits.max_iterations = max;
        self
    }

    /// Set the number of handler failures that ends a run.
    pub fn with_max_errors(mut self, max: u32) -> Self {
        self.limits.max_errors = max;
        self
    }

    /// Replace the built-in system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn limits(&self) -> RunLimits {
        self.limits
    }

    /// Drive one task from `initial_message` to a terminal state.
    ///
    /// Only a failure to reach the model is returned as `Err`; every other
    /// way a run can end is reported through [`RunReport::state`].
    pub async fn run(&self, initial_message: impl Into<String>) -> Result<RunReport, stepwise_core::Error> {
        let mut state = RunState::seeded(initial_message);
        let system = self
            .system_prompt
            .clone()
            .unwrap_or_else(|| prompt::system_prompt(Utc::now()));
        let tools = self.dispatcher.registry().definitions();

        info!(
            conversation_id = %state.conversation.id,
            max_iterations = self.limits.max_iterations,
            max_errors = self.limits.max_errors,
            "Starting run"
        );
        self.event_bus.publish(RunEvent::RunStarted {
            conversation_id: state.conversation.id.to_string(),
            timestamp: Utc::now(),
        });

        let mut iterations = 0;
        while iterations < self.limits.max_iterations {
            iterations += 1;
            debug!(iteration = iterations, turns = state.conversation.len(), "Agent loop iteration");
            self.event_bus.publish(RunEvent::IterationStarted {
                iteration: iterations,
                timestamp: Utc::now(),
            });

            let request = ProviderRequest {
                model: self.model.clone(),
                system: Some(system.clone()),
                turns: state.conversation.snapshot().to_vec(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tools.clone(),
            };
            let response = self.provider.complete(request).await?;

            self.event_bus.publish(RunEvent::ResponseReceived {
                model: response.model.clone(),
                stop_reason: response.stop_reason.to_string(),
                tokens_used: response.usage.as_ref().map(|u| u.total_tokens),
                timestamp: Utc::now(),
            });

            match &response.stop_reason {
                StopReason::EndTurn => {
                    state.conversation.append(Turn::assistant(response.content));
                    state.complete(None);
                    break;
                }
                StopReason::ToolUse => {}
                other => {
                    warn!(stop_reason = %other, "Unexpected stop reason");
                    let stop_reason = other.to_string();
                    state.conversation.append(Turn::assistant(response.content));
                    state.fail(FailureReason::UnexpectedStop { stop_reason });
                    break;
                }
            }

            let (kept, call, discarded) = select_tool_call(response.content);
            let Some(call) = call else {
                warn!("Model signaled tool use without a tool invocation");
                state.conversation.append(Turn::assistant(kept));
                state.fail(FailureReason::ProtocolViolation);
                break;
            };
            if !discarded.is_empty() {
                warn!(
                    kept = %call.id,
                    discarded = ?discarded,
                    "Model sent more than one tool call; only the first is executed"
                );
                self.event_bus.publish(RunEvent::ToolCallsDiscarded {
                    kept: call.id.clone(),
                    discarded,
                    timestamp: Utc::now(),
                });
            }

            let start = Instant::now();
            let result = self
                .dispatcher
                .dispatch(&call, &mut state.plan, &mut state.errors)
                .await;
            let content = result.to_content();

            self.event_bus.publish(RunEvent::ToolExecuted {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                input: call.input.clone(),
                status: result.status,
                output: content.clone(),
                duration_ms: start.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
            });

            state.conversation.append(Turn::assistant(kept));
            state
                .conversation
                .append(Turn::tool_result(&call.id, content, !result.is_success()));

            if result.is_success()
                && let Some(text) = message::result_text(&call)
            {
                state.complete(Some(text.to_string()));
                break;
            }

            if state.errors.reached(self.limits.max_errors) {
                warn!(errors = state.errors.count(), "Error threshold reached");
                state.fail(FailureReason::MaxErrorsReached {
                    errors: state.errors.count(),
                    threshold: self.limits.max_errors,
                });
                break;
            }
        }

        if !state.loop_state.is_terminal() {
            warn!(iterations, "Max iterations reached");
            state.fail(FailureReason::MaxIterationsReached { iterations });
        }

        info!(
            conversation_id = %state.conversation.id,
            iterations,
            errors = state.errors.count(),
            state = ?state.loop_state,
            "Run finished"
        );
        self.event_bus.publish(RunEvent::RunFinished {
            state: state.loop_state.clone(),
            iterations,
            errors: state.errors.count(),
            timestamp: Utc::now(),
        });

        Ok(RunReport {
            state: state.loop_state,
            iterations,
            errors: state.errors.count(),
            conversation: state.conversation,
            plan: state.plan.into_plan(),
        })
    }
}

/// Keep text blocks and the first tool invocation; drop later invocations.
///
/// Returns the content to record, the selected call and the ids of the
/// discarded invocations.
fn select_tool_call(content: Vec<ContentBlock>) -> (Vec<ContentBlock>, Option<ToolCall>, Vec<String>) {
    let mut kept = Vec::with_capacity(content.len());
    let mut selected = None;
    let mut discarded = Vec::new();

    for block in content {
        match block {
            ContentBlock::ToolUse { id, name, input } => {
                if selected.is_none() {
                    selected = Some(ToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                    });
                    kept.push(ContentBlock::ToolUse { id, name, input });
                } else {
                    discarded.push(id);
                }
            }
            other => kept.push(other),
        }
    }

    (kept, selected, discarded)
}
