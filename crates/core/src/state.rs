//! Per-run loop state.
//!
//! Everything a single `run` mutates lives in [`RunState`]: the
//! conversation, the plan, the error counter and the loop state. A fresh
//! value is created for each run and threaded through every iteration.

use serde::{Deserialize, Serialize};
use crate::message::Conversation;
use crate::plan::PlanTracker;

/// Default cap on model queries per run.
pub const DEFAULT_MAX_ITERATIONS: u32 = 50;

/// Default number of handler failures that ends a run.
pub const DEFAULT_MAX_ERRORS: u32 = 3;

/// Limits that bound one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLimits {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_max_errors")]
    pub max_errors: u32,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}
fn default_max_errors() -> u32 {
    DEFAULT_MAX_ERRORS
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }
}

/// Running count of handler failures within one run. Never decreases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorCounter(u32);

impl ErrorCounter {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn record(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    pub fn count(&self) -> u32 {
        self.0
    }

    pub fn reached(&self, threshold: u32) -> bool {
        self.0 >= threshold
    }
}

/// Why a run ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("model signaled tool use but sent no tool invocation")]
    ProtocolViolation,

    #[error("max errors reached ({errors} of {threshold})")]
    MaxErrorsReached { errors: u32, threshold: u32 },

    #[error("max iterations reached ({iterations})")]
    MaxIterationsReached { iterations: u32 },

    #[error("unexpected stop reason '{stop_reason}'")]
    UnexpectedStop { stop_reason: String },
}

/// Where the state machine is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoopState {
    Running,
    /// `payload` is `None` when the model simply stopped without delivering
    /// a result message.
    Completed { payload: Option<String> },
    Failed { reason: FailureReason },
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoopState::Running)
    }
}

/// The mutable state of one run.
#[derive(Debug, Clone)]
pub struct RunState {
    pub conversation: Conversation,
    pub plan: PlanTracker,
    pub errors: ErrorCounter,
    pub loop_state: LoopState,
}

impl RunState {
    /// Fresh state with the conversation seeded by one user turn.
    pub fn seeded(initial_message: impl Into<String>) -> Self {
        Self {
            conversation: Conversation::seeded(initial_message),
            plan: PlanTracker::new(),
            errors: ErrorCounter::new(),
            loop_state: LoopState::Running,
        }
    }

    pub fn complete(&mut self, payload: Option<String>) {
        self.loop_state = LoopState::Completed { payload };
    }

    pub fn fail(&mut self, reason: FailureReason) {
        self.loop_state = LoopState::Failed { reason };
    }
}
