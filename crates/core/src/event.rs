//! Run events: what observers see while a run progresses.
//!
//! The agent loop publishes events as it goes; the CLI (or any other
//! subscriber) renders them. Publishing never blocks the loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use crate::state::LoopState;
use crate::tool::ToolStatus;

/// All events emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A run began
    RunStarted {
        conversation_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A model query is about to be issued
    IterationStarted {
        iteration: u32,
        timestamp: DateTime<Utc>,
    },

    /// The model answered
    ResponseReceived {
        model: String,
        stop_reason: String,
        tokens_used: Option<u32>,
        timestamp: DateTime<Utc>,
    },

    /// The model sent more than one tool invocation; all but the first were dropped
    ToolCallsDiscarded {
        kept: String,
        discarded: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A tool call was dispatched
    ToolExecuted {
        call_id: String,
        tool_name: String,
        input: serde_json::Value,
        status: ToolStatus,
        output: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The run reached a terminal state
    RunFinished {
        state: LoopState,
        iterations: u32,
        errors: u32,
        timestamp: DateTime<Utc>,
    },
}

impl RunEvent {
    /// Short name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::IterationStarted { .. } => "iteration_started",
            Self::ResponseReceived { .. } => "response_received",
            Self::ToolCallsDiscarded { .. } => "tool_calls_discarded",
            Self::ToolExecuted { .. } => "tool_executed",
            Self::RunFinished { .. } => "run_finished",
        }
    }
}

/// A broadcast-based event bus for run events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<RunEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: RunEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RunEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
