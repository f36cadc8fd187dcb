//! # Stepwise Core
//!
//! Domain types, collaborator traits, and error definitions for the
//! Stepwise agent loop. This crate performs no I/O of its own: it
//! defines the model that every other crate implements against.
//!
//! ## Layout
//!
//! - Collaborators the loop consumes are traits here: [`Provider`] (the
//!   remote model), [`SandboxExecutor`] (where `shell` runs) and
//!   [`UserChannel`] (where `message` goes).
//! - Per-run state ([`RunState`]) bundles the conversation, the plan and the
//!   error counter so nothing about a run is ambient.
//! - The tool set is closed ([`ToolKind`]); [`ToolRegistry`] holds one
//!   schema per kind.

pub mod error;
pub mod message;
pub mod provider;
pub mod channel;
pub mod sandbox;
pub mod tool;
pub mod plan;
pub mod state;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{ContentBlock, Conversation, ConversationId, Role, Turn};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StopReason};
pub use channel::{MessageKind, UserChannel, UserMessage};
pub use sandbox::{ExecOutput, ExecRequest, SandboxExecutor};
pub use tool::{DispatchErrorKind, ToolCall, ToolKind, ToolRegistry, ToolResult, ToolSchema, ToolStatus};
pub use plan::{Phase, Plan, PlanTracker};
pub use state::{ErrorCounter, FailureReason, LoopState, RunLimits, RunState};
pub use event::{EventBus, RunEvent};
