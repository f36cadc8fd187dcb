//! UserChannel trait: how the agent talks to the person it works for.
//!
//! The `message` tool relays every message through a channel. `info` and
//! `result` messages are fire-and-forget; `ask` suspends the run until the
//! channel produces a reply.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ChannelError;

/// The kind of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Non-blocking progress update
    Info,
    /// Question that needs a reply before the run continues
    Ask,
    /// Final deliverable; ends the run
    Result,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Info => "info",
            MessageKind::Ask => "ask",
            MessageKind::Result => "result",
        }
    }
}

/// A message from the agent to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub kind: MessageKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl std::fmt::Display for UserMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str().to_uppercase(), self.text)?;
        if !self.attachments.is_empty() {
            write!(f, "\nAttachments: {}", self.attachments.join(", "))?;
        }
        Ok(())
    }
}

/// A channel that can surface messages to the user and collect replies.
#[async_trait]
pub trait UserChannel: Send + Sync {
    /// A human-readable name for this channel (e.g., "console").
    fn name(&self) -> &str;

    /// Surface a message immediately.
    async fn notify(&self, message: &UserMessage) -> Result<(), ChannelError>;

    /// Surface a question and wait for the user's reply.
    async fn ask(&self, message: &UserMessage) -> Result<String, ChannelError>;
}
