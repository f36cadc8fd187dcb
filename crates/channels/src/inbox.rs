//! Inbox channel: user interaction for an embedding host.
//!
//! The agent side ([`InboxChannel`]) pushes every message onto an outbound
//! queue. `ask` additionally pushes a pending-input marker and then waits
//! for the host to post a reply through the [`InboxHandle`]. If the handle
//! is dropped while a question is open, `ask` fails with
//! [`ChannelError::Closed`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stepwise_core::channel::{UserChannel, UserMessage};
use stepwise_core::error::ChannelError;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

/// Something the agent wants the host to show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Outbound {
    /// An info or result message; no reply expected
    Message { message: UserMessage },
    /// A question; the run is suspended until a reply is posted
    PendingInput { message: UserMessage },
}

pub struct InboxChannel {
    outbound: mpsc::Sender<Outbound>,
    replies: Mutex<mpsc::Receiver<String>>,
}

/// The host's end of an [`InboxChannel`].
pub struct InboxHandle {
    outbound: mpsc::Receiver<Outbound>,
    replies: mpsc::Sender<String>,
}

impl InboxChannel {
    pub fn new() -> (Self, InboxHandle) {
        Self::with_capacity(32)
    }

    pub fn with_capacity(capacity: usize) -> (Self, InboxHandle) {
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let (reply_tx, reply_rx) = mpsc::channel(capacity);
        (
            Self {
                outbound: out_tx,
                replies: Mutex::new(reply_rx),
            },
            InboxHandle {
                outbound: out_rx,
                replies: reply_tx,
            },
        )
    }

    async fn push(&self, event: Outbound) -> Result<(), ChannelError> {
        self.outbound.send(event).await.map_err(|_| ChannelError::Closed)
    }
}

impl InboxHandle {
    /// Wait for the next outbound event. `None` once the channel is dropped.
    pub async fn next_outbound(&mut self) -> Option<Outbound> {
        self.outbound.recv().await
    }

    /// Answer the open question.
    pub async fn reply(&self, text: impl Into<String>) -> Result<(), ChannelError> {
        self.replies
            .send(text.into())
            .await
            .map_err(|_| ChannelError::Closed)
    }
}

#[async_trait]
impl UserChannel for InboxChannel {
    fn name(&self) -> &str {
        "inbox"
    }

    async fn notify(&self, message: &UserMessage) -> Result<(), ChannelError> {
        self.push(Outbound::Message {
            message: message.clone(),
        })
        .await
    }

    async fn ask(&self, message: &UserMessage) -> Result<String, ChannelError> {
        // Hold the reply lock across the marker so answers pair with questions
        let mut replies = self.replies.lock().await;
        self.push(Outbound::PendingInput {
            message: message.clone(),
        })
        .await?;
        debug!("Waiting for user reply");
        replies.recv().await.ok_or(ChannelError::Closed)
    }
}
