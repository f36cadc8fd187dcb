//! Console channel: terminal-based user interaction.
//!
//! Writes messages to stdout. The first `ask` starts a stdin reader on its
//! own OS thread; each later `ask` takes the next line, empty lines
//! included. The reader thread is never joined, so a pending read does not
//! hold up runtime shutdown.
//! Used by `stepwise run`.

use async_trait::async_trait;
use std::io::BufRead;
use stepwise_core::channel::{UserChannel, UserMessage};
use stepwise_core::error::ChannelError;
use tokio::io::{self, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc};
use tracing::warn;

type LineReceiver = mpsc::Receiver<Result<String, ChannelError>>;

pub struct ConsoleChannel {
    lines: Mutex<Option<LineReceiver>>,
}

impl ConsoleChannel {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(None),
        }
    }

    fn spawn_reader() -> LineReceiver {
        let (tx, rx) = mpsc::channel(32);
        let spawned = std::thread::Builder::new()
            .name("stepwise-stdin".into())
            .spawn(move || forward_lines(std::io::stdin().lock(), &tx));
        if let Err(e) = spawned {
            warn!(error = %e, "Failed to start stdin reader");
        }
        rx
    }
}

/// Push each line (trailing newline stripped) until EOF or the receiver goes away.
fn forward_lines(input: impl BufRead, tx: &mpsc::Sender<Result<String, ChannelError>>) {
    for line in input.lines() {
        let item = line.map_err(|e| ChannelError::ConnectionLost(e.to_string()));
        let failed = item.is_err();
        if tx.blocking_send(item).is_err() || failed {
            break;
        }
    }
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn notify(&self, message: &UserMessage) -> Result<(), ChannelError> {
        println!("{message}");
        Ok(())
    }

    async fn ask(&self, message: &UserMessage) -> Result<String, ChannelError> {
        let mut stdout = io::stdout();
        stdout
            .write_all(format!("{message}\n> ").as_bytes())
            .await
            .map_err(|e| ChannelError::DeliveryFailed(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| ChannelError::DeliveryFailed(e.to_string()))?;

        let mut guard = self.lines.lock().await;
        let lines = guard.get_or_insert_with(Self::spawn_reader);
        match lines.recv().await {
            Some(line) => line,
            None => Err(ChannelError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::channel::MessageKind;

    #[test]
    fn console_channel_name() {
        let ch = ConsoleChannel::new();
        assert_eq!(ch.name(), "console");
    }

    #[test]
    fn reader_forwards_empty_lines() {
        let (tx, mut rx) = mpsc::channel(8);
        forward_lines(std::io::Cursor::new("yes\n\n  spaced  \n"), &tx);
        drop(tx);

        let mut got = Vec::new();
        while let Ok(line) = rx.try_recv() {
            got.push(line.unwrap());
        }
        assert_eq!(got, vec!["yes", "", "  spaced  "]);
    }

    #[tokio::test]
    async fn dropped_reader_closes_ask() {
        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        let ch = ConsoleChannel {
            lines: Mutex::new(Some(rx)),
        };
        let msg = UserMessage {
            kind: MessageKind::Ask,
            text: "Anyone there?".into(),
            attachments: vec![],
        };
        assert!(matches!(ch.ask(&msg).await, Err(ChannelError::Closed)));
    }

    #[tokio::test]
    async fn notify_never_fails() {
        let ch = ConsoleChannel::default();
        let msg = UserMessage {
            kind: MessageKind::Info,
            text: "Working on it".into(),
            attachments: vec![],
        };
        assert!(ch.notify(&msg).await.is_ok());
    }
}
