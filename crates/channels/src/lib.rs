//! User channel implementations for Stepwise.
//!
//! The `message` tool relays everything through a channel:
//! - **Console**: prints to stdout, reads answers from stdin
//! - **Inbox**: queues messages for an embedding host and suspends `ask`
//!   until the host posts a reply

pub mod console;
pub mod inbox;

pub use console::ConsoleChannel;
pub use inbox::{InboxChannel, InboxHandle, Outbound};
