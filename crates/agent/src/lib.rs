//! The Stepwise agent loop.
//!
//! Each run follows a **query → act → observe** cycle:
//!
//! 1. **Query** the model with the conversation and the four tool schemas
//! 2. **Act**: execute exactly one tool call through the dispatcher
//! 3. **Observe**: append the assistant turn and the tool result
//! 4. **Decide**: complete on a `result` message or end of turn, fail on the
//!    error threshold, the iteration cap, or a protocol violation

pub mod loop_runner;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use loop_runner::{AgentLoop, RunReport};
