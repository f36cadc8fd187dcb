//! Error types for the Stepwise domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

use crate::sandbox::ExecOutput;

/// The top-level error type for Stepwise operations.
///
/// A run only fails outright when the model cannot be reached; every tool
/// failure is reported back to the model instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Message delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Channel closed before a reply arrived")]
    Closed,

    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),
}

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Failed to start command in sandbox: {0}")]
    SpawnFailed(String),

    #[error("Command timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("No output recorded for session '{0}'")]
    UnknownSession(String),
}

/// Rejections from the plan tracker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("No active plan")]
    NoActivePlan,

    #[error("Duplicate phase id {0} in plan")]
    DuplicatePhaseId(i64),
}

/// Failures raised by a tool handler.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    /// Carries the full capture so stdout reaches the model too
    #[error("Command exited with status {}", output.exit_code)]
    CommandFailed { output: ExecOutput },

    #[error("Permission denied: {tool_name}: {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl ToolError {
    /// Whether this failure is counted toward the run's error threshold.
    ///
    /// `NoActivePlan` is a domain rejection the model can recover from by
    /// sending `update` first; every other handler failure counts.
    pub fn counts_toward_threshold(&self) -> bool {
        !matches!(self, ToolError::Plan(PlanError::NoActivePlan))
    }
}
