//! Runner error taxonomy.

use std::time::Duration;

/// Errors produced while loading configuration or driving an agent session.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("agent process error: {0}")]
    Process(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("run exceeded its deadline of {}s", .0.as_secs())]
    DeadlineExceeded(Duration),
}

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;

impl RunnerError {
    /// Caller cancellation and deadline expiry both count as cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RunnerError::Cancelled | RunnerError::DeadlineExceeded(_))
    }
}
