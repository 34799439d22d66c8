//! Error types for group processing.

use thiserror::Error;

/// Failure of one group. Recorded against the group; never stops the stage.
#[derive(Debug, Error)]
pub enum GroupProcessingError {
    /// The pipeline reported a failure.
    #[error("pipeline failed: {message}")]
    Failed {
        message: String,
        /// Captured diagnostic output, if any.
        details: Option<String>,
    },

    /// The pipeline did not finish in time.
    #[error("pipeline timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The pipeline executable is missing.
    #[error("pipeline command not found: {command}")]
    CommandNotFound { command: String },

    /// The processor call panicked.
    #[error("pipeline panicked: {0}")]
    Panicked(String),

    /// I/O error around the pipeline call.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GroupProcessingError {
    pub fn failed(message: impl Into<String>, details: Option<String>) -> Self {
        Self::Failed {
            message: message.into(),
            details,
        }
    }
}
