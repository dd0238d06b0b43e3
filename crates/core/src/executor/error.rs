//! Error types for the executor module.

use std::path::PathBuf;
use thiserror::Error;

use crate::sink::SinkError;

/// Errors that prevent the executor from producing a report.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// The time budget ran out.
    #[error("Execution timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Fetching an input failed for a reason other than it being missing.
    #[error("Failed to stage input '{name}': {reason}")]
    Staging { name: String, reason: String },

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// The ffmpeg command could not be parsed into arguments.
    #[error("Invalid ffmpeg command: {0}")]
    InvalidCommand(String),

    /// The executor task died without reporting.
    #[error("Executor crashed: {0}")]
    Crashed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecutorError {
    pub fn staging(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Staging {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
