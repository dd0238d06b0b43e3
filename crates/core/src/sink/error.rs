//! Error types for the sink module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while storing or reading objects.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Key is empty, absolute, or has an empty, `.` or `..` segment.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    /// Local file to upload does not exist.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Failed to write object {key}")]
    WriteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
