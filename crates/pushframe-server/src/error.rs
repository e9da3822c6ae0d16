//! Server error types.

use pushframe_directory::DirectoryError;
use thiserror::Error;

/// Failures that abort startup or the whole process.
///
/// Per-connection failures never surface here; they are fatal only to
/// the connection that caused them and are handled inside the event
/// loop.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The notification listener could not be bound.
    #[error("failed to bind the notification listener: {0}")]
    Bind(std::io::Error),

    /// The HTTP API listener could not be bound or failed while serving.
    #[error("HTTP API failure: {0}")]
    Http(std::io::Error),

    /// The application registry could not be opened.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
