//! Registry error types.

use thiserror::Error;

/// Errors from the application registry.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The registry file could not be read or written.
    #[error("failed to access the application registry file: {0}")]
    Io(#[from] std::io::Error),

    /// The registry file does not follow the line-oriented record
    /// format. Individual bad records are tolerated and logged; this is
    /// for files whose structure cannot be followed at all.
    #[error("application registry file is malformed: {0}")]
    MalformedFile(&'static str),

    /// An operation named an application that is not in the registry.
    #[error("unknown application {0}")]
    UnknownApplication(String),
}
