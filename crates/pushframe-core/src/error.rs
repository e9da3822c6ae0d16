//! Connection error types.

use pushframe_proto::ProtocolError;
use thiserror::Error;

/// Errors fatal to a single connection.
///
/// None of these are ever answered on the wire: the protocol has no
/// error-reply frame by design, so an unauthenticated peer learns
/// nothing. The driver closes the connection and removes it from the
/// registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The peer violated the framing or the registration layout.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Registration named an application the directory does not know.
    #[error("unknown application")]
    UnknownApplication,

    /// The handshake tag failed verification under the claimed
    /// application's key.
    #[error("handshake authentication rejected")]
    HandshakeRejected,
}
