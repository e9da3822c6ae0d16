//! Error types for wire-format parsing.

use thiserror::Error;

/// Errors produced while assembling or parsing wire data.
///
/// Every variant is a protocol violation: the connection that produced it
/// is closed without a reply (the wire protocol has no error frame).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A frame declared a payload length that can never fit the receive
    /// buffer together with its length prefix.
    #[error("declared frame length {declared} exceeds buffer capacity {capacity}")]
    FrameTooLarge {
        /// Payload length taken from the frame's 2-byte prefix.
        declared: usize,
        /// Total receive buffer capacity, including the prefix bytes.
        capacity: usize,
    },

    /// More bytes were pushed into the assembler than it has free space
    /// for. The caller is expected to read at most
    /// [`remaining_capacity`](crate::FrameAssembler::remaining_capacity)
    /// bytes per chunk.
    #[error("receive buffer overflow: {pushed} bytes pushed, {free} free")]
    BufferOverflow {
        /// Size of the offending chunk.
        pushed: usize,
        /// Free buffer space at the time of the push.
        free: usize,
    },

    /// A payload is too long to carry in an inbound frame's u16 prefix.
    #[error("payload of {0} bytes does not fit an inbound frame")]
    PayloadTooLarge(usize),

    /// A registration payload did not match the expected layout.
    #[error("malformed registration record: {0}")]
    MalformedRegistration(&'static str),

    /// An outbound message frame did not match the expected layout.
    #[error("malformed message frame: {0}")]
    MalformedMessageFrame(&'static str),
}
