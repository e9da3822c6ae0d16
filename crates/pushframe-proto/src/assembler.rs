//! Inbound frame assembly.
//!
//! Clients speak a minimal length-prefixed framing: a little-endian u16
//! payload length followed by that many payload bytes. The assembler owns
//! the fixed receive buffer for one connection and turns an arbitrary
//! sequence of byte chunks into complete frame payloads, however the chunk
//! boundaries fall: inside the prefix, mid-payload, or exactly on a frame
//! boundary.

use bytes::Bytes;

use crate::errors::ProtocolError;

/// Receive buffer capacity per connection, in bytes.
///
/// Also the upper bound on an inbound frame: a declared payload length
/// that cannot fit the buffer together with its 2-byte prefix is a
/// protocol violation. This bounds memory per connection and rejects
/// oversized or malformed frames before they are buffered.
pub const RECV_BUFFER_SIZE: usize = 1024;

/// Size of the inbound frame length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Assembles length-prefixed frames from a stream of byte chunks.
///
/// Pure state machine, no I/O: the caller reads from the socket (at most
/// [`remaining_capacity`](Self::remaining_capacity) bytes at a time) and
/// pushes each chunk here. Complete frame payloads come back in arrival
/// order.
#[derive(Debug)]
pub struct FrameAssembler {
    buf: [u8; RECV_BUFFER_SIZE],
    cursor: usize,
    /// Payload length of the frame being assembled, known once the 2-byte
    /// prefix has arrived.
    expected: Option<usize>,
}

impl FrameAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self { buf: [0; RECV_BUFFER_SIZE], cursor: 0, expected: None }
    }

    /// Free space left in the receive buffer.
    ///
    /// The caller must size its socket reads to this: pushing a larger
    /// chunk is a [`ProtocolError::BufferOverflow`].
    pub fn remaining_capacity(&self) -> usize {
        RECV_BUFFER_SIZE - self.cursor
    }

    /// Number of buffered bytes not yet assembled into a frame.
    pub fn buffered(&self) -> usize {
        self.cursor
    }

    /// Append a chunk and drain every frame it completes.
    ///
    /// Returns the payloads of all frames completed by this chunk (often
    /// none, while a frame is still accumulating).
    ///
    /// # Errors
    ///
    /// [`ProtocolError::BufferOverflow`] if the chunk exceeds the free
    /// space, [`ProtocolError::FrameTooLarge`] if a prefix declares a
    /// payload that could never fit the buffer. Both are fatal to the
    /// connection: the assembler is left in an unspecified state and the
    /// caller must disconnect the peer.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>, ProtocolError> {
        if chunk.len() > self.remaining_capacity() {
            return Err(ProtocolError::BufferOverflow {
                pushed: chunk.len(),
                free: self.remaining_capacity(),
            });
        }

        self.buf[self.cursor..self.cursor + chunk.len()].copy_from_slice(chunk);
        self.cursor += chunk.len();

        let mut frames = Vec::new();
        loop {
            if self.cursor < LENGTH_PREFIX_SIZE {
                // Not all bytes of the length prefix have arrived yet.
                break;
            }

            let expected = match self.expected {
                Some(len) => len,
                None => {
                    let len = usize::from(u16::from_le_bytes([self.buf[0], self.buf[1]]));
                    if LENGTH_PREFIX_SIZE + len > RECV_BUFFER_SIZE {
                        return Err(ProtocolError::FrameTooLarge {
                            declared: len,
                            capacity: RECV_BUFFER_SIZE,
                        });
                    }
                    self.expected = Some(len);
                    len
                },
            };

            let frame_end = LENGTH_PREFIX_SIZE + expected;
            if self.cursor < frame_end {
                // Wait for the rest of the payload.
                break;
            }

            frames.push(Bytes::copy_from_slice(&self.buf[LENGTH_PREFIX_SIZE..frame_end]));

            // Shift bytes belonging to the next frame to the front.
            self.buf.copy_within(frame_end..self.cursor, 0);
            self.cursor -= frame_end;
            self.expected = None;
        }

        Ok(frames)
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap a payload in the inbound length-prefixed framing.
///
/// The writer-side counterpart of [`FrameAssembler`], used by clients and
/// tests.
///
/// # Errors
///
/// [`ProtocolError::PayloadTooLarge`] if the payload length does not fit
/// the u16 prefix.
pub fn encode_inbound_frame(payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let len =
        u16::try_from(payload.len()).map_err(|_| ProtocolError::PayloadTooLarge(payload.len()))?;

    let mut out = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}
