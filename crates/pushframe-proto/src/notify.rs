//! Outbound message frames.
//!
//! Every delivered notification is one frame:
//!
//! ```text
//! [u32 LE total length]      total = ciphertext length + 4
//! [u32 LE plaintext length]  length of the serialized message before
//!                            encryption, so the receiver can validate
//!                            the decrypted size
//! [ciphertext]
//! ```

use bytes::Bytes;

use crate::errors::ProtocolError;

/// Combined size of the two u32 header fields.
pub const MESSAGE_HEADER_SIZE: usize = 8;

/// A decoded outbound message frame (receiver side).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFrame {
    /// Length of the serialized message before encryption.
    pub plaintext_len: usize,
    /// The encrypted message bytes.
    pub ciphertext: Bytes,
}

/// Encode an encrypted message for the wire.
pub fn encode_message_frame(plaintext_len: usize, ciphertext: &[u8]) -> Vec<u8> {
    let total = (ciphertext.len() + 4) as u32;

    let mut out = Vec::with_capacity(MESSAGE_HEADER_SIZE + ciphertext.len());
    out.extend_from_slice(&total.to_le_bytes());
    out.extend_from_slice(&(plaintext_len as u32).to_le_bytes());
    out.extend_from_slice(ciphertext);
    out
}

/// Decode one message frame from the front of `input`.
///
/// Returns the frame and the number of bytes consumed, or `Ok(None)` when
/// `input` does not yet hold a complete frame. Used by clients and tests;
/// the server only encodes.
///
/// # Errors
///
/// [`ProtocolError::MalformedMessageFrame`] if the total-length field is
/// smaller than the plaintext-length field it must cover.
pub fn decode_message_frame(input: &[u8]) -> Result<Option<(MessageFrame, usize)>, ProtocolError> {
    if input.len() < 4 {
        return Ok(None);
    }

    let total = u32::from_le_bytes([input[0], input[1], input[2], input[3]]) as usize;
    if total < 4 {
        return Err(ProtocolError::MalformedMessageFrame("total length shorter than header"));
    }
    if input.len() < 4 + total {
        return Ok(None);
    }

    let plaintext_len = u32::from_le_bytes([input[4], input[5], input[6], input[7]]) as usize;
    let ciphertext = Bytes::copy_from_slice(&input[MESSAGE_HEADER_SIZE..4 + total]);

    Ok(Some((MessageFrame { plaintext_len, ciphertext }, 4 + total)))
}
