//! Handshake registration records.
//!
//! The payload of the one inbound frame a client ever sends:
//!
//! ```text
//! [2 bytes: tag length (LE u16)]
//! [tag-length bytes: HMAC-SHA256 tag]
//! [null-terminated UTF-8: application id]
//! [null-terminated UTF-8: information base id]
//! [null-terminated UTF-8: user id]
//! [null-terminated UTF-8: user group]
//! ```
//!
//! The tag covers the entire remainder of the payload after itself: the
//! four serialized strings. Parsing here is purely structural; tag
//! verification needs the application's key and happens in the connection
//! state machine, after the claimed application id has been looked up.

use bytes::Bytes;

use crate::errors::ProtocolError;

/// Identity fields carried by a registration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRecord {
    /// Application the client claims to belong to.
    pub app_id: String,
    /// Information base the client is attached to.
    pub infobase_id: String,
    /// User identifier inside the information base.
    pub user_id: String,
    /// User group inside the information base.
    pub user_group: String,
}

/// A structurally parsed registration frame: the authentication tag, the
/// signed region it must verify against, and the decoded record.
#[derive(Debug, Clone)]
pub struct RegistrationFrame {
    /// HMAC-SHA256 tag supplied by the client.
    pub tag: Bytes,
    /// Byte region the tag is computed over (the serialized strings,
    /// exactly as they appeared on the wire).
    pub signed: Bytes,
    /// Decoded identity fields.
    pub record: RegistrationRecord,
}

impl RegistrationFrame {
    /// Parse a registration frame payload.
    ///
    /// The tag length must be nonzero and fit inside the payload. A
    /// missing terminator or invalid UTF-8 in any field fails the parse.
    /// Bytes after the fourth string are tolerated.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::MalformedRegistration`] describing the first
    /// structural defect encountered.
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < 2 {
            return Err(ProtocolError::MalformedRegistration("missing tag length prefix"));
        }

        let tag_len = usize::from(u16::from_le_bytes([payload[0], payload[1]]));
        if tag_len == 0 {
            return Err(ProtocolError::MalformedRegistration("zero-length tag"));
        }
        if 2 + tag_len > payload.len() {
            return Err(ProtocolError::MalformedRegistration("tag length exceeds payload"));
        }

        let tag = Bytes::copy_from_slice(&payload[2..2 + tag_len]);
        let signed = Bytes::copy_from_slice(&payload[2 + tag_len..]);

        let mut rest: &[u8] = &signed;
        let app_id = read_cstr(&mut rest)?;
        let infobase_id = read_cstr(&mut rest)?;
        let user_id = read_cstr(&mut rest)?;
        let user_group = read_cstr(&mut rest)?;

        Ok(Self {
            tag,
            signed,
            record: RegistrationRecord { app_id, infobase_id, user_id, user_group },
        })
    }
}

impl RegistrationRecord {
    /// Serialize the identity strings as the signed region of a
    /// registration frame: each null-terminated, in wire order. This is
    /// the exact byte sequence an HMAC tag must be computed over.
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.app_id.len()
                + self.infobase_id.len()
                + self.user_id.len()
                + self.user_group.len()
                + 4,
        );
        for field in [&self.app_id, &self.infobase_id, &self.user_id, &self.user_group] {
            out.extend_from_slice(field.as_bytes());
            out.push(0);
        }
        out
    }

    /// Encode a complete registration frame payload with the given tag.
    ///
    /// Counterpart of [`RegistrationFrame::parse`], used by clients and
    /// tests. The result still needs the outer inbound framing (see
    /// [`encode_inbound_frame`](crate::encode_inbound_frame)).
    ///
    /// # Errors
    ///
    /// [`ProtocolError::MalformedRegistration`] if the tag is empty or
    /// longer than the u16 length field can carry.
    pub fn encode(&self, tag: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        if tag.is_empty() {
            return Err(ProtocolError::MalformedRegistration("zero-length tag"));
        }
        let tag_len = u16::try_from(tag.len())
            .map_err(|_| ProtocolError::MalformedRegistration("tag length exceeds u16"))?;

        let signed = self.signed_bytes();
        let mut out = Vec::with_capacity(2 + tag.len() + signed.len());
        out.extend_from_slice(&tag_len.to_le_bytes());
        out.extend_from_slice(tag);
        out.extend_from_slice(&signed);
        Ok(out)
    }
}

/// Read a null-terminated UTF-8 string from the front of `input`,
/// advancing it past the terminator.
fn read_cstr(input: &mut &[u8]) -> Result<String, ProtocolError> {
    let pos = input
        .iter()
        .position(|&b| b == 0)
        .ok_or(ProtocolError::MalformedRegistration("missing string terminator"))?;

    let s = std::str::from_utf8(&input[..pos])
        .map_err(|_| ProtocolError::MalformedRegistration("field is not valid UTF-8"))?
        .to_owned();

    *input = &input[pos + 1..];
    Ok(s)
}
