//! Handshake authentication tags.
//!
//! A client proves it belongs to the application it claims by tagging its
//! registration record with HMAC-SHA256 under the application's key. The
//! server recomputes the tag over the signed region and compares in
//! constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Size of an HMAC-SHA256 tag in bytes.
pub const TAG_SIZE: usize = 32;

/// Compute the HMAC-SHA256 tag of `data` under `key`.
pub fn sign(key: &[u8], data: &[u8]) -> [u8; TAG_SIZE] {
    let mut mac = HmacSha256::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts keys of any length"));
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Verify a handshake tag in constant time.
///
/// A tag of the wrong length fails verification like any other mismatch;
/// the peer learns nothing beyond "rejected".
///
/// # Errors
///
/// [`CryptoError::TagMismatch`] when the tag does not verify.
pub fn verify(key: &[u8], data: &[u8], tag: &[u8]) -> Result<(), CryptoError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts keys of any length"));
    mac.update(data);
    mac.verify_slice(tag).map_err(|_| CryptoError::TagMismatch)
}
