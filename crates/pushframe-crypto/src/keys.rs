//! Application key material.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;

use crate::error::CryptoError;

/// AES key size in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// CBC initialization vector size in bytes (one AES block).
pub const IV_SIZE: usize = 16;

/// Symmetric key material of one application: an AES-256 key and the CBC
/// initialization vector it is used with.
///
/// Invariant: the two are generated together and serialized together;
/// neither is stored or handed out without the other. The key doubles as
/// the HMAC key for handshake verification.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    /// AES-256 key, also used as the handshake HMAC key.
    pub key: [u8; KEY_SIZE],
    /// CBC initialization vector, fixed per application.
    pub iv: [u8; IV_SIZE],
}

// Key bytes stay out of logs and panic messages.
impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial").finish_non_exhaustive()
    }
}

impl KeyMaterial {
    /// Generate fresh key material from the thread RNG.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        let mut iv = [0u8; IV_SIZE];

        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut iv);

        Self { key, iv }
    }

    /// Serialize as the base64 key blob handed to clients and written to
    /// the application registry:
    /// `[u32 LE key length][u32 LE iv length][key][iv]`.
    pub fn to_base64(&self) -> String {
        let mut blob = Vec::with_capacity(8 + KEY_SIZE + IV_SIZE);
        blob.extend_from_slice(&(KEY_SIZE as u32).to_le_bytes());
        blob.extend_from_slice(&(IV_SIZE as u32).to_le_bytes());
        blob.extend_from_slice(&self.key);
        blob.extend_from_slice(&self.iv);
        BASE64.encode(blob)
    }

    /// Parse a base64 key blob produced by [`to_base64`](Self::to_base64).
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidKeyBlob`] for bad base64, declared lengths
    /// other than AES-256-CBC's, or a blob whose size does not match its
    /// declared lengths.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let blob = BASE64.decode(encoded).map_err(|_| CryptoError::InvalidKeyBlob)?;
        if blob.len() < 8 {
            return Err(CryptoError::InvalidKeyBlob);
        }

        let key_len = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]) as usize;
        let iv_len = u32::from_le_bytes([blob[4], blob[5], blob[6], blob[7]]) as usize;
        if key_len != KEY_SIZE || iv_len != IV_SIZE || blob.len() != 8 + KEY_SIZE + IV_SIZE {
            return Err(CryptoError::InvalidKeyBlob);
        }

        let mut key = [0u8; KEY_SIZE];
        let mut iv = [0u8; IV_SIZE];
        key.copy_from_slice(&blob[8..8 + KEY_SIZE]);
        iv.copy_from_slice(&blob[8 + KEY_SIZE..]);

        Ok(Self { key, iv })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_distinct_material() {
        let a = KeyMaterial::generate();
        let b = KeyMaterial::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn base64_round_trip() {
        let keys = KeyMaterial::generate();
        let restored = KeyMaterial::from_base64(&keys.to_base64()).unwrap();
        assert_eq!(keys, restored);
    }

    #[test]
    fn blob_layout_is_stable() {
        let keys = KeyMaterial { key: [0x11; KEY_SIZE], iv: [0x22; IV_SIZE] };
        let blob = BASE64.decode(keys.to_base64()).unwrap();

        assert_eq!(&blob[0..4], &32u32.to_le_bytes());
        assert_eq!(&blob[4..8], &16u32.to_le_bytes());
        assert_eq!(&blob[8..40], &[0x11; 32]);
        assert_eq!(&blob[40..], &[0x22; 16]);
    }

    #[test]
    fn malformed_blobs_are_rejected() {
        assert!(KeyMaterial::from_base64("not base64 at all!").is_err());
        assert!(KeyMaterial::from_base64(&BASE64.encode([0u8; 4])).is_err());

        // Declares AES-128 lengths.
        let mut blob = Vec::new();
        blob.extend_from_slice(&16u32.to_le_bytes());
        blob.extend_from_slice(&16u32.to_le_bytes());
        blob.extend_from_slice(&[0u8; 32]);
        assert!(KeyMaterial::from_base64(&BASE64.encode(&blob)).is_err());

        // Correct lengths, truncated body.
        let mut blob = Vec::new();
        blob.extend_from_slice(&32u32.to_le_bytes());
        blob.extend_from_slice(&16u32.to_le_bytes());
        blob.extend_from_slice(&[0u8; 40]);
        assert!(KeyMaterial::from_base64(&BASE64.encode(&blob)).is_err());
    }

    #[test]
    fn debug_does_not_leak_key_bytes() {
        let keys = KeyMaterial { key: [0xAA; KEY_SIZE], iv: [0xBB; IV_SIZE] };
        let rendered = format!("{keys:?}");
        assert!(!rendered.contains("170"));
        assert!(!rendered.to_lowercase().contains("aa"));
    }
}
