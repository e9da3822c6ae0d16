//! Crypto error types.

use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A handshake tag did not verify under the application's key.
    #[error("authentication tag mismatch")]
    TagMismatch,

    /// Ciphertext failed to decrypt (truncated input or bad padding).
    #[error("message decryption failed")]
    DecryptFailed,

    /// A key blob was not valid base64 or had the wrong shape.
    #[error("invalid key material blob")]
    InvalidKeyBlob,
}
