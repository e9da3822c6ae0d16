//! Message encryption.
//!
//! AES-256-CBC with PKCS7 padding under each application's key material.
//! The IV comes from the application's key blob and is reused across all
//! messages to that application's clients.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};

use crate::{error::CryptoError, keys::KeyMaterial};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block size in bytes. Ciphertext length is always a multiple of
/// this, and always strictly greater than the plaintext length (PKCS7
/// pads a block-aligned plaintext with one full extra block).
pub const BLOCK_SIZE: usize = 16;

/// Encrypt a serialized message under an application's key material.
pub fn encrypt(keys: &KeyMaterial, plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes256CbcEnc::new(&keys.key.into(), &keys.iv.into());
    cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt a message produced by [`encrypt`] with the same key material.
///
/// # Errors
///
/// [`CryptoError::DecryptFailed`] for input that is not block-aligned or
/// does not unpad cleanly.
pub fn decrypt(keys: &KeyMaterial, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256CbcDec::new(&keys.key.into(), &keys.iv.into());
    cipher.decrypt_padded_vec_mut::<Pkcs7>(ciphertext).map_err(|_| CryptoError::DecryptFailed)
}
