//! Cryptographic primitives for the pushframe notification relay.
//!
//! One symmetric secret per application does double duty: its key
//! authenticates client handshakes (HMAC-SHA256 over the registration
//! record) and encrypts every message delivered to that application's
//! clients (AES-256-CBC with PKCS7 padding). Key and IV are generated
//! together, serialized together as a base64 blob, and never handled
//! independently of each other.
//!
//! # Security
//!
//! Tag verification is constant-time and refuses tags of the wrong
//! length. The CBC IV is fixed per application, a deliberate wire
//! compatibility constraint, since deployed client key blobs carry
//! exactly one IV.

#![forbid(unsafe_code)]

pub mod cipher;
pub mod error;
pub mod keys;
pub mod mac;

pub use cipher::{BLOCK_SIZE, decrypt, encrypt};
pub use error::CryptoError;
pub use keys::{IV_SIZE, KEY_SIZE, KeyMaterial};
pub use mac::{TAG_SIZE, sign, verify};
