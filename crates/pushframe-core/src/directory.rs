//! Application directory contract.

use pushframe_crypto::KeyMaterial;

/// Read-only lookup of application key material.
///
/// Consumed in two places: handshake verification (the key as an HMAC
/// key) and message dispatch (key and IV for encryption). Key and IV are
/// returned together, never separately; they only exist as a pair.
///
/// Implementations are shared between the event loop and the dispatch
/// workers, so lookups must be cheap and must not block.
pub trait ApplicationDirectory: Send + Sync {
    /// Key material of the application with this id, or `None` if the
    /// application is unknown (or has been deleted since the caller
    /// learned the id; callers treat both identically).
    fn key_material(&self, app_id: &str) -> Option<KeyMaterial>;
}
