//! Producer credentials: access tokens and the shared key alphabet.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Alphabet server keys and access tokens are drawn from.
const KEY_CHARS: &[u8] = b"0123456789abcdefghjiklmnopqrstuvwxyzABCDEFGHJIKLMNOPQRSTUVWXYZ";

/// Access token lifetime in seconds.
pub const TOKEN_TTL_SECS: u64 = 60 * 60;

/// Generate a random credential string of `len` characters.
pub fn generate_key(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| char::from(KEY_CHARS[rng.gen_range(0..KEY_CHARS.len())])).collect()
}

/// Seconds since the unix epoch.
fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

/// A bearer token issued to a producer by the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Opaque 64-character token value.
    pub token: String,
    /// Expiry, unix seconds.
    pub expires_at: u64,
}

impl AccessToken {
    /// Issue a fresh token valid for [`TOKEN_TTL_SECS`].
    pub fn issue() -> Self {
        Self { token: generate_key(64), expires_at: now_unix() + TOKEN_TTL_SECS }
    }

    /// Rebuild a token loaded from the registry file.
    pub fn from_parts(token: String, expires_at: u64) -> Self {
        Self { token, expires_at }
    }

    /// Whether the token is still valid.
    pub fn is_live(&self) -> bool {
        now_unix() <= self.expires_at
    }

    /// Seconds until expiry, zero if already expired.
    pub fn expires_in(&self) -> u64 {
        self.expires_at.saturating_sub(now_unix())
    }
}
