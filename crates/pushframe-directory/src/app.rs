//! Client applications.

use pushframe_crypto::KeyMaterial;
use uuid::Uuid;

use crate::token::{AccessToken, generate_key};

/// Length of a producer server key.
pub const SERVER_KEY_LEN: usize = 64;

/// One registered client application.
#[derive(Debug, Clone)]
pub struct Application {
    /// Opaque identifier, generated at creation.
    pub id: String,
    /// Human-readable name, admin-facing only.
    pub title: String,
    /// Credential producers exchange for an access token.
    pub server_key: String,
    /// Symmetric key material shared with this application's clients.
    pub keys: KeyMaterial,
    /// Currently issued access token, if any.
    pub access_token: Option<AccessToken>,
}

impl Application {
    /// Create a new application with fresh credentials.
    pub fn create(title: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_owned(),
            server_key: generate_key(SERVER_KEY_LEN),
            keys: KeyMaterial::generate(),
            access_token: None,
        }
    }

    /// Rotate the server key. Outstanding access tokens die with the
    /// old key.
    pub fn rotate_server_key(&mut self) {
        self.server_key = generate_key(SERVER_KEY_LEN);
        self.access_token = None;
    }

    /// Rotate the client key material: key and IV together, never one
    /// without the other.
    pub fn rotate_client_key(&mut self) {
        self.keys = KeyMaterial::generate();
    }

    /// Issue a fresh access token, replacing any outstanding one.
    pub fn issue_token(&mut self) -> AccessToken {
        let token = AccessToken::issue();
        self.access_token = Some(token.clone());
        token
    }
}
