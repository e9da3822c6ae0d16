//! Shared, thread-safe access to the application registry.

use std::{
    path::Path,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use pushframe_core::ApplicationDirectory;
use pushframe_crypto::KeyMaterial;

use crate::{app::Application, error::DirectoryError, store::FileStore, token::AccessToken};

/// Outcome of resolving a producer bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    /// Token belongs to an application and has not expired.
    Valid {
        /// Id of the application the token was issued to.
        app_id: String,
    },
    /// Token belongs to an application but has expired.
    Expired,
    /// No application holds this token.
    Unknown,
}

/// Thread-safe handle to a [`FileStore`], shared between the event loop,
/// the dispatch workers, the HTTP layer, and the admin CLI.
///
/// This is the single ownership boundary for application state: every
/// reader and writer goes through the one lock, which is never held
/// across an await point.
#[derive(Clone)]
pub struct SharedDirectory {
    inner: Arc<RwLock<FileStore>>,
}

impl SharedDirectory {
    /// Open the registry file (see [`FileStore::open`]).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        Ok(Self { inner: Arc::new(RwLock::new(FileStore::open(path)?)) })
    }

    fn read(&self) -> RwLockReadGuard<'_, FileStore> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FileStore> {
        self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Create an application with fresh credentials.
    pub fn create_app(&self, title: &str) -> Result<Application, DirectoryError> {
        self.write().create_app(title)
    }

    /// Delete an application.
    pub fn delete_app(&self, app_id: &str) -> Result<(), DirectoryError> {
        self.write().delete_app(app_id)
    }

    /// Snapshot of all applications.
    pub fn list(&self) -> Vec<Application> {
        self.read().apps().cloned().collect()
    }

    /// Rotate an application's server key, returning the new key.
    pub fn rotate_server_key(&self, app_id: &str) -> Result<String, DirectoryError> {
        let mut store = self.write();
        let mut app = store
            .get(app_id)
            .cloned()
            .ok_or_else(|| DirectoryError::UnknownApplication(app_id.to_owned()))?;

        app.rotate_server_key();
        let server_key = app.server_key.clone();
        store.save_app(app)?;
        Ok(server_key)
    }

    /// Rotate an application's client key material, returning the new
    /// base64 key blob for distribution to clients.
    pub fn rotate_client_key(&self, app_id: &str) -> Result<String, DirectoryError> {
        let mut store = self.write();
        let mut app = store
            .get(app_id)
            .cloned()
            .ok_or_else(|| DirectoryError::UnknownApplication(app_id.to_owned()))?;

        app.rotate_client_key();
        let blob = app.keys.to_base64();
        store.save_app(app)?;
        Ok(blob)
    }

    /// Exchange a producer server key for a fresh access token.
    ///
    /// Returns `Ok(None)` when no application holds the key. The token
    /// replaces any outstanding one and is persisted before it is
    /// returned, so a token the producer holds is always on disk.
    pub fn issue_token(&self, server_key: &str) -> Result<Option<AccessToken>, DirectoryError> {
        let mut store = self.write();
        let Some(mut app) = store.find_by_server_key(server_key).cloned() else {
            return Ok(None);
        };

        let token = app.issue_token();
        store.save_app(app)?;
        Ok(Some(token))
    }

    /// Resolve a producer bearer token.
    pub fn resolve_token(&self, token: &str) -> TokenStatus {
        let store = self.read();
        match store.find_by_token(token) {
            None => TokenStatus::Unknown,
            Some(app) => {
                let live = app.access_token.as_ref().is_some_and(AccessToken::is_live);
                if live {
                    TokenStatus::Valid { app_id: app.id.clone() }
                } else {
                    TokenStatus::Expired
                }
            },
        }
    }
}

impl ApplicationDirectory for SharedDirectory {
    fn key_material(&self, app_id: &str) -> Option<KeyMaterial> {
        self.read().get(app_id).map(|app| app.keys.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_shared() -> (tempfile::TempDir, SharedDirectory) {
        let dir = tempfile::tempdir().unwrap();
        let shared = SharedDirectory::open(dir.path().join("keys")).unwrap();
        (dir, shared)
    }

    #[test]
    fn key_material_lookup_through_the_trait() {
        let (_dir, shared) = open_shared();
        let app = shared.create_app("App").unwrap();

        let keys = shared.key_material(&app.id).unwrap();
        assert_eq!(keys, app.keys);
        assert!(shared.key_material("ghost").is_none());
    }

    #[test]
    fn token_issue_and_resolution() {
        let (_dir, shared) = open_shared();
        let app = shared.create_app("App").unwrap();

        assert!(shared.issue_token("wrong key").unwrap().is_none());

        let token = shared.issue_token(&app.server_key).unwrap().unwrap();
        assert_eq!(
            shared.resolve_token(&token.token),
            TokenStatus::Valid { app_id: app.id.clone() }
        );
        assert_eq!(shared.resolve_token("unknown"), TokenStatus::Unknown);

        // Rotating the server key invalidates the outstanding token.
        shared.rotate_server_key(&app.id).unwrap();
        assert_eq!(shared.resolve_token(&token.token), TokenStatus::Unknown);
    }

    #[test]
    fn rotations_persist() {
        let (dir, shared) = open_shared();
        let app = shared.create_app("App").unwrap();

        let new_server_key = shared.rotate_server_key(&app.id).unwrap();
        let new_blob = shared.rotate_client_key(&app.id).unwrap();
        assert_ne!(new_server_key, app.server_key);
        assert_ne!(new_blob, app.keys.to_base64());

        let reopened = SharedDirectory::open(dir.path().join("keys")).unwrap();
        assert_eq!(reopened.list()[0].server_key, new_server_key);
        assert_eq!(reopened.list()[0].keys.to_base64(), new_blob);
    }
}
