//! Flat-file persistence for the application registry.
//!
//! Record format, one field per line:
//!
//! ```text
//! #<title>
//! <id>
//! <server key>
//! <client key blob, base64>
//! <token>:<expiry unix seconds>     (optional)
//! ```
//!
//! Blank lines are skipped. A `#` line both terminates the previous
//! record and supplies the next one's title. Records missing required
//! fields are logged and skipped without failing the load; a file whose
//! structure cannot be followed at all fails the load.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use pushframe_crypto::KeyMaterial;
use tracing::warn;

use crate::{app::Application, error::DirectoryError, token::AccessToken};

/// In-memory application set backed by a registry file.
///
/// Every mutation rewrites the whole file; the registry is small and the
/// write path is rare (admin operations and token rotation).
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    apps: BTreeMap<String, Application>,
}

impl FileStore {
    /// Open a registry file, creating an empty one if it is missing.
    ///
    /// # Errors
    ///
    /// I/O failures, or [`DirectoryError::MalformedFile`] when the file
    /// structure cannot be followed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            fs::File::create(&path)?;
        }

        let contents = fs::read_to_string(&path)?;
        let apps = parse(&contents)?;
        Ok(Self { path, apps })
    }

    /// Number of loaded applications.
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Whether the registry holds no applications.
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Application by id.
    pub fn get(&self, app_id: &str) -> Option<&Application> {
        self.apps.get(app_id)
    }

    /// All applications, in stable id order.
    pub fn apps(&self) -> impl Iterator<Item = &Application> {
        self.apps.values()
    }

    /// Application holding this producer server key.
    pub fn find_by_server_key(&self, server_key: &str) -> Option<&Application> {
        self.apps.values().find(|app| app.server_key == server_key)
    }

    /// Application holding this access token (live or expired).
    pub fn find_by_token(&self, token: &str) -> Option<&Application> {
        self.apps
            .values()
            .find(|app| app.access_token.as_ref().is_some_and(|t| t.token == token))
    }

    /// Create an application with fresh credentials and persist it.
    pub fn create_app(&mut self, title: &str) -> Result<Application, DirectoryError> {
        let app = Application::create(title);
        self.apps.insert(app.id.clone(), app.clone());
        self.persist()?;
        Ok(app)
    }

    /// Delete an application and persist the change.
    pub fn delete_app(&mut self, app_id: &str) -> Result<(), DirectoryError> {
        if self.apps.remove(app_id).is_none() {
            return Err(DirectoryError::UnknownApplication(app_id.to_owned()));
        }
        self.persist()
    }

    /// Replace an existing application and persist the change.
    pub fn save_app(&mut self, app: Application) -> Result<(), DirectoryError> {
        if !self.apps.contains_key(&app.id) {
            return Err(DirectoryError::UnknownApplication(app.id));
        }
        self.apps.insert(app.id.clone(), app);
        self.persist()
    }

    fn persist(&self) -> Result<(), DirectoryError> {
        let mut out = String::new();
        for app in self.apps.values() {
            out.push('#');
            out.push_str(&app.title);
            out.push('\n');
            out.push_str(&app.id);
            out.push('\n');
            out.push_str(&app.server_key);
            out.push('\n');
            out.push_str(&app.keys.to_base64());
            out.push('\n');
            if let Some(token) = &app.access_token {
                out.push_str(&token.token);
                out.push(':');
                out.push_str(&token.expires_at.to_string());
                out.push('\n');
            }
        }

        fs::write(&self.path, out)?;
        Ok(())
    }
}

enum Expect {
    Title,
    Id,
    ServerKey,
    ClientKey,
    Token,
}

struct Partial {
    title: String,
    id: Option<String>,
    server_key: Option<String>,
    keys: Option<KeyMaterial>,
    token: Option<AccessToken>,
}

impl Partial {
    fn new(title: &str) -> Self {
        Self { title: title.to_owned(), id: None, server_key: None, keys: None, token: None }
    }

    /// Validate and insert the record, logging and skipping anything
    /// unusable rather than failing the whole load.
    fn commit(self, apps: &mut BTreeMap<String, Application>) {
        let title = self.title;

        let Some(id) = self.id.filter(|v| !v.is_empty()) else {
            warn!(%title, "application skipped: missing id");
            return;
        };
        let Some(server_key) = self.server_key.filter(|v| !v.is_empty()) else {
            warn!(%title, "application skipped: missing server key");
            return;
        };
        let Some(keys) = self.keys else {
            warn!(%title, "application skipped: missing client key material");
            return;
        };

        if let Some(existing) = apps.get(&id) {
            warn!(%title, %id, existing = %existing.title, "application skipped: duplicate id");
            return;
        }

        apps.insert(
            id.clone(),
            Application { id, title, server_key, keys, access_token: self.token },
        );
    }
}

fn parse(contents: &str) -> Result<BTreeMap<String, Application>, DirectoryError> {
    let mut apps = BTreeMap::new();
    let mut expect = Expect::Title;
    let mut partial: Option<Partial> = None;

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(title) = line.strip_prefix('#') {
            if !matches!(expect, Expect::Title | Expect::Token) {
                return Err(DirectoryError::MalformedFile(
                    "record starts before the previous one is complete",
                ));
            }
            if let Some(done) = partial.take() {
                done.commit(&mut apps);
            }
            partial = Some(Partial::new(title.trim()));
            expect = Expect::Id;
            continue;
        }

        match expect {
            Expect::Title => {
                return Err(DirectoryError::MalformedFile("field line outside of a record"));
            },
            Expect::Id => {
                if let Some(p) = partial.as_mut() {
                    p.id = Some(line.to_owned());
                }
                expect = Expect::ServerKey;
            },
            Expect::ServerKey => {
                if let Some(p) = partial.as_mut() {
                    p.server_key = Some(line.to_owned());
                }
                expect = Expect::ClientKey;
            },
            Expect::ClientKey => {
                let keys = KeyMaterial::from_base64(line)
                    .map_err(|_| DirectoryError::MalformedFile("bad client key blob"))?;
                if let Some(p) = partial.as_mut() {
                    p.keys = Some(keys);
                }
                expect = Expect::Token;
            },
            Expect::Token => {
                if let Some(p) = partial.as_mut() {
                    p.token = parse_token_line(&p.title, line);
                }
                expect = Expect::Title;
            },
        }
    }

    if let Some(done) = partial.take() {
        done.commit(&mut apps);
    }
    Ok(apps)
}

/// Parse a `<token>:<expiry>` line. A malformed line resets the token
/// rather than failing the record.
fn parse_token_line(title: &str, line: &str) -> Option<AccessToken> {
    let Some((token, expiry)) = line.rsplit_once(':') else {
        warn!(%title, "bad access token format, token reset");
        return None;
    };

    match expiry.parse::<u64>() {
        Ok(expires_at) => Some(AccessToken::from_parts(token.to_owned(), expires_at)),
        Err(_) => {
            warn!(%title, "bad access token expiry, token reset");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_file() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys");
        (dir, path)
    }

    #[test]
    fn missing_file_is_created_empty() {
        let (_dir, path) = registry_file();
        let store = FileStore::open(&path).unwrap();

        assert!(store.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn create_and_reload_round_trip() {
        let (_dir, path) = registry_file();

        let mut store = FileStore::open(&path).unwrap();
        let mut app = store.create_app("Warehouse").unwrap();
        let token = app.issue_token();
        store.save_app(app.clone()).unwrap();

        let reloaded = FileStore::open(&path).unwrap();
        assert_eq!(reloaded.len(), 1);

        let restored = reloaded.get(&app.id).unwrap();
        assert_eq!(restored.title, "Warehouse");
        assert_eq!(restored.server_key, app.server_key);
        assert_eq!(restored.keys, app.keys);
        assert_eq!(restored.access_token.as_ref().unwrap().token, token.token);
        assert_eq!(restored.access_token.as_ref().unwrap().expires_at, token.expires_at);
    }

    #[test]
    fn tokenless_records_reload() {
        let (_dir, path) = registry_file();

        let mut store = FileStore::open(&path).unwrap();
        let a = store.create_app("First").unwrap();
        let b = store.create_app("Second").unwrap();

        let reloaded = FileStore::open(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.get(&a.id).unwrap().access_token.is_none());
        assert!(reloaded.get(&b.id).unwrap().access_token.is_none());
    }

    #[test]
    fn record_missing_required_fields_is_skipped() {
        let (_dir, path) = registry_file();
        // Trailing record has a title and nothing else.
        let keys = KeyMaterial::generate().to_base64();
        fs::write(&path, format!("#Good\napp-1\nserverkey\n{keys}\n#Broken\n")).unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("app-1").is_some());
    }

    #[test]
    fn duplicate_id_keeps_the_first_record() {
        let (_dir, path) = registry_file();
        let keys = KeyMaterial::generate().to_base64();
        fs::write(
            &path,
            format!("#First\napp-1\nkey-a\n{keys}\n#Second\napp-1\nkey-b\n{keys}\n"),
        )
        .unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("app-1").unwrap().title, "First");
    }

    #[test]
    fn bad_token_line_resets_the_token() {
        let (_dir, path) = registry_file();
        let keys = KeyMaterial::generate().to_base64();
        fs::write(&path, format!("#App\napp-1\nserverkey\n{keys}\nnot-a-token-line\n")).unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(store.get("app-1").unwrap().access_token.is_none());
    }

    #[test]
    fn field_line_outside_a_record_fails_the_load() {
        let (_dir, path) = registry_file();
        fs::write(&path, "stray line\n").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(DirectoryError::MalformedFile(_))
        ));
    }

    #[test]
    fn early_record_start_fails_the_load() {
        let (_dir, path) = registry_file();
        fs::write(&path, "#First\napp-1\n#Second\n").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(DirectoryError::MalformedFile(_))
        ));
    }

    #[test]
    fn bad_key_blob_fails_the_load() {
        let (_dir, path) = registry_file();
        fs::write(&path, "#App\napp-1\nserverkey\nnot!base64\n").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(DirectoryError::MalformedFile("bad client key blob"))
        ));
    }

    #[test]
    fn delete_and_save_require_existing_apps() {
        let (_dir, path) = registry_file();
        let mut store = FileStore::open(&path).unwrap();

        assert!(matches!(
            store.delete_app("ghost"),
            Err(DirectoryError::UnknownApplication(_))
        ));
        assert!(matches!(
            store.save_app(Application::create("Ghost")),
            Err(DirectoryError::UnknownApplication(_))
        ));

        let app = store.create_app("Real").unwrap();
        store.delete_app(&app.id).unwrap();
        assert!(store.is_empty());
        assert!(FileStore::open(&path).unwrap().is_empty());
    }

    #[test]
    fn credential_lookups() {
        let (_dir, path) = registry_file();
        let mut store = FileStore::open(&path).unwrap();

        let mut app = store.create_app("App").unwrap();
        let token = app.issue_token();
        store.save_app(app.clone()).unwrap();

        assert_eq!(store.find_by_server_key(&app.server_key).unwrap().id, app.id);
        assert!(store.find_by_server_key("wrong").is_none());
        assert_eq!(store.find_by_token(&token.token).unwrap().id, app.id);
        assert!(store.find_by_token("wrong").is_none());
    }
}
