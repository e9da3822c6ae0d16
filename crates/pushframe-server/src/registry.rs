//! The connection registry.
//!
//! Owns the set of live connections. Two schedules touch it, the event
//! loop (add, assign identity, remove) and the submission path
//! (recipient resolution), so every access goes through the one
//! internal lock. The lock is synchronous and never held across an
//! await point; socket writes happen outside it, against the per-
//! connection write handles a snapshot carries.

use std::{
    collections::HashMap,
    fmt,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use pushframe_core::{Audience, ClientIdentity};
use tokio::{net::tcp::OwnedWriteHalf, task::AbortHandle};

/// Identifier of one live connection, unique for the lifetime of the
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A recipient captured in a dispatch snapshot: enough to write the
/// frame and to tear the connection down if the write fails.
#[derive(Clone)]
pub struct Recipient {
    /// Registry id, for removal on write failure.
    pub id: ConnId,
    /// User the connection is registered to, for logging.
    pub user_id: String,
    /// Write half of the socket, serialized per connection so two
    /// workers cannot interleave frames to the same client.
    pub writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
}

struct Entry {
    addr: SocketAddr,
    identity: Option<ClientIdentity>,
    writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
    reader: Option<AbortHandle>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    entries: HashMap<u64, Entry>,
}

/// The set of live connections and the single exclusion boundary around
/// it.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: Mutex<Inner>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Register a freshly accepted connection and return its id.
    pub fn insert(&self, addr: SocketAddr, writer: OwnedWriteHalf) -> ConnId {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.insert(
            id,
            Entry {
                addr,
                identity: None,
                writer: Arc::new(tokio::sync::Mutex::new(writer)),
                reader: None,
            },
        );
        ConnId(id)
    }

    /// Attach the reader task's abort handle, so removal can cancel it.
    pub fn attach_reader(&self, id: ConnId, reader: AbortHandle) {
        if let Some(entry) = self.lock().entries.get_mut(&id.0) {
            entry.reader = Some(reader);
        }
    }

    /// Bind an identity to a connection after a verified handshake. A
    /// repeated handshake re-assigns. Returns false if the connection is
    /// already gone.
    pub fn assign_identity(&self, id: ConnId, identity: ClientIdentity) -> bool {
        match self.lock().entries.get_mut(&id.0) {
            Some(entry) => {
                entry.identity = Some(identity);
                true
            },
            None => false,
        }
    }

    /// Snapshot every registered connection matching the audience.
    ///
    /// Connections that have not completed a handshake are never
    /// matched. The snapshot is fixed at this moment; recipients that
    /// disconnect afterwards are discovered by the write failing, not by
    /// re-resolution.
    pub fn resolve(&self, audience: &Audience) -> Vec<Recipient> {
        let inner = self.lock();
        inner
            .entries
            .iter()
            .filter_map(|(id, entry)| {
                let identity = entry.identity.as_ref()?;
                audience.matches(identity).then(|| Recipient {
                    id: ConnId(*id),
                    user_id: identity.user_id.clone(),
                    writer: Arc::clone(&entry.writer),
                })
            })
            .collect()
    }

    /// Remove a connection, aborting its reader task. Idempotent: the
    /// event loop and a dispatch worker may race to remove the same
    /// connection, and exactly one of them wins.
    ///
    /// Returns whether this call actually removed the entry.
    pub fn remove(&self, id: ConnId) -> bool {
        let entry = self.lock().entries.remove(&id.0);
        match entry {
            Some(entry) => {
                if let Some(reader) = entry.reader {
                    reader.abort();
                }
                tracing::debug!(conn = %id, addr = %entry.addr, "connection removed");
                true
            },
            None => false,
        }
    }

    /// Remove every connection (shutdown path). Returns how many were
    /// closed.
    pub fn drain(&self) -> usize {
        let entries = {
            let mut inner = self.lock();
            std::mem::take(&mut inner.entries)
        };

        let count = entries.len();
        for entry in entries.into_values() {
            if let Some(reader) = entry.reader {
                reader.abort();
            }
        }
        count
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Number of connections that have completed a handshake.
    pub fn registered_count(&self) -> usize {
        self.lock().entries.values().filter(|entry| entry.identity.is_some()).count()
    }

    /// Whether the registry holds no connections.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Identity currently bound to a connection, if any.
    pub fn identity(&self, id: ConnId) -> Option<ClientIdentity> {
        self.lock().entries.get(&id.0).and_then(|entry| entry.identity.clone())
    }
}
