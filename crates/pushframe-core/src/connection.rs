//! Per-connection framing and handshake state machine.
//!
//! # Architecture: Action-Based State Machine
//!
//! Pure logic, no I/O. The driver (the server's reader task) owns the
//! socket: it reads at most [`Connection::remaining_capacity`] bytes and
//! feeds the chunk to [`Connection::receive`], which returns declarative
//! actions for the driver to execute. Anything fatal to the connection
//! (framing violation, buffer overflow, malformed or unauthentic
//! handshake) surfaces as an error, and the driver closes the socket.
//! Nothing is ever sent back to the peer in response: the wire protocol
//! has no error-reply frame, so an unauthenticated peer learns nothing.
//!
//! # Lifecycle
//!
//! ```text
//! ┌───────────┐  verified registration   ┌────────────┐
//! │ Anonymous │─────────────────────────>│ Registered │──┐
//! └───────────┘                          └────────────┘  │ repeated
//!       │                                      ▲  │      │ handshake
//!       │ violation / EOF                      │  └──────┘ re-assigns
//!       ▼                                      │
//!   (closed by driver)                         └── violation / EOF also
//!                                                  closed by driver
//! ```
//!
//! A connection starts anonymous and belongs to no audience. A verified
//! registration binds an identity. A second successful handshake simply
//! re-assigns the identity: a policy choice, not enforced exclusivity.

use pushframe_crypto::verify;
use pushframe_proto::{FrameAssembler, RegistrationFrame};

use crate::{
    directory::ApplicationDirectory, error::ConnectionError, identity::ClientIdentity,
};

/// Actions returned by the connection state machine.
///
/// The driver executes these; protocol violations are not actions but
/// errors, because they all resolve the same way (close the connection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// A handshake completed: bind this identity to the connection in
    /// the registry so it participates in audience resolution.
    Registered(ClientIdentity),
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No handshake has succeeded; the connection belongs to no
    /// audience.
    Anonymous,
    /// A handshake bound an identity.
    Registered,
}

/// State machine for one client connection.
///
/// Owns the receive buffer and the identity assigned by the handshake.
/// The registry holds exactly one of these per live socket.
#[derive(Debug)]
pub struct Connection {
    assembler: FrameAssembler,
    identity: Option<ClientIdentity>,
}

impl Connection {
    /// Create the state machine for a freshly accepted socket.
    pub fn new() -> Self {
        Self { assembler: FrameAssembler::new(), identity: None }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        if self.identity.is_some() {
            ConnectionState::Registered
        } else {
            ConnectionState::Anonymous
        }
    }

    /// Identity bound by the most recent successful handshake.
    pub fn identity(&self) -> Option<&ClientIdentity> {
        self.identity.as_ref()
    }

    /// How many bytes the driver may read before the next
    /// [`receive`](Self::receive) call.
    pub fn remaining_capacity(&self) -> usize {
        self.assembler.remaining_capacity()
    }

    /// Feed bytes read from the socket.
    ///
    /// Every frame the chunk completes is processed as a registration
    /// attempt against `directory`. A zero-length chunk is not special
    /// here; peer disconnect is detected by the driver at the read call
    /// and never enters the state machine.
    ///
    /// # Errors
    ///
    /// Any [`ConnectionError`] is fatal: the driver must close the
    /// connection without emitting further events. No registration
    /// action is ever returned for the frame that failed.
    pub fn receive(
        &mut self,
        chunk: &[u8],
        directory: &dyn ApplicationDirectory,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        let frames = self.assembler.push(chunk)?;

        let mut actions = Vec::with_capacity(frames.len());
        for frame in frames {
            let identity = self.register(&frame, directory)?;
            actions.push(ConnectionAction::Registered(identity));
        }
        Ok(actions)
    }

    /// Process one registration payload.
    fn register(
        &mut self,
        payload: &[u8],
        directory: &dyn ApplicationDirectory,
    ) -> Result<ClientIdentity, ConnectionError> {
        let frame = RegistrationFrame::parse(payload)?;

        // The key is looked up by the *claimed* application id; the tag
        // verification below is what makes the claim trustworthy.
        let Some(keys) = directory.key_material(&frame.record.app_id) else {
            tracing::debug!(app_id = %frame.record.app_id, "registration for unknown application");
            return Err(ConnectionError::UnknownApplication);
        };

        verify(&keys.key, &frame.signed, &frame.tag)
            .map_err(|_| ConnectionError::HandshakeRejected)?;

        let identity = ClientIdentity {
            infobase_id: frame.record.infobase_id,
            user_id: frame.record.user_id,
            user_group: frame.record.user_group,
        };
        self.identity = Some(identity.clone());
        Ok(identity)
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}
