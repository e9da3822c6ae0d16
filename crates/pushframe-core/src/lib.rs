//! Pushframe relay core logic.
//!
//! Protocol state machines and domain types, completely decoupled from
//! I/O. The runtime crate drives these against real sockets; tests drive
//! them against byte slices.
//!
//! # Architecture
//!
//! The per-connection state machine is deterministic and isolated from
//! sockets, time, and scheduling: the driver reads bytes and feeds them
//! in, and state transitions return declarative actions describing
//! intended effects (bind this identity) rather than executing them.
//! Anything fatal to the connection surfaces as an error; the driver
//! owns the teardown.
//!
//! External collaborators are injected through traits rather than
//! reached through globals: the [`directory`] trait supplies application
//! key material, and the [`sender`] trait is the submission API the HTTP
//! layer consumes.
//!
//! # Components
//!
//! - [`connection`]: framing + handshake state machine
//! - [`identity`]: client identity and audience matching
//! - [`message`]: the message model and its closed textual serialization
//! - [`directory`]: application key-material lookup contract
//! - [`sender`]: fire-and-forget message submission contract
//! - [`error`]: connection error types

#![forbid(unsafe_code)]

pub mod connection;
pub mod directory;
pub mod error;
pub mod identity;
pub mod message;
pub mod sender;

pub use connection::{Connection, ConnectionAction, ConnectionState};
pub use directory::ApplicationDirectory;
pub use error::ConnectionError;
pub use identity::{Audience, ClientIdentity};
pub use message::{Message, Notification};
pub use sender::MessageSender;
