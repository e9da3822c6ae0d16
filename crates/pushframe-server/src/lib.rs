//! Push notification relay server.
//!
//! The runtime half of the system: everything here drives the pure state
//! machines from `pushframe-core` against real sockets.
//!
//! # Architecture
//!
//! Two independently scheduled regions share one registry:
//!
//! - The **event loop** ([`relay`]): an accept loop plus one reader task
//!   per connection. Reader tasks feed the per-connection state machine
//!   and are the only code that reads client sockets.
//! - The **dispatch pool** ([`dispatch`]): four workers draining one
//!   unbounded FIFO queue, each task encrypting a message once and
//!   fanning it out to a snapshot of recipient write handles.
//!
//! The [`registry`] is the single ownership boundary between them: every
//! mutation of the connection set and every recipient-set read goes
//! through its one lock. Recipient snapshots are taken at submission
//! time and never re-resolved; a recipient that dies mid-delivery is
//! removed exactly once, however many tasks race to notice.
//!
//! The [`http`] module is the thin submission surface: `/auth` turns a
//! producer's server key into a bearer token, `/sendmessage` validates a
//! request and hands it to the relay. Neither knows anything about
//! framing or crypto.

#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod registry;
pub mod relay;

pub use config::ServiceConfig;
pub use error::ServerError;
pub use http::ApiState;
pub use registry::ConnectionRegistry;
pub use relay::Relay;
