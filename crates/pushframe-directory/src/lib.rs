//! Flat-file application registry for the pushframe relay.
//!
//! Applications are the unit of trust: each one owns a server key (what
//! producers present to the auth endpoint), symmetric key material (what
//! authenticates and encrypts traffic to its clients), and at most one
//! live access token. The registry persists them in a small line-oriented
//! text file and keeps a working copy in memory.
//!
//! The relay core never sees this crate's types directly; it consumes
//! the [`ApplicationDirectory`](pushframe_core::ApplicationDirectory)
//! trait, implemented here by [`SharedDirectory`].

#![forbid(unsafe_code)]

pub mod app;
pub mod error;
pub mod shared;
pub mod store;
pub mod token;

pub use app::Application;
pub use error::DirectoryError;
pub use shared::{SharedDirectory, TokenStatus};
pub use store::FileStore;
pub use token::AccessToken;
