//! Wire format for the pushframe notification relay.
//!
//! Two framings share one TCP connection, one per direction:
//!
//! - **Inbound** (client to server): `[u16 LE length][length bytes]`. The
//!   only payload a client ever sends is a registration record binding the
//!   connection to an application, information base, user, and group.
//! - **Outbound** (server to client):
//!   `[u32 LE total][u32 LE plaintext length][ciphertext]`, where `total`
//!   is the ciphertext length plus the four bytes of the plaintext-length
//!   field. The plaintext length lets the receiver validate the decrypted
//!   message.
//!
//! Everything here is pure parsing and encoding. No I/O, no crypto: the
//! registration tag is carried opaquely and verified by the caller.
//!
//! # Security
//!
//! Inbound frames are bounded by a fixed receive buffer; a frame that
//! declares a payload which could never fit is rejected outright rather
//! than buffered. There is no error-reply frame in the protocol: a peer
//! that violates it is simply disconnected.

#![forbid(unsafe_code)]

pub mod assembler;
pub mod errors;
pub mod notify;
pub mod registration;

pub use assembler::{FrameAssembler, LENGTH_PREFIX_SIZE, RECV_BUFFER_SIZE, encode_inbound_frame};
pub use errors::ProtocolError;
pub use notify::{MessageFrame, decode_message_frame, encode_message_frame};
pub use registration::{RegistrationFrame, RegistrationRecord};
