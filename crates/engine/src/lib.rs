//! In-memory message transport for the collage commit protocol
//!
//! This crate provides the point-to-point messaging fabric the engines run
//! on: named nodes, fire-and-forget sends, per-node mailboxes. Delivery is
//! at-least-once; the fabric can be told to duplicate deliveries or silence
//! a destination to exercise the protocol's retry and idempotence paths.

use thiserror::Error;

mod message;
mod transport;

pub use message::{Envelope, Message};
pub use transport::{Client, Mailbox, MemoryTransport};

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Unknown destination: {0}")]
    UnknownDestination(String),

    #[error("Mailbox closed for: {0}")]
    MailboxClosed(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
