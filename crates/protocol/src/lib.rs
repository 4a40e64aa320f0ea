//! Wire protocol for the collage commit system
//!
//! Typed envelopes for the four protocol messages, converted to and from the
//! transport's header/body `Message` format. Every message carries an
//! explicit `wire_version` header so the encoding can evolve without being
//! tied to any runtime's object serializer.

mod messages;

pub use messages::{
    CoordinatorMessage, ParticipantMessage, Phase, ProtocolError, WIRE_VERSION,
};
