//! Participant engine for the collage commit protocol
//!
//! A participant holds source files, votes on proposals (locking the
//! requested resources on approval), and applies the coordinator's decision:
//! commit deletes the consumed files, abort releases the locks. All state
//! that must survive a crash lives in the fjall-backed [`ParticipantLog`].

use thiserror::Error;

mod engine;
mod log;
mod oracle;
mod record;

pub use engine::ParticipantEngine;
pub use log::ParticipantLog;
pub use oracle::{ApprovalOracle, AutoApprove, OracleError, ScriptedOracle};
pub use record::ParticipantRecord;

/// Participant error types
#[derive(Debug, Error)]
pub enum ParticipantError {
    #[error("Log storage error: {0}")]
    Log(#[from] fjall::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] collage_common::encoding::EncodingError),

    #[error("File storage error: {0}")]
    Storage(#[from] collage_common::StorageError),

    #[error("Transport error: {0}")]
    Transport(#[from] collage_engine::TransportError),
}

pub type Result<T> = std::result::Result<T, ParticipantError>;
