//! Error types for the coordinator

use thiserror::Error;

/// Coordinator error types
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Log storage error: {0}")]
    Log(#[from] fjall::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] collage_common::encoding::EncodingError),

    #[error("Artifact storage error: {0}")]
    Storage(#[from] collage_common::StorageError),

    #[error("Transport error: {0}")]
    Transport(#[from] collage_engine::TransportError),

    #[error("Invalid commit request: {0}")]
    InvalidRequest(String),
}

/// Result type for coordinator operations
pub type Result<T> = std::result::Result<T, CoordinatorError>;
