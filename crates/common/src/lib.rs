//! Common types for the collage commit protocol
//!
//! This crate defines:
//! - Transaction IDs (coordinator-assigned monotonic integers)
//! - The core protocol enums (decision, vote)
//! - Source specifications ("participant:resource" pairs)
//! - The `Storage` collaborator trait for artifact and resource files

pub mod encoding;

mod decision;
mod source;
mod storage;
mod transaction_id;
mod vote;

pub use decision::Decision;
pub use source::Source;
pub use storage::{DirStorage, MemoryStorage, Storage, StorageError};
pub use transaction_id::TxnId;
pub use vote::Vote;
