//! Coordinator engine for the collage commit protocol
//!
//! The single coordinator owns all commit decisions. It drives phase I
//! (propose, collect votes), phase II (decide, collect acks), converts
//! phase-I silence into an implicit denial on a timer, retries decision
//! delivery forever, and recovers its durable log after a crash.

mod config;
mod engine;
mod error;
mod log;
mod record;
mod retry;

pub use config::CoordinatorConfig;
pub use engine::CoordinatorEngine;
pub use error::{CoordinatorError, Result};
pub use log::CoordinatorLog;
pub use record::{CoordinatorRecord, TxnStatus};
