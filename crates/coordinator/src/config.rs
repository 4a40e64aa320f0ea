//! Coordinator configuration

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the coordinator engine
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Directory for the durable log
    pub data_dir: PathBuf,

    /// How long an outbound message may go unanswered before its timer
    /// fires. Must exceed twice the assumed maximum one-way latency.
    pub retry_timeout: Duration,

    /// Period of the timeout sweep; smaller than `retry_timeout` so
    /// detection latency stays bounded.
    pub sweep_interval: Duration,
}

impl CoordinatorConfig {
    /// Create a new config with the given data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            retry_timeout: Duration::from_secs(6),
            sweep_interval: Duration::from_secs(1),
        }
    }

    /// Set the retry timeout
    pub fn with_retry_timeout(mut self, timeout: Duration) -> Self {
        self.retry_timeout = timeout;
        self
    }

    /// Set the sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}
