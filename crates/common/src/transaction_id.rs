//! Transaction identifier
//!
//! A single coordinator owns all commit decisions, so a monotonically
//! increasing integer is sufficient for global uniqueness. The coordinator
//! persists the high-water mark alongside its log so ids survive restarts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinator-assigned transaction identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxnId(u64);

impl TxnId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Convert to bytes (8 bytes, big-endian, sorts in id order)
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Parse from bytes
    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }

    /// Parse from string representation (used in message headers)
    pub fn parse(s: &str) -> Result<Self, String> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| format!("Invalid transaction ID: {}", e))
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let id = TxnId::new(42);
        assert_eq!(TxnId::parse(&id.to_string()).unwrap(), id);
        assert!(TxnId::parse("not-a-number").is_err());
    }

    #[test]
    fn test_byte_order_sorts_by_id() {
        let a = TxnId::new(1).to_be_bytes();
        let b = TxnId::new(256).to_be_bytes();
        assert!(a < b);
    }
}
