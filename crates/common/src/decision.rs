//! Transaction decision

use serde::{Deserialize, Serialize};

/// Final decision for a transaction, made only by the coordinator.
///
/// Monotonic: once a record holds `Commit` or `Abort` it never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// No decision yet
    Undecided,
    /// Transaction commits
    Commit,
    /// Transaction aborts
    Abort,
}

impl Decision {
    /// Parse from string header value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "undecided" => Some(Self::Undecided),
            "commit" => Some(Self::Commit),
            "abort" => Some(Self::Abort),
            _ => None,
        }
    }

    /// Convert to string header value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undecided => "undecided",
            Self::Commit => "commit",
            Self::Abort => "abort",
        }
    }

    /// 1-byte tag for persisted records
    pub fn to_tag(self) -> u8 {
        match self {
            Self::Undecided => 0,
            Self::Commit => 1,
            Self::Abort => 2,
        }
    }

    /// Parse the 1-byte persisted tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Undecided),
            1 => Some(Self::Commit),
            2 => Some(Self::Abort),
            _ => None,
        }
    }

    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Undecided)
    }
}
