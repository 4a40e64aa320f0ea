//! Phase-I vote

use serde::{Deserialize, Serialize};

/// A participant's phase-I vote on a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    /// No vote cast (placeholder on ack messages)
    NotVoted,
    /// Participant approves the transaction
    Approval,
    /// Participant denies the transaction
    Denial,
}

impl Vote {
    /// Parse from string header value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_voted" => Some(Self::NotVoted),
            "approval" => Some(Self::Approval),
            "denial" => Some(Self::Denial),
            _ => None,
        }
    }

    /// Convert to string header value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotVoted => "not_voted",
            Self::Approval => "approval",
            Self::Denial => "denial",
        }
    }

    /// 1-byte tag for persisted records
    pub fn to_tag(self) -> u8 {
        match self {
            Self::NotVoted => 0,
            Self::Approval => 1,
            Self::Denial => 2,
        }
    }

    /// Parse the 1-byte persisted tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::NotVoted),
            1 => Some(Self::Approval),
            2 => Some(Self::Denial),
            _ => None,
        }
    }
}
