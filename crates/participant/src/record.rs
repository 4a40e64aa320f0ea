//! Per-transaction participant record
//!
//! A record is created the moment a vote is cast, never before; its presence
//! in the log is the "already voted" marker. `decision` starts undecided and
//! is set once when the coordinator's decision is applied.

use collage_common::encoding::{self, EncodingError, Reader};
use collage_common::{Decision, TxnId, Vote};

const RECORD_VERSION: u8 = 1;

/// Durable participant-side state for one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRecord {
    pub txn_id: TxnId,
    pub filename: String,
    pub resources_requested: Vec<String>,
    pub vote: Vote,
    pub decision: Decision,
}

impl ParticipantRecord {
    pub fn new(txn_id: TxnId, filename: String, resources_requested: Vec<String>, vote: Vote) -> Self {
        Self {
            txn_id,
            filename,
            resources_requested,
            vote,
            decision: Decision::Undecided,
        }
    }

    /// Encode with a leading format-version byte
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        encoding::put_u8(&mut buf, RECORD_VERSION);
        encoding::put_u64(&mut buf, self.txn_id.value());
        encoding::put_str(&mut buf, &self.filename);
        encoding::put_str_list(&mut buf, &self.resources_requested);
        encoding::put_u8(&mut buf, self.vote.to_tag());
        encoding::put_u8(&mut buf, self.decision.to_tag());
        buf
    }

    /// Decode a persisted record
    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        let mut r = Reader::new(bytes);
        let version = r.u8()?;
        if version != RECORD_VERSION {
            return Err(EncodingError::UnsupportedVersion(version));
        }

        let txn_id = TxnId::new(r.u64()?);
        let filename = r.str()?;
        let resources_requested = r.str_list()?;
        let vote_tag = r.u8()?;
        let vote = Vote::from_tag(vote_tag).ok_or(EncodingError::UnknownTag {
            what: "vote",
            tag: vote_tag,
        })?;
        let decision_tag = r.u8()?;
        let decision = Decision::from_tag(decision_tag).ok_or(EncodingError::UnknownTag {
            what: "decision",
            tag: decision_tag,
        })?;

        Ok(Self {
            txn_id,
            filename,
            resources_requested,
            vote,
            decision,
        })
    }
}
