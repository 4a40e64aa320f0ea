//! Per-transaction coordinator record
//!
//! Durable state for one commit request. `participants` is derived once from
//! `sources` and never changes; `outstanding` is the subset still owing a
//! response for the current phase. `status` moves `Prepare → Decision → End`
//! with no back-edges, and a record at `End` always has an empty outstanding
//! set and a decided outcome. Records are never deleted; a retired record is
//! what lets duplicate votes and acks be answered idempotently.

use collage_common::encoding::{self, EncodingError, Reader};
use collage_common::{Decision, Source, TxnId};
use std::collections::BTreeSet;

const RECORD_VERSION: u8 = 1;

/// Coordinator-side transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    /// Phase I: proposals out, collecting votes
    Prepare,
    /// Phase II: decision made, collecting acks
    Decision,
    /// Retired: every participant acked the decision
    End,
}

impl TxnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Decision => "decision",
            Self::End => "end",
        }
    }

    /// 1-byte tag for persisted records
    pub fn to_tag(self) -> u8 {
        match self {
            Self::Prepare => 0,
            Self::Decision => 1,
            Self::End => 2,
        }
    }

    /// Parse the 1-byte persisted tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Prepare),
            1 => Some(Self::Decision),
            2 => Some(Self::End),
            _ => None,
        }
    }
}

/// Durable coordinator-side state for one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorRecord {
    pub id: TxnId,
    pub filename: String,
    pub artifact: Vec<u8>,
    pub sources: Vec<Source>,
    pub participants: BTreeSet<String>,
    pub outstanding: BTreeSet<String>,
    pub status: TxnStatus,
    pub decision: Decision,
}

impl CoordinatorRecord {
    pub fn new(id: TxnId, filename: String, artifact: Vec<u8>, sources: Vec<Source>) -> Self {
        let participants = Source::participants(&sources);
        Self {
            id,
            filename,
            artifact,
            outstanding: participants.clone(),
            participants,
            sources,
            status: TxnStatus::Prepare,
            decision: Decision::Undecided,
        }
    }

    /// Move to phase II with the given decision: every participant owes an
    /// ack again, and any later vote is answered from the decided record.
    pub fn decide(&mut self, decision: Decision) {
        self.decision = decision;
        self.status = TxnStatus::Decision;
        self.outstanding = self.participants.clone();
    }

    /// Encode with a leading format-version byte
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        encoding::put_u8(&mut buf, RECORD_VERSION);
        encoding::put_u64(&mut buf, self.id.value());
        encoding::put_str(&mut buf, &self.filename);
        encoding::put_bytes(&mut buf, &self.artifact);

        let source_specs: Vec<String> = self.sources.iter().map(|s| s.to_string()).collect();
        encoding::put_str_list(&mut buf, &source_specs);

        let outstanding: Vec<String> = self.outstanding.iter().cloned().collect();
        encoding::put_str_list(&mut buf, &outstanding);

        encoding::put_u8(&mut buf, self.status.to_tag());
        encoding::put_u8(&mut buf, self.decision.to_tag());
        buf
    }

    /// Decode a persisted record; `participants` is re-derived from sources
    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        let mut r = Reader::new(bytes);
        let version = r.u8()?;
        if version != RECORD_VERSION {
            return Err(EncodingError::UnsupportedVersion(version));
        }

        let id = TxnId::new(r.u64()?);
        let filename = r.str()?;
        let artifact = r.bytes()?;

        let source_specs = r.str_list()?;
        let sources = Source::parse_all(&source_specs).map_err(EncodingError::Invalid)?;

        let outstanding: BTreeSet<String> = r.str_list()?.into_iter().collect();

        let status_tag = r.u8()?;
        let status = TxnStatus::from_tag(status_tag).ok_or(EncodingError::UnknownTag {
            what: "status",
            tag: status_tag,
        })?;
        let decision_tag = r.u8()?;
        let decision = Decision::from_tag(decision_tag).ok_or(EncodingError::UnknownTag {
            what: "decision",
            tag: decision_tag,
        })?;

        Ok(Self {
            id,
            filename,
            artifact,
            participants: Source::participants(&sources),
            sources,
            outstanding,
            status,
            decision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CoordinatorRecord {
        let sources = Source::parse_all(&[
            "a:cat.jpg".to_string(),
            "b:dog.jpg".to_string(),
            "a:bird.jpg".to_string(),
        ])
        .unwrap();
        CoordinatorRecord::new(TxnId::new(5), "collage.jpg".to_string(), b"jpeg".to_vec(), sources)
    }

    #[test]
    fn test_new_derives_participants_and_outstanding() {
        let r = record();
        assert_eq!(r.participants.len(), 2);
        assert_eq!(r.outstanding, r.participants);
        assert_eq!(r.status, TxnStatus::Prepare);
        assert_eq!(r.decision, Decision::Undecided);
    }

    #[test]
    fn test_decide_resets_outstanding() {
        let mut r = record();
        r.outstanding.remove("a");
        r.decide(Decision::Abort);
        assert_eq!(r.status, TxnStatus::Decision);
        assert_eq!(r.decision, Decision::Abort);
        assert_eq!(r.outstanding, r.participants);
    }

    #[test]
    fn test_encode_decode_mid_phase() {
        let mut r = record();
        r.decide(Decision::Commit);
        r.outstanding.remove("b");

        let decoded = CoordinatorRecord::decode(&r.encode()).unwrap();
        assert_eq!(decoded, r);
    }
}
