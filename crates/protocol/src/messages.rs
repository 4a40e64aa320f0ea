//! Typed message wrappers for coordinator/participant communication

use collage_common::{Decision, TxnId, Vote};
use collage_engine::Message;
use std::collections::HashMap;
use thiserror::Error;

/// Current wire format version, carried on every message
pub const WIRE_VERSION: &str = "1";

const H_VERSION: &str = "wire_version";
const H_TXN_ID: &str = "txn_id";
const H_PHASE: &str = "phase";
const H_FILENAME: &str = "filename";
const H_RESOURCES: &str = "resources";
const H_DECISION: &str = "decision";
const H_VOTE: &str = "vote";

/// Protocol phase tagging every wire message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Phase I, coordinator to participant
    Proposal,
    /// Phase II, coordinator to participant
    Decision,
    /// Phase I reply, participant to coordinator
    Vote,
    /// Phase II reply, participant to coordinator
    Ack,
}

impl Phase {
    /// Parse from string header value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "proposal" => Some(Self::Proposal),
            "decision" => Some(Self::Decision),
            "vote" => Some(Self::Vote),
            "ack" => Some(Self::Ack),
            _ => None,
        }
    }

    /// Convert to string header value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposal => "proposal",
            Self::Decision => "decision",
            Self::Vote => "vote",
            Self::Ack => "ack",
        }
    }
}

/// Message from the coordinator to a participant
#[derive(Debug, Clone)]
pub enum CoordinatorMessage {
    /// Phase I: propose a transaction, carrying only this participant's
    /// resource subset plus the artifact preview for the approval oracle
    Proposal {
        txn_id: TxnId,
        filename: String,
        artifact: Vec<u8>,
        resources: Vec<String>,
    },
    /// Phase II: the coordinator's decision
    Decision { txn_id: TxnId, decision: Decision },
}

/// Message from a participant to the coordinator
#[derive(Debug, Clone)]
pub enum ParticipantMessage {
    /// Phase I reply: the participant's vote
    Vote { txn_id: TxnId, vote: Vote },
    /// Phase II reply: decision applied
    Ack { txn_id: TxnId },
}

/// Errors that can occur when parsing messages
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("Unsupported wire version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid transaction ID: {0}")]
    InvalidTransactionId(String),

    #[error("Invalid phase: {0}")]
    InvalidPhase(String),

    #[error("Invalid vote: {0}")]
    InvalidVote(String),

    #[error("Invalid decision: {0}")]
    InvalidDecision(String),

    #[error("Unexpected phase {got} (expected {expected})")]
    UnexpectedPhase { expected: &'static str, got: String },

    #[error("Invalid resource list: {0}")]
    InvalidResources(#[from] serde_json::Error),
}

fn required<'a>(msg: &'a Message, key: &'static str) -> Result<&'a str, ProtocolError> {
    msg.get_header(key).ok_or(ProtocolError::MissingHeader(key))
}

fn parse_common(msg: &Message) -> Result<(Phase, TxnId), ProtocolError> {
    let version = required(msg, H_VERSION)?;
    if version != WIRE_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version.to_string()));
    }

    let phase_str = required(msg, H_PHASE)?;
    let phase =
        Phase::parse(phase_str).ok_or_else(|| ProtocolError::InvalidPhase(phase_str.to_string()))?;

    let txn_id_str = required(msg, H_TXN_ID)?;
    let txn_id = TxnId::parse(txn_id_str)
        .map_err(|_| ProtocolError::InvalidTransactionId(txn_id_str.to_string()))?;

    Ok((phase, txn_id))
}

fn base_headers(phase: Phase, txn_id: TxnId) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert(H_VERSION.to_string(), WIRE_VERSION.to_string());
    headers.insert(H_PHASE.to_string(), phase.as_str().to_string());
    headers.insert(H_TXN_ID.to_string(), txn_id.to_string());
    headers
}

impl CoordinatorMessage {
    /// Parse a transport Message into a typed coordinator message
    pub fn from_message(msg: Message) -> Result<Self, ProtocolError> {
        let (phase, txn_id) = parse_common(&msg)?;
        match phase {
            Phase::Proposal => {
                let filename = required(&msg, H_FILENAME)?.to_string();
                let resources: Vec<String> = serde_json::from_str(required(&msg, H_RESOURCES)?)?;
                Ok(Self::Proposal {
                    txn_id,
                    filename,
                    artifact: msg.body,
                    resources,
                })
            }
            Phase::Decision => {
                let decision_str = required(&msg, H_DECISION)?;
                let decision = Decision::parse(decision_str)
                    .ok_or_else(|| ProtocolError::InvalidDecision(decision_str.to_string()))?;
                Ok(Self::Decision { txn_id, decision })
            }
            other => Err(ProtocolError::UnexpectedPhase {
                expected: "proposal or decision",
                got: other.as_str().to_string(),
            }),
        }
    }

    /// Convert to a raw transport Message for sending
    pub fn into_message(self) -> Message {
        match self {
            Self::Proposal {
                txn_id,
                filename,
                artifact,
                resources,
            } => {
                let mut headers = base_headers(Phase::Proposal, txn_id);
                headers.insert(H_FILENAME.to_string(), filename);
                headers.insert(
                    H_RESOURCES.to_string(),
                    serde_json::to_string(&resources).expect("string list serializes"),
                );
                Message::new(artifact, headers)
            }
            Self::Decision { txn_id, decision } => {
                let mut headers = base_headers(Phase::Decision, txn_id);
                headers.insert(H_DECISION.to_string(), decision.as_str().to_string());
                Message::with_headers(headers)
            }
        }
    }

    pub fn txn_id(&self) -> TxnId {
        match self {
            Self::Proposal { txn_id, .. } | Self::Decision { txn_id, .. } => *txn_id,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Proposal { .. } => Phase::Proposal,
            Self::Decision { .. } => Phase::Decision,
        }
    }
}

impl ParticipantMessage {
    /// Parse a transport Message into a typed participant message
    pub fn from_message(msg: Message) -> Result<Self, ProtocolError> {
        let (phase, txn_id) = parse_common(&msg)?;
        match phase {
            Phase::Vote => {
                let vote_str = required(&msg, H_VOTE)?;
                let vote = Vote::parse(vote_str)
                    .ok_or_else(|| ProtocolError::InvalidVote(vote_str.to_string()))?;
                Ok(Self::Vote { txn_id, vote })
            }
            Phase::Ack => Ok(Self::Ack { txn_id }),
            other => Err(ProtocolError::UnexpectedPhase {
                expected: "vote or ack",
                got: other.as_str().to_string(),
            }),
        }
    }

    /// Convert to a raw transport Message for sending
    pub fn into_message(self) -> Message {
        match self {
            Self::Vote { txn_id, vote } => {
                let mut headers = base_headers(Phase::Vote, txn_id);
                headers.insert(H_VOTE.to_string(), vote.as_str().to_string());
                Message::with_headers(headers)
            }
            Self::Ack { txn_id } => Message::with_headers(base_headers(Phase::Ack, txn_id)),
        }
    }

    pub fn txn_id(&self) -> TxnId {
        match self {
            Self::Vote { txn_id, .. } | Self::Ack { txn_id } => *txn_id,
        }
    }
}
