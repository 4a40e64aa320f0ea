//! Core participant engine
//!
//! Answers proposals with a durably logged vote (locking the requested
//! resources on approval) and applies decisions exactly once, answering
//! every duplicate idempotently. Passive with respect to retries: the
//! coordinator alone drives retransmission.

use crate::log::ParticipantLog;
use crate::oracle::ApprovalOracle;
use crate::record::ParticipantRecord;
use crate::Result;
use collage_common::{Decision, Storage, TxnId, Vote};
use collage_engine::{Client, Envelope, Mailbox, Message};
use collage_protocol::{CoordinatorMessage, ParticipantMessage};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct ParticipantEngine {
    /// Transport handle; the node's name is its identity to the coordinator
    client: Client,

    /// Local file store holding this node's source resources
    storage: Arc<dyn Storage>,

    /// External approval oracle; may block for a long time
    oracle: Arc<dyn ApprovalOracle>,

    /// Durable records + lock table, guarded by one coarse lock
    log: Mutex<ParticipantLog>,
}

impl ParticipantEngine {
    /// Create an engine over an already-opened (and therefore recovered) log
    pub fn new(
        client: Client,
        log: ParticipantLog,
        storage: Arc<dyn Storage>,
        oracle: Arc<dyn ApprovalOracle>,
    ) -> Self {
        Self {
            client,
            storage,
            oracle,
            log: Mutex::new(log),
        }
    }

    pub fn node_id(&self) -> &str {
        self.client.node_id()
    }

    /// Spawn the inbound dispatch loop
    pub fn run(self: Arc<Self>, mut mailbox: Mailbox) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(envelope) = mailbox.recv().await {
                let Envelope { from, message } = envelope;
                if let Err(e) = self.handle_message(&from, message) {
                    tracing::error!(node = self.node_id(), %from, "message handling failed: {e}");
                }
            }
        })
    }

    /// Dispatch one inbound message
    pub fn handle_message(&self, from: &str, message: Message) -> Result<()> {
        match CoordinatorMessage::from_message(message) {
            Ok(CoordinatorMessage::Proposal {
                txn_id,
                filename,
                artifact,
                resources,
            }) => self.on_proposal(from, txn_id, filename, artifact, resources),
            Ok(CoordinatorMessage::Decision { txn_id, decision }) => {
                self.on_decision(from, txn_id, decision)
            }
            Err(e) => {
                tracing::warn!(node = self.node_id(), %from, "unparseable message: {e}");
                Ok(())
            }
        }
    }

    /// Phase I: evaluate a proposal and reply with a durably logged vote
    fn on_proposal(
        &self,
        from: &str,
        txn_id: TxnId,
        filename: String,
        artifact: Vec<u8>,
        resources: Vec<String>,
    ) -> Result<()> {
        // Duplicate proposal: the logged vote is final, resend it without
        // re-evaluating or touching locks.
        if let Some(vote) = self.log.lock().record(txn_id).map(|r| r.vote) {
            tracing::info!(node = self.node_id(), txn = %txn_id, "duplicate proposal, resending {}", vote.as_str());
            return self.send_vote(from, txn_id, vote);
        }

        // The oracle is human-paced; never hold the log lock across it.
        let approved = match self.oracle.approve(&artifact, &resources) {
            Ok(approved) => approved,
            Err(e) => {
                tracing::warn!(node = self.node_id(), txn = %txn_id, "{e}, voting denial");
                false
            }
        };

        let mut log = self.log.lock();

        // A duplicate may have been answered while the oracle was blocked.
        if let Some(vote) = log.record(txn_id).map(|r| r.vote) {
            drop(log);
            return self.send_vote(from, txn_id, vote);
        }

        let mut vote = if approved { Vote::Approval } else { Vote::Denial };
        if vote == Vote::Approval {
            for resource in &resources {
                if !self.storage.exists(resource) || log.is_locked(resource) {
                    tracing::info!(
                        node = self.node_id(),
                        txn = %txn_id,
                        resource,
                        "resource missing or locked, voting denial"
                    );
                    vote = Vote::Denial;
                    break;
                }
            }
        }

        if vote == Vote::Approval {
            for resource in &resources {
                log.lock(resource, txn_id)?;
            }
        }

        log.create_record(ParticipantRecord::new(txn_id, filename, resources, vote))?;
        log.flush()?;
        drop(log);

        tracing::info!(node = self.node_id(), txn = %txn_id, "voting {}", vote.as_str());
        self.send_vote(from, txn_id, vote)
    }

    /// Phase II: apply the coordinator's decision and ack
    fn on_decision(&self, from: &str, txn_id: TxnId, decision: Decision) -> Result<()> {
        if !decision.is_decided() {
            tracing::warn!(node = self.node_id(), txn = %txn_id, "undecided decision message, dropping");
            return Ok(());
        }

        let mut log = self.log.lock();

        let Some(recorded) = log.record(txn_id).map(|r| r.decision) else {
            // This node never logged a vote, so the coordinator cannot have
            // committed with its approval: only abort is legal here.
            if decision == Decision::Commit {
                tracing::error!(
                    node = self.node_id(),
                    txn = %txn_id,
                    "commit decision for a transaction this node never voted on, dropping"
                );
                return Ok(());
            }
            let mut record = ParticipantRecord::new(txn_id, String::new(), Vec::new(), Vote::Denial);
            record.decision = Decision::Abort;
            log.create_record(record)?;
            log.flush()?;
            drop(log);
            tracing::info!(node = self.node_id(), txn = %txn_id, "abort for unvoted transaction, acking");
            return self.send_ack(from, txn_id);
        };

        if recorded == decision {
            // Duplicate decision delivery: ack again, no file or lock effects.
            drop(log);
            tracing::info!(node = self.node_id(), txn = %txn_id, "duplicate decision, re-acking");
            return self.send_ack(from, txn_id);
        }

        log.set_decision(txn_id, decision)?;

        let locked = log.resources_locked_by(txn_id);
        if decision == Decision::Commit {
            // Committed resources were consumed into the artifact and must
            // not be reused locally.
            for resource in &locked {
                let deleted = self.storage.delete(resource)?;
                tracing::info!(node = self.node_id(), txn = %txn_id, resource, deleted, "deleted committed resource");
            }
        }
        for resource in &locked {
            log.release(resource)?;
        }

        log.flush()?;
        drop(log);

        tracing::info!(node = self.node_id(), txn = %txn_id, "applied {}", decision.as_str());
        self.send_ack(from, txn_id)
    }

    fn send_vote(&self, to: &str, txn_id: TxnId, vote: Vote) -> Result<()> {
        let message = ParticipantMessage::Vote { txn_id, vote }.into_message();
        self.client.send(to, message)?;
        Ok(())
    }

    fn send_ack(&self, to: &str, txn_id: TxnId) -> Result<()> {
        let message = ParticipantMessage::Ack { txn_id }.into_message();
        self.client.send(to, message)?;
        Ok(())
    }

    /// Logged vote for a transaction, if any (test inspection)
    pub fn vote_of(&self, txn_id: TxnId) -> Option<Vote> {
        self.log.lock().record(txn_id).map(|r| r.vote)
    }

    /// Applied decision for a transaction, if any (test inspection)
    pub fn decision_of(&self, txn_id: TxnId) -> Option<Decision> {
        self.log.lock().record(txn_id).map(|r| r.decision)
    }

    /// Whether a resource is currently locked (test inspection)
    pub fn is_locked(&self, resource: &str) -> bool {
        self.log.lock().is_locked(resource)
    }
}
