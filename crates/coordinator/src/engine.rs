//! Core coordinator engine
//!
//! One coarse lock guards the durable log together with the volatile retry
//! set; the inbound dispatch task and the periodic sweep both go through it.
//! Every state transition is flushed before the action it justifies becomes
//! visible to the outside world: the record carrying a decision hits disk
//! before the artifact is written, and the artifact before the decision is
//! broadcast.

use crate::config::CoordinatorConfig;
use crate::log::CoordinatorLog;
use crate::record::TxnStatus;
use crate::retry::RetrySet;
use crate::Result;
use collage_common::{Decision, Source, Storage, TxnId, Vote};
use collage_engine::{Client, Envelope, Mailbox, Message};
use collage_protocol::{CoordinatorMessage, ParticipantMessage, Phase};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;

struct Inner {
    log: CoordinatorLog,
    retries: RetrySet,
}

pub struct CoordinatorEngine {
    /// Transport handle
    client: Client,

    /// Artifact store; the committed collage lands here
    storage: Arc<dyn Storage>,

    config: CoordinatorConfig,

    /// Log + retry set under one lock
    inner: Mutex<Inner>,
}

impl CoordinatorEngine {
    /// Create an engine over an already-opened log. Call [`recover`] (or
    /// [`start`], which does) before feeding it inbound messages.
    ///
    /// [`recover`]: CoordinatorEngine::recover
    /// [`start`]: CoordinatorEngine::start
    pub fn new(
        client: Client,
        log: CoordinatorLog,
        storage: Arc<dyn Storage>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            client,
            storage,
            config,
            inner: Mutex::new(Inner {
                log,
                retries: RetrySet::new(),
            }),
        }
    }

    /// Run recovery, then spawn the inbound dispatch loop and the timeout
    /// sweeper. Messages that arrived earlier sit in the mailbox channel and
    /// are only dispatched once recovery has completed.
    pub fn start(self: Arc<Self>, mut mailbox: Mailbox) -> Result<Vec<JoinHandle<()>>> {
        self.recover()?;

        let engine = Arc::clone(&self);
        let inbound = tokio::spawn(async move {
            while let Some(envelope) = mailbox.recv().await {
                let Envelope { from, message } = envelope;
                if let Err(e) = engine.handle_message(&from, message) {
                    tracing::error!(%from, "message handling failed: {e}");
                }
            }
        });

        let sweep_interval = self.config.sweep_interval;
        let engine = self;
        let sweeper = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = engine.sweep() {
                    tracing::error!("timeout sweep failed: {e}");
                }
            }
        });

        Ok(vec![inbound, sweeper])
    }

    /// Entry point for a commit request: create and persist the record, then
    /// propose to every participant. Fire-and-forget for the caller; the
    /// outcome shows up in the log and as artifact presence or absence.
    pub fn start_commit(
        &self,
        filename: &str,
        artifact: &[u8],
        source_specs: &[String],
    ) -> Result<TxnId> {
        let sources = Source::parse_all(source_specs)
            .map_err(crate::CoordinatorError::InvalidRequest)?;
        if sources.is_empty() {
            return Err(crate::CoordinatorError::InvalidRequest(
                "commit request names no sources".to_string(),
            ));
        }

        let mut inner = self.inner.lock();
        let txn_id = inner.log.create_record(filename, artifact, &sources)?;
        inner.log.flush()?;

        tracing::info!(txn = %txn_id, filename, "starting commit of {} sources", sources.len());

        for (participant, resources) in Source::partition(&sources) {
            let message = CoordinatorMessage::Proposal {
                txn_id,
                filename: filename.to_string(),
                artifact: artifact.to_vec(),
                resources,
            }
            .into_message();
            self.send_with_retry(&mut inner, txn_id, Phase::Proposal, participant, message);
        }

        Ok(txn_id)
    }

    /// Dispatch one inbound message
    pub fn handle_message(&self, from: &str, message: Message) -> Result<()> {
        match ParticipantMessage::from_message(message) {
            Ok(ParticipantMessage::Vote { txn_id, vote }) => self.on_vote(from, txn_id, vote),
            Ok(ParticipantMessage::Ack { txn_id }) => self.on_ack(from, txn_id),
            Err(e) => {
                tracing::warn!(%from, "unparseable message: {e}");
                Ok(())
            }
        }
    }

    /// Phase I: account for one participant's vote
    pub fn on_vote(&self, from: &str, txn_id: TxnId, vote: Vote) -> Result<()> {
        let mut inner = self.inner.lock();

        let Some(record) = inner.log.record(txn_id) else {
            tracing::warn!(%from, txn = %txn_id, "vote for unknown transaction");
            return Ok(());
        };

        match record.status {
            // Retired: stale duplicate, nothing owed.
            TxnStatus::End => Ok(()),

            // Already decided: the vote is a duplicate, inform the sender of
            // the decision again.
            TxnStatus::Decision => {
                let decision = record.decision;
                let message = CoordinatorMessage::Decision { txn_id, decision }.into_message();
                self.send_with_retry(&mut inner, txn_id, Phase::Decision, from.to_string(), message);
                Ok(())
            }

            TxnStatus::Prepare => {
                if vote != Vote::Approval {
                    tracing::info!(%from, txn = %txn_id, "denial vote, aborting");
                    inner.log.update(txn_id, |r| r.decide(Decision::Abort))?;
                    inner.log.flush()?;
                    return self.broadcast_decision(&mut inner, txn_id);
                }

                inner.log.update(txn_id, |r| {
                    r.outstanding.remove(from);
                })?;

                let all_voted = inner
                    .log
                    .record(txn_id)
                    .is_some_and(|r| r.outstanding.is_empty());
                if !all_voted {
                    return Ok(());
                }

                inner.log.update(txn_id, |r| {
                    let decision = if r.decision.is_decided() {
                        r.decision
                    } else {
                        Decision::Commit
                    };
                    r.decide(decision);
                })?;
                // The decided record must be durable before the commit
                // becomes visible to the outside world.
                inner.log.flush()?;

                let (decision, filename, artifact) = {
                    let r = inner.log.record(txn_id).expect("record just updated");
                    (r.decision, r.filename.clone(), r.artifact.clone())
                };
                if decision == Decision::Commit {
                    // Commit point: the artifact exists from here on.
                    tracing::info!(txn = %txn_id, filename, "unanimous approval, writing artifact");
                    self.storage.write(&filename, &artifact)?;
                }

                self.broadcast_decision(&mut inner, txn_id)
            }
        }
    }

    /// Phase II: account for one participant's ack
    pub fn on_ack(&self, from: &str, txn_id: TxnId) -> Result<()> {
        let mut inner = self.inner.lock();

        let Some(record) = inner.log.record(txn_id) else {
            tracing::warn!(%from, txn = %txn_id, "ack for unknown transaction");
            return Ok(());
        };

        match record.status {
            TxnStatus::End => Ok(()),
            TxnStatus::Prepare => {
                tracing::warn!(%from, txn = %txn_id, "ack before any decision, ignoring");
                Ok(())
            }
            TxnStatus::Decision => {
                inner.log.update(txn_id, |r| {
                    r.outstanding.remove(from);
                })?;

                let all_acked = inner
                    .log
                    .record(txn_id)
                    .is_some_and(|r| r.outstanding.is_empty());
                if all_acked {
                    inner.log.update(txn_id, |r| r.status = TxnStatus::End)?;
                    inner.log.flush()?;
                    inner.retries.cancel_all(txn_id);
                    tracing::info!(txn = %txn_id, "transaction ended");
                }
                Ok(())
            }
        }
    }

    /// Evaluate every expired timer. Phase-I silence is an implicit denial;
    /// phase-II delivery is retried until acked, since a participant cannot
    /// retire its locks without the decision.
    pub fn sweep(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let expired = inner.retries.take_expired(self.config.retry_timeout);

        for entry in expired {
            let Some(record) = inner.log.record(entry.txn_id) else {
                continue;
            };

            match (entry.phase, record.status) {
                (Phase::Proposal, TxnStatus::Prepare) => {
                    tracing::info!(
                        txn = %entry.txn_id,
                        dest = entry.dest,
                        "proposal unanswered, treating as denial"
                    );
                    inner.log.update(entry.txn_id, |r| r.decide(Decision::Abort))?;
                    inner.log.flush()?;
                    self.broadcast_decision(&mut inner, entry.txn_id)?;
                }
                (Phase::Decision, TxnStatus::Decision) => {
                    if record.outstanding.contains(&entry.dest) {
                        tracing::info!(txn = %entry.txn_id, dest = entry.dest, "resending decision");
                        self.send_with_retry(
                            &mut inner,
                            entry.txn_id,
                            Phase::Decision,
                            entry.dest,
                            entry.message,
                        );
                    }
                }
                // The record moved on while the timer was pending.
                _ => {}
            }
        }

        Ok(())
    }

    /// Crash recovery. A record still in Prepare is treated as total
    /// silence from every participant and aborted; a record in Decision
    /// resumes its broadcast to the outstanding set as-is.
    pub fn recover(&self) -> Result<()> {
        let mut inner = self.inner.lock();

        for txn_id in inner.log.txn_ids() {
            let status = inner
                .log
                .record(txn_id)
                .expect("id from log scan")
                .status;
            match status {
                TxnStatus::Prepare => {
                    tracing::info!(txn = %txn_id, "recovery: aborting in-flight transaction");
                    inner.log.update(txn_id, |r| r.decide(Decision::Abort))?;
                    inner.log.flush()?;
                    self.broadcast_decision(&mut inner, txn_id)?;
                }
                TxnStatus::Decision => {
                    tracing::info!(txn = %txn_id, "recovery: resuming decision broadcast");
                    self.broadcast_decision(&mut inner, txn_id)?;
                }
                TxnStatus::End => {}
            }
        }

        Ok(())
    }

    /// Send the decided outcome to every outstanding participant, replacing
    /// any still-pending phase-I timers for the transaction.
    fn broadcast_decision(&self, inner: &mut Inner, txn_id: TxnId) -> Result<()> {
        let (decision, outstanding) = {
            let record = inner.log.record(txn_id).expect("decided record exists");
            (record.decision, record.outstanding.clone())
        };

        inner.retries.cancel_phase(txn_id, Phase::Proposal);

        for dest in outstanding {
            let message = CoordinatorMessage::Decision { txn_id, decision }.into_message();
            self.send_with_retry(inner, txn_id, Phase::Decision, dest, message);
        }
        Ok(())
    }

    /// Fire-and-forget send with a timer armed either way: a destination the
    /// transport cannot reach right now is the same as a silent one, and the
    /// sweep owns the consequences.
    fn send_with_retry(
        &self,
        inner: &mut Inner,
        txn_id: TxnId,
        phase: Phase,
        dest: String,
        message: Message,
    ) {
        if let Err(e) = self.client.send(&dest, message.clone()) {
            tracing::warn!(txn = %txn_id, %dest, "send failed: {e}");
        }
        inner.retries.arm(txn_id, phase, dest, message);
    }

    /// Status and decision of a transaction (test inspection)
    pub fn txn_state(&self, txn_id: TxnId) -> Option<(TxnStatus, Decision)> {
        let inner = self.inner.lock();
        inner.log.record(txn_id).map(|r| (r.status, r.decision))
    }

    /// Participants still owing a response (test inspection)
    pub fn outstanding_of(&self, txn_id: TxnId) -> Option<Vec<String>> {
        let inner = self.inner.lock();
        inner
            .log
            .record(txn_id)
            .map(|r| r.outstanding.iter().cloned().collect())
    }
}
