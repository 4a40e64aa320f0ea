//! Outbound retry bookkeeping
//!
//! Every message the coordinator sends is armed with a timer; the periodic
//! sweep decides what an expired timer means (implicit denial in phase I,
//! unconditional resend in phase II). Entries are volatile: after a restart
//! they are rebuilt from each record's outstanding set, not reloaded.

use collage_engine::Message;
use collage_protocol::Phase;
use collage_common::TxnId;
use std::time::{Duration, Instant};

/// One armed outbound message
#[derive(Debug, Clone)]
pub struct OutboundEntry {
    pub txn_id: TxnId,
    pub phase: Phase,
    pub dest: String,
    pub message: Message,
    pub sent_at: Instant,
}

impl OutboundEntry {
    fn is_expired(&self, timeout: Duration) -> bool {
        self.sent_at.elapsed() >= timeout
    }
}

/// The coordinator's armed timers
#[derive(Default)]
pub struct RetrySet {
    entries: Vec<OutboundEntry>,
}

impl RetrySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer for a just-sent message
    pub fn arm(&mut self, txn_id: TxnId, phase: Phase, dest: String, message: Message) {
        self.entries.push(OutboundEntry {
            txn_id,
            phase,
            dest,
            message,
            sent_at: Instant::now(),
        });
    }

    /// Cancel all timers of one phase for a transaction
    pub fn cancel_phase(&mut self, txn_id: TxnId, phase: Phase) {
        self.entries
            .retain(|e| !(e.txn_id == txn_id && e.phase == phase));
    }

    /// Cancel every timer for a transaction
    pub fn cancel_all(&mut self, txn_id: TxnId) {
        self.entries.retain(|e| e.txn_id != txn_id);
    }

    /// Remove and return every expired entry
    pub fn take_expired(&mut self, timeout: Duration) -> Vec<OutboundEntry> {
        let (expired, pending): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|e| e.is_expired(timeout));
        self.entries = pending;
        expired
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arm(set: &mut RetrySet, txn: u64, phase: Phase, dest: &str) {
        set.arm(TxnId::new(txn), phase, dest.to_string(), Message::default());
    }

    #[test]
    fn test_take_expired_with_zero_timeout_drains_everything() {
        let mut set = RetrySet::new();
        arm(&mut set, 1, Phase::Proposal, "a");
        arm(&mut set, 2, Phase::Decision, "b");

        let expired = set.take_expired(Duration::ZERO);
        assert_eq!(expired.len(), 2);
        assert!(set.is_empty());
    }

    #[test]
    fn test_long_timeout_expires_nothing() {
        let mut set = RetrySet::new();
        arm(&mut set, 1, Phase::Proposal, "a");
        assert!(set.take_expired(Duration::from_secs(3600)).is_empty());
        assert!(!set.is_empty());
    }

    #[test]
    fn test_cancel_phase_keeps_other_phase() {
        let mut set = RetrySet::new();
        arm(&mut set, 1, Phase::Proposal, "a");
        arm(&mut set, 1, Phase::Decision, "a");
        arm(&mut set, 2, Phase::Proposal, "b");

        set.cancel_phase(TxnId::new(1), Phase::Proposal);
        let remaining = set.take_expired(Duration::ZERO);
        assert_eq!(remaining.len(), 2);
        assert!(remaining
            .iter()
            .all(|e| e.txn_id == TxnId::new(2) || e.phase == Phase::Decision));
    }

    #[test]
    fn test_cancel_all_clears_a_transaction() {
        let mut set = RetrySet::new();
        arm(&mut set, 1, Phase::Decision, "a");
        arm(&mut set, 1, Phase::Decision, "b");
        set.cancel_all(TxnId::new(1));
        assert!(set.is_empty());
    }
}
