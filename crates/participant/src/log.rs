//! Durable participant log: transaction records plus the resource lock table
//!
//! Backed by a fjall keyspace with two partitions: `records` (txn id →
//! encoded record) and `locks` (resource name → owning txn id). All reads go
//! through in-memory maps loaded at open; writes go to both the map and the
//! partition, and become durable when [`ParticipantLog::flush`] returns.

use crate::record::ParticipantRecord;
use crate::Result;
use collage_common::{Decision, TxnId};
use fjall::{Keyspace, Partition, PartitionCreateOptions, PersistMode};
use std::collections::HashMap;
use std::path::Path;

pub struct ParticipantLog {
    keyspace: Keyspace,
    records_partition: Partition,
    locks_partition: Partition,

    records: HashMap<TxnId, ParticipantRecord>,
    locks: HashMap<String, TxnId>,
}

impl ParticipantLog {
    /// Open the log at `path`, loading all persisted records and locks.
    /// A fresh directory yields an empty log; this is the whole of
    /// participant crash recovery.
    pub fn open(path: &Path) -> Result<Self> {
        let keyspace = fjall::Config::new(path).open()?;
        let records_partition =
            keyspace.open_partition("records", PartitionCreateOptions::default())?;
        let locks_partition = keyspace.open_partition("locks", PartitionCreateOptions::default())?;

        let mut records = HashMap::new();
        for entry in records_partition.iter() {
            let (_, value) = entry?;
            let record = ParticipantRecord::decode(&value)?;
            records.insert(record.txn_id, record);
        }

        let mut locks = HashMap::new();
        for entry in locks_partition.iter() {
            let (key, value) = entry?;
            let resource = String::from_utf8_lossy(&key).into_owned();
            let mut id = [0u8; 8];
            id.copy_from_slice(&value);
            locks.insert(resource, TxnId::from_be_bytes(id));
        }

        Ok(Self {
            keyspace,
            records_partition,
            locks_partition,
            records,
            locks,
        })
    }

    pub fn record(&self, txn_id: TxnId) -> Option<&ParticipantRecord> {
        self.records.get(&txn_id)
    }

    /// Insert a freshly voted record
    pub fn create_record(&mut self, record: ParticipantRecord) -> Result<()> {
        self.records_partition
            .insert(record.txn_id.to_be_bytes(), record.encode())?;
        self.records.insert(record.txn_id, record);
        Ok(())
    }

    /// Record the applied decision for a transaction
    pub fn set_decision(&mut self, txn_id: TxnId, decision: Decision) -> Result<()> {
        if let Some(record) = self.records.get_mut(&txn_id) {
            record.decision = decision;
            self.records_partition
                .insert(txn_id.to_be_bytes(), record.encode())?;
        }
        Ok(())
    }

    pub fn is_locked(&self, resource: &str) -> bool {
        self.locks.contains_key(resource)
    }

    /// Take an exclusive lock entry for a transaction
    pub fn lock(&mut self, resource: &str, txn_id: TxnId) -> Result<()> {
        self.locks_partition
            .insert(resource.as_bytes(), txn_id.to_be_bytes())?;
        self.locks.insert(resource.to_string(), txn_id);
        Ok(())
    }

    /// All resources currently locked under this transaction
    pub fn resources_locked_by(&self, txn_id: TxnId) -> Vec<String> {
        let mut resources: Vec<String> = self
            .locks
            .iter()
            .filter(|(_, owner)| **owner == txn_id)
            .map(|(resource, _)| resource.clone())
            .collect();
        resources.sort();
        resources
    }

    /// Release a lock entry
    pub fn release(&mut self, resource: &str) -> Result<()> {
        self.locks_partition.remove(resource.as_bytes())?;
        self.locks.remove(resource);
        Ok(())
    }

    /// Make every prior write durable (flush + fsync). Must complete before
    /// any externally observable action that depends on it.
    pub fn flush(&self) -> Result<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collage_common::Vote;

    fn record(id: u64) -> ParticipantRecord {
        ParticipantRecord::new(
            TxnId::new(id),
            "collage.jpg".to_string(),
            vec!["cat.jpg".to_string()],
            Vote::Approval,
        )
    }

    #[test]
    fn test_records_and_locks_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let mut log = ParticipantLog::open(dir.path()).unwrap();
            log.create_record(record(1)).unwrap();
            log.lock("cat.jpg", TxnId::new(1)).unwrap();
            log.flush().unwrap();
        }

        let log = ParticipantLog::open(dir.path()).unwrap();
        assert_eq!(log.record(TxnId::new(1)).unwrap().vote, Vote::Approval);
        assert!(log.is_locked("cat.jpg"));
        assert_eq!(log.resources_locked_by(TxnId::new(1)), vec!["cat.jpg"]);
    }

    #[test]
    fn test_release_removes_lock_durably() {
        let dir = tempfile::tempdir().unwrap();

        {
            let mut log = ParticipantLog::open(dir.path()).unwrap();
            log.lock("cat.jpg", TxnId::new(7)).unwrap();
            log.release("cat.jpg").unwrap();
            log.flush().unwrap();
        }

        let log = ParticipantLog::open(dir.path()).unwrap();
        assert!(!log.is_locked("cat.jpg"));
        assert!(log.resources_locked_by(TxnId::new(7)).is_empty());
    }

    #[test]
    fn test_set_decision_persists() {
        let dir = tempfile::tempdir().unwrap();

        {
            let mut log = ParticipantLog::open(dir.path()).unwrap();
            log.create_record(record(3)).unwrap();
            log.set_decision(TxnId::new(3), Decision::Abort).unwrap();
            log.flush().unwrap();
        }

        let log = ParticipantLog::open(dir.path()).unwrap();
        assert_eq!(log.record(TxnId::new(3)).unwrap().decision, Decision::Abort);
    }
}
