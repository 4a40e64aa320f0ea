//! Durable coordinator log
//!
//! Every transaction record the coordinator has ever started, backed by a
//! fjall keyspace: partition `records` (txn id → encoded record) and
//! partition `meta` (transaction-id high-water mark). Reads are served from
//! an in-memory map loaded at open; mutations write through to the
//! partition and become durable when [`CoordinatorLog::flush`] returns.

use crate::record::CoordinatorRecord;
use crate::Result;
use collage_common::{Source, TxnId};
use fjall::{Keyspace, Partition, PartitionCreateOptions, PersistMode};
use std::collections::HashMap;
use std::path::Path;

const NEXT_TXN_ID_KEY: &str = "next_txn_id";

pub struct CoordinatorLog {
    keyspace: Keyspace,
    records_partition: Partition,
    meta_partition: Partition,

    records: HashMap<TxnId, CoordinatorRecord>,
    next_txn_id: u64,
}

impl CoordinatorLog {
    /// Open the log at `path`, loading every persisted record. A fresh
    /// directory yields an empty log.
    pub fn open(path: &Path) -> Result<Self> {
        let keyspace = fjall::Config::new(path).open()?;
        let records_partition =
            keyspace.open_partition("records", PartitionCreateOptions::default())?;
        let meta_partition = keyspace.open_partition("meta", PartitionCreateOptions::default())?;

        let mut records = HashMap::new();
        let mut max_id = 0;
        for entry in records_partition.iter() {
            let (_, value) = entry?;
            let record = CoordinatorRecord::decode(&value)?;
            max_id = max_id.max(record.id.value());
            records.insert(record.id, record);
        }

        // The persisted high-water mark and the highest stored id may
        // disagree after a crash between the two writes; take the larger.
        let stored_next = match meta_partition.get(NEXT_TXN_ID_KEY)? {
            Some(value) => {
                let mut b = [0u8; 8];
                b.copy_from_slice(&value);
                u64::from_be_bytes(b)
            }
            None => 1,
        };
        let next_txn_id = stored_next.max(max_id + 1);

        Ok(Self {
            keyspace,
            records_partition,
            meta_partition,
            records,
            next_txn_id,
        })
    }

    /// Create a record for a new commit request with a fresh id
    pub fn create_record(
        &mut self,
        filename: &str,
        artifact: &[u8],
        sources: &[Source],
    ) -> Result<TxnId> {
        let txn_id = TxnId::new(self.next_txn_id);
        self.next_txn_id += 1;
        self.meta_partition
            .insert(NEXT_TXN_ID_KEY, self.next_txn_id.to_be_bytes())?;

        let record = CoordinatorRecord::new(
            txn_id,
            filename.to_string(),
            artifact.to_vec(),
            sources.to_vec(),
        );
        self.records_partition
            .insert(txn_id.to_be_bytes(), record.encode())?;
        self.records.insert(txn_id, record);
        Ok(txn_id)
    }

    pub fn record(&self, txn_id: TxnId) -> Option<&CoordinatorRecord> {
        self.records.get(&txn_id)
    }

    /// Mutate a record in place and write the new encoding through.
    /// Returns false if the transaction is unknown.
    pub fn update<F>(&mut self, txn_id: TxnId, f: F) -> Result<bool>
    where
        F: FnOnce(&mut CoordinatorRecord),
    {
        let Some(record) = self.records.get_mut(&txn_id) else {
            return Ok(false);
        };
        f(record);
        self.records_partition
            .insert(txn_id.to_be_bytes(), record.encode())?;
        Ok(true)
    }

    /// All transaction ids in the log (recovery scan)
    pub fn txn_ids(&self) -> Vec<TxnId> {
        let mut ids: Vec<TxnId> = self.records.keys().copied().collect();
        ids.sort();
        ids
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
    use crate::record::TxnStatus;
    use collage_common::Decision;

    fn sources() -> Vec<Source> {
        Source::parse_all(&["a:cat.jpg".to_string(), "b:dog.jpg".to_string()]).unwrap()
    }

    #[test]
    fn test_ids_are_monotonic_across_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let first = {
            let mut log = CoordinatorLog::open(dir.path()).unwrap();
            let id = log.create_record("collage.jpg", b"jpeg", &sources()).unwrap();
            log.flush().unwrap();
            id
        };

        let mut log = CoordinatorLog::open(dir.path()).unwrap();
        let second = log.create_record("other.jpg", b"jpeg", &sources()).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_updates_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let txn_id = {
            let mut log = CoordinatorLog::open(dir.path()).unwrap();
            let id = log.create_record("collage.jpg", b"jpeg", &sources()).unwrap();
            log.update(id, |r| r.decide(Decision::Abort)).unwrap();
            log.flush().unwrap();
            id
        };

        let log = CoordinatorLog::open(dir.path()).unwrap();
        let record = log.record(txn_id).unwrap();
        assert_eq!(record.status, TxnStatus::Decision);
        assert_eq!(record.decision, Decision::Abort);
        assert_eq!(record.outstanding, record.participants);
    }

    #[test]
    fn test_update_unknown_txn_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = CoordinatorLog::open(dir.path()).unwrap();
        assert!(!log.update(TxnId::new(99), |_| {}).unwrap());
    }
}
