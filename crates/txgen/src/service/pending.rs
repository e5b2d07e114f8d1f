//! # Pending Cross-Shard Tracker
//!
//! Cross-shard transactions broadcast by the distributor stay here until a
//! block from every shard they touch has included them.

use parking_lot::Mutex;
use shared_types::{ShardId, Transaction};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::domain::TxId;

#[derive(Debug)]
struct PendingEntry {
    tx: Transaction,
    awaiting: BTreeSet<ShardId>,
}

/// Pending cross-shard map with its own lock.
#[derive(Debug, Default)]
pub struct PendingCrossShardTracker {
    entries: Mutex<HashMap<TxId, PendingEntry>>,
}

impl PendingCrossShardTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `tx` until every shard it involves confirms it.
    pub fn insert(&self, tx: Transaction) {
        let awaiting: BTreeSet<ShardId> = tx.involved_shards().into_iter().collect();
        self.entries.lock().insert(tx.id, PendingEntry { tx, awaiting });
    }

    /// Track every transaction in `txs`.
    pub fn insert_all(&self, txs: &[Transaction]) {
        let mut entries = self.entries.lock();
        for tx in txs {
            let awaiting = tx.involved_shards().into_iter().collect();
            entries.insert(
                tx.id,
                PendingEntry {
                    tx: tx.clone(),
                    awaiting,
                },
            );
        }
    }

    /// Record that `shard_id` committed `tx_id`.
    ///
    /// Returns the transaction once no shard is left awaiting.
    pub fn confirm(&self, tx_id: &TxId, shard_id: ShardId) -> Option<Transaction> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(tx_id)?;
        entry.awaiting.remove(&shard_id);
        if !entry.awaiting.is_empty() {
            debug!(shard_id, remaining = entry.awaiting.len(), "Cross-shard tx partially confirmed");
            return None;
        }
        entries.remove(tx_id).map(|entry| entry.tx)
    }

    /// Number of unresolved transactions.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Checks if `tx_id` is still pending.
    pub fn contains(&self, tx_id: &TxId) -> bool {
        self.entries.lock().contains_key(tx_id)
    }

    /// Ids currently pending, sorted.
    pub fn snapshot_ids(&self) -> Vec<TxId> {
        let mut ids: Vec<TxId> = self.entries.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{TxInput, TxOutput};

    fn cross_tx() -> Transaction {
        Transaction::new(
            vec![TxInput::new([1; 32], 0, 0), TxInput::new([2; 32], 0, 1)],
            vec![TxOutput::new(1, "a", 0), TxOutput::new(2, "a", 1)],
        )
    }

    #[test]
    fn test_resolved_only_after_all_shards_confirm() {
        let tracker = PendingCrossShardTracker::new();
        let tx = cross_tx();
        tracker.insert(tx.clone());

        assert!(tracker.confirm(&tx.id, 0).is_none());
        assert!(tracker.contains(&tx.id));
        assert_eq!(tracker.confirm(&tx.id, 1), Some(tx.clone()));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_confirm_by_uninvolved_shard_is_noop() {
        let tracker = PendingCrossShardTracker::new();
        let tx = cross_tx();
        tracker.insert(tx.clone());

        assert!(tracker.confirm(&tx.id, 7).is_none());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_unknown_id() {
        let tracker = PendingCrossShardTracker::new();
        assert!(tracker.confirm(&[9; 32], 0).is_none());
    }

    #[test]
    fn test_insert_all_and_snapshot() {
        let tracker = PendingCrossShardTracker::new();
        let a = cross_tx();
        let b = Transaction::new(vec![TxInput::new([3; 32], 0, 0)], vec![TxOutput::new(1, "b", 2)]);
        tracker.insert_all(&[a.clone(), b.clone()]);

        let mut expected = vec![a.id, b.id];
        expected.sort_unstable();
        assert_eq!(tracker.snapshot_ids(), expected);
    }
}
