//! # Block Sync Handler
//!
//! Applies confirmed blocks pushed by leaders to the shard mirrors, then
//! settles pending cross-shard transactions.
//!
//! Each block is applied under the mirror lock in one step, so the
//! accumulator sees it either fully or not at all. Pending confirmation runs
//! after the mirror lock is released.

use shared_types::{Block, ShardId};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::pending::PendingCrossShardTracker;
use crate::domain::{BlockSyncOutcome, SharedMirrors, TxGenError, TxId};
use crate::ports::BlockSink;

/// [`BlockSink`] over the shared mirrors.
pub struct BlockSyncHandler {
    mirrors: SharedMirrors,
    pending: Option<Arc<PendingCrossShardTracker>>,
}

impl BlockSyncHandler {
    /// Handler without cross-shard tracking.
    pub fn new(mirrors: SharedMirrors) -> Self {
        Self {
            mirrors,
            pending: None,
        }
    }

    /// Also settle pending cross-shard transactions.
    pub fn with_pending(mut self, pending: Arc<PendingCrossShardTracker>) -> Self {
        self.pending = Some(pending);
        self
    }
}

impl BlockSink for BlockSyncHandler {
    fn on_blocks(&self, blocks: Vec<Block>) -> BlockSyncOutcome {
        let mut outcome = BlockSyncOutcome::default();
        let mut committed: Vec<(ShardId, Vec<TxId>)> = Vec::new();

        for block in &blocks {
            let applied = self.mirrors.lock().apply_block(block);
            match applied {
                Ok(true) => {
                    debug!(shard_id = block.shard_id, height = block.height, txs = block.transactions.len(), "Applied block");
                    outcome.applied += 1;
                    committed.push((block.shard_id, block.transactions.iter().map(|tx| tx.id).collect()));
                }
                Ok(false) => outcome.skipped += 1,
                Err(TxGenError::UnknownShard(shard_id)) => {
                    warn!(shard_id, height = block.height, "Block for unknown shard skipped");
                    outcome.skipped += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Block rejected");
                    outcome.skipped += 1;
                }
            }
        }

        if let Some(pending) = &self.pending {
            for (shard_id, tx_ids) in committed {
                for tx_id in tx_ids {
                    if let Some(tx) = pending.confirm(&tx_id, shard_id) {
                        info!(tx = %tx.short_id(), "Cross-shard tx resolved");
                        outcome.resolved.push(tx_id);
                    }
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MirrorSet;
    use shared_types::{Transaction, TxInput, TxOutput};

    fn mint(shard: ShardId, address: &str, value: u64) -> Transaction {
        Transaction::new(vec![TxInput::coinbase(shard)], vec![TxOutput::new(value, address, shard)])
    }

    #[test]
    fn test_applies_matching_and_skips_unknown() {
        let mirrors = MirrorSet::new(&[0]).into_shared();
        let handler = BlockSyncHandler::new(mirrors.clone());

        let outcome = handler.on_blocks(vec![
            Block::new(0, 1, [0; 32], vec![mint(0, "alice", 5)]),
            Block::new(4, 1, [0; 32], vec![mint(4, "bob", 5)]),
        ]);

        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.skipped, 1);
        let guard = mirrors.lock();
        assert_eq!(guard.mirror(0).unwrap().pool().balance("alice"), 5);
    }

    #[test]
    fn test_duplicate_block_skipped() {
        let mirrors = MirrorSet::new(&[0]).into_shared();
        let handler = BlockSyncHandler::new(mirrors.clone());
        let block = Block::new(0, 1, [0; 32], vec![mint(0, "alice", 5)]);

        handler.on_blocks(vec![block.clone()]);
        let outcome = handler.on_blocks(vec![block]);

        assert_eq!(outcome.skipped, 1);
        assert_eq!(mirrors.lock().mirror(0).unwrap().pool().balance("alice"), 5);
    }

    #[test]
    fn test_resolves_pending_after_both_shards() {
        let mirrors = MirrorSet::new(&[0, 1]).into_shared();
        let pending = Arc::new(PendingCrossShardTracker::new());
        let handler = BlockSyncHandler::new(mirrors).with_pending(pending.clone());

        let cross = Transaction::new(
            vec![TxInput::new([1; 32], 0, 0), TxInput::new([2; 32], 0, 1)],
            vec![TxOutput::new(1, "a", 0), TxOutput::new(2, "a", 1)],
        );
        pending.insert(cross.clone());

        let first = handler.on_blocks(vec![Block::new(0, 1, [0; 32], vec![cross.clone()])]);
        assert!(first.resolved.is_empty());
        assert_eq!(pending.len(), 1);

        let second = handler.on_blocks(vec![Block::new(1, 1, [0; 32], vec![cross.clone()])]);
        assert_eq!(second.resolved, vec![cross.id]);
        assert!(pending.is_empty());
    }
}
