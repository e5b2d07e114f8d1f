//! # Inbound Ports
//!
//! What the generator can do, and what it accepts from the outside:
//! batch generation driven by the distributor, and confirmed blocks pushed by
//! shard leaders to the client endpoint.

use shared_types::{Block, ShardId};

use crate::domain::{Batch, BlockSyncOutcome, TxGenError};

/// Generator API - inbound port.
pub trait GeneratorApi: Send {
    /// Produce the next batch for `shard_id`.
    fn generate(&mut self, shard_id: ShardId) -> Result<Batch, TxGenError>;

    /// Shards this generator produces for, in configured order.
    fn shard_ids(&self) -> Vec<ShardId>;
}

/// Receiver for newly confirmed blocks.
///
/// Invoked from the client server task, concurrently with generation.
pub trait BlockSink: Send + Sync {
    /// Apply `blocks` to local state.
    fn on_blocks(&self, blocks: Vec<Block>) -> BlockSyncOutcome;
}
