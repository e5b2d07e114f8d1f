//! # Service Layer
//!
//! Long-running pieces: the distribution loop, block sync and the pending
//! cross-shard tracker.

pub mod block_sync;
pub mod distributor;
pub mod pending;

pub use block_sync::BlockSyncHandler;
pub use distributor::{Distributor, RunTiming};
pub use pending::PendingCrossShardTracker;
