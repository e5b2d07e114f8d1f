//! # Domain Value Objects
//!
//! Immutable value types for the generator.

use super::errors::TxId;
use shared_types::ShardId;

/// Distributor control-loop state machine.
///
/// ```text
/// [RUNNING] ──elapsed >= duration──→ [STOPPING] ──stop sent──→ [STOPPED]
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DistributorState {
    /// Generating and sending batches every tick.
    #[default]
    Running,
    /// Run duration elapsed; stop broadcast in flight.
    Stopping,
    /// Stop broadcast flushed. No further batches.
    Stopped,
}

impl DistributorState {
    /// Check if transition to next state is valid.
    pub fn can_transition_to(&self, next: DistributorState) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Stopping) | (Self::Stopping, Self::Stopped)
        )
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// An unspent output held by a shard mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtxoRef {
    /// Creating transaction.
    pub tx_id: TxId,
    /// Output index within that transaction.
    pub index: i32,
    /// Output value.
    pub value: u64,
}

/// Two unspent outputs owned by the same address on different shards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrossShardPair {
    /// Owning address.
    pub address: String,
    /// Shard the batch is being generated for.
    pub local_shard: ShardId,
    /// Output on the local shard.
    pub local: UtxoRef,
    /// The other shard.
    pub remote_shard: ShardId,
    /// Output on the remote shard.
    pub remote: UtxoRef,
}

/// Point-in-time delivery counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliverySnapshot {
    /// Unicast payloads accepted into a peer queue.
    pub unicasts: u64,
    /// Broadcast operations issued.
    pub broadcasts: u64,
    /// Sends that completed.
    pub sent: u64,
    /// Sends that returned an error.
    pub failed: u64,
    /// Sends that exceeded the send timeout.
    pub timed_out: u64,
    /// Payloads dropped because a peer queue was full.
    pub dropped: u64,
}

/// Result of one Block Sync Handler invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockSyncOutcome {
    /// Blocks applied to a mirror.
    pub applied: usize,
    /// Blocks with no matching mirror, or already applied.
    pub skipped: usize,
    /// Pending cross-shard transactions resolved by these blocks.
    pub resolved: Vec<TxId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distributor_running_to_stopping() {
        assert!(DistributorState::Running.can_transition_to(DistributorState::Stopping));
    }

    #[test]
    fn test_distributor_stopping_to_stopped() {
        assert!(DistributorState::Stopping.can_transition_to(DistributorState::Stopped));
    }

    #[test]
    fn test_distributor_invalid_transitions() {
        assert!(!DistributorState::Running.can_transition_to(DistributorState::Stopped));
        assert!(!DistributorState::Stopped.can_transition_to(DistributorState::Running));
        assert!(!DistributorState::Stopping.can_transition_to(DistributorState::Running));
    }

    #[test]
    fn test_distributor_terminal() {
        assert!(DistributorState::Stopped.is_terminal());
        assert!(!DistributorState::Running.is_terminal());
    }

    #[test]
    fn test_utxo_ref_ordering() {
        let a = UtxoRef { tx_id: [1; 32], index: 0, value: 9 };
        let b = UtxoRef { tx_id: [1; 32], index: 1, value: 1 };
        assert!(a < b);
    }
}
