//! # Cross-Shard Construction
//!
//! Builds the correlated transaction for a selected [`CrossShardPair`]:
//!
//! ```text
//! inputs:  (local outpoint, local shard)   (remote outpoint, remote shard)
//! outputs: (local value, addr, local shard) (remote value, addr, remote shard)
//! ```
//!
//! Each shard receives back exactly what it contributes, so the transaction
//! is balanced per shard.

use shared_types::{Transaction, TxInput, TxOutput};

use crate::domain::CrossShardPair;

/// Transaction spending both halves of `pair` back to the same address.
pub fn build_cross_shard_tx(pair: &CrossShardPair) -> Transaction {
    let inputs = vec![
        TxInput::new(pair.local.tx_id, pair.local.index, pair.local_shard),
        TxInput::new(pair.remote.tx_id, pair.remote.index, pair.remote_shard),
    ];
    let outputs = vec![
        TxOutput::new(pair.local.value, pair.address.clone(), pair.local_shard),
        TxOutput::new(pair.remote.value, pair.address.clone(), pair.remote_shard),
    ];
    Transaction::new(inputs, outputs)
}
