//! # Domain Entities
//!
//! Ledger records as read from the reference ledger, generator settings,
//! and the batch produced per leader per tick.

use shared_types::{ShardId, Transaction};

use super::errors::TxId;
use super::value_objects::DeliverySnapshot;

/// A previous output referenced by a ledger record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutPointRef {
    /// Originating transaction id.
    pub txid: TxId,
    /// Index within that transaction.
    pub vout: u32,
}

/// An output declared by a ledger record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawOutput {
    /// Value in base units.
    pub value: u64,
    /// Locking script bytes.
    pub script: Vec<u8>,
}

/// One raw transaction from the reference ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerRecord {
    /// Mints new value; `inputs` is ignored when set.
    pub coinbase: bool,
    /// Spent outputs.
    pub inputs: Vec<OutPointRef>,
    /// Declared outputs.
    pub outputs: Vec<RawOutput>,
}

impl LedgerRecord {
    /// Coinbase record paying `outputs`.
    pub fn coinbase(outputs: Vec<RawOutput>) -> Self {
        Self {
            coinbase: true,
            inputs: Vec::new(),
            outputs,
        }
    }

    /// Spend record.
    pub fn spend(inputs: Vec<OutPointRef>, outputs: Vec<RawOutput>) -> Self {
        Self {
            coinbase: false,
            inputs,
            outputs,
        }
    }

    /// Returns true if the record mints new value.
    pub fn is_coinbase(&self) -> bool {
        self.coinbase
    }
}

/// Batch-generation policy.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorSettings {
    /// Upper bound on transactions (single + cross) per accumulation.
    pub max_num_txs_per_batch: usize,
    /// Cross-shard staging enabled (more than one shard configured).
    pub cross_shard: bool,
    /// Probability that a slot attempts cross-shard selection.
    pub cross_shard_ratio: f64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            max_num_txs_per_batch: 100,
            cross_shard: false,
            cross_shard_ratio: 0.1,
        }
    }
}

impl GeneratorSettings {
    /// Settings for a run over `shard_count` shards.
    pub fn for_shards(max_num_txs_per_batch: usize, shard_count: usize, cross_shard_ratio: f64) -> Self {
        Self {
            max_num_txs_per_batch,
            cross_shard: shard_count > 1,
            cross_shard_ratio,
        }
    }
}

/// Output of one accumulation for one shard.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    /// Transactions confined to the target shard.
    pub single_shard: Vec<Transaction>,
    /// Transactions spanning the target shard and another.
    pub cross_shard: Vec<Transaction>,
}

impl Batch {
    /// Total transactions in the batch.
    pub fn len(&self) -> usize {
        self.single_shard.len() + self.cross_shard.len()
    }

    /// Returns true if nothing was generated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Summary returned when the distributor stops.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Ticks executed.
    pub ticks: u64,
    /// Single-shard transactions unicast.
    pub single_shard_txs: u64,
    /// Cross-shard transactions broadcast.
    pub cross_shard_txs: u64,
    /// Shards visited per tick.
    pub shards: Vec<ShardId>,
    /// Final delivery counters.
    pub delivery: DeliverySnapshot,
}
