//! # Shard Mirrors
//!
//! Local per-shard view of committed ledger state (UTXO pools), plus the
//! address index used for cross-shard selection.
//!
//! ## Layout
//!
//! ```text
//! UtxoPool:         address -> tx id -> output index -> value
//! CrossShardIndex:  address -> shard id -> {unspent outputs}
//! ```
//!
//! ## Locking
//!
//! All mirrors and the index live in one `MirrorSet` behind a single
//! `parking_lot::Mutex` (`SharedMirrors`). The accumulator and the block sync
//! handler both hold it for the whole of their access, so a block is always
//! observed either fully applied or not at all.

use parking_lot::Mutex;
use shared_types::{Block, Hash, ShardId, Transaction};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use super::errors::{TxGenError, TxId};
use super::value_objects::{CrossShardPair, UtxoRef};

/// Mirror set shared between the generator and the block sync handler.
pub type SharedMirrors = Arc<Mutex<MirrorSet>>;

/// A single change to a pool, in application order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolEvent {
    /// An output became unspent.
    Created(String, UtxoRef),
    /// An unspent output was consumed.
    Spent(String, UtxoRef),
}

/// Unspent outputs of one shard.
#[derive(Clone, Debug, Default)]
pub struct UtxoPool {
    shard_id: ShardId,
    utxos: BTreeMap<String, BTreeMap<TxId, BTreeMap<i32, u64>>>,
    /// Reverse index so inputs can be resolved to their owner.
    owners: HashMap<(TxId, i32), String>,
}

impl UtxoPool {
    /// Create an empty pool for `shard_id`.
    pub fn new(shard_id: ShardId) -> Self {
        Self {
            shard_id,
            utxos: BTreeMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Shard this pool mirrors.
    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    /// Number of unspent outputs.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Returns true if there are no unspent outputs.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Checks if an outpoint is unspent.
    pub fn contains(&self, tx_id: &TxId, index: i32) -> bool {
        self.owners.contains_key(&(*tx_id, index))
    }

    /// Sum of unspent values owned by `address`.
    pub fn balance(&self, address: &str) -> u64 {
        self.utxos
            .get(address)
            .map(|by_tx| by_tx.values().flat_map(|outs| outs.values()).sum())
            .unwrap_or(0)
    }

    /// Unspent outputs owned by `address`.
    pub fn outputs_of(&self, address: &str) -> Vec<UtxoRef> {
        let Some(by_tx) = self.utxos.get(address) else {
            return Vec::new();
        };
        by_tx
            .iter()
            .flat_map(|(tx_id, outs)| {
                outs.iter().map(move |(index, value)| UtxoRef {
                    tx_id: *tx_id,
                    index: *index,
                    value: *value,
                })
            })
            .collect()
    }

    /// Apply the part of `tx` that touches this shard.
    ///
    /// Inputs tagged with this shard consume their outpoint (unknown
    /// outpoints are ignored). Outputs tagged with this shard are added.
    pub fn apply_transaction(&mut self, tx: &Transaction) -> Vec<PoolEvent> {
        let mut events = Vec::new();

        for input in &tx.inputs {
            if input.shard_id != self.shard_id || input.is_coinbase() {
                continue;
            }
            if let Some((address, utxo)) = self.remove(&input.prev_tx_id, input.prev_output_index) {
                events.push(PoolEvent::Spent(address, utxo));
            }
        }

        for (i, output) in tx.outputs.iter().enumerate() {
            if output.shard_id != self.shard_id {
                continue;
            }
            let Ok(index) = i32::try_from(i) else {
                break;
            };
            let utxo = UtxoRef {
                tx_id: tx.id,
                index,
                value: output.value,
            };
            self.insert(&output.address, utxo);
            events.push(PoolEvent::Created(output.address.clone(), utxo));
        }

        events
    }

    fn insert(&mut self, address: &str, utxo: UtxoRef) {
        self.utxos
            .entry(address.to_string())
            .or_default()
            .entry(utxo.tx_id)
            .or_default()
            .insert(utxo.index, utxo.value);
        self.owners.insert((utxo.tx_id, utxo.index), address.to_string());
    }

    fn remove(&mut self, tx_id: &TxId, index: i32) -> Option<(String, UtxoRef)> {
        let address = self.owners.remove(&(*tx_id, index))?;
        let by_tx = self.utxos.get_mut(&address)?;
        let outputs = by_tx.get_mut(tx_id)?;
        let value = outputs.remove(&index)?;
        if outputs.is_empty() {
            by_tx.remove(tx_id);
        }
        if by_tx.is_empty() {
            self.utxos.remove(&address);
        }
        Some((
            address,
            UtxoRef {
                tx_id: *tx_id,
                index,
                value,
            },
        ))
    }
}

/// Mirror of one shard's committed chain.
#[derive(Clone, Debug)]
pub struct ShardMirror {
    shard_id: ShardId,
    pool: UtxoPool,
    height: u64,
    tip: Hash,
    applied: HashSet<Hash>,
}

impl ShardMirror {
    /// Empty mirror for `shard_id`.
    pub fn new(shard_id: ShardId) -> Self {
        Self {
            shard_id,
            pool: UtxoPool::new(shard_id),
            height: 0,
            tip: [0u8; 32],
            applied: HashSet::new(),
        }
    }

    /// Shard id of this mirror.
    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    /// The mirrored UTXO pool.
    pub fn pool(&self) -> &UtxoPool {
        &self.pool
    }

    /// Highest block height applied.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Hash of the highest block applied.
    pub fn tip(&self) -> Hash {
        self.tip
    }

    /// Number of distinct blocks applied.
    pub fn blocks_applied(&self) -> usize {
        self.applied.len()
    }

    /// Apply every transaction of `block`.
    ///
    /// Returns `None` if the block was already applied.
    pub fn apply_block(&mut self, block: &Block) -> Option<Vec<PoolEvent>> {
        if !self.applied.insert(block.hash) {
            return None;
        }

        let events: Vec<PoolEvent> = block
            .transactions
            .iter()
            .flat_map(|tx| self.pool.apply_transaction(tx))
            .collect();

        if self.applied.len() == 1 || block.height >= self.height {
            self.height = block.height;
            self.tip = block.hash;
        }

        Some(events)
    }
}

/// address -> shard -> unspent outputs still available for cross-shard selection.
///
/// Selection only reserves: a taken output leaves the index but stays in its
/// pool until a committed block spends it.
#[derive(Clone, Debug, Default)]
pub struct CrossShardIndex {
    by_address: BTreeMap<String, BTreeMap<ShardId, BTreeSet<UtxoRef>>>,
    /// Addresses with outputs on at least two shards.
    candidates: BTreeSet<String>,
}

impl CrossShardIndex {
    /// Record an unspent output.
    pub fn insert(&mut self, address: &str, shard_id: ShardId, utxo: UtxoRef) {
        self.by_address
            .entry(address.to_string())
            .or_default()
            .entry(shard_id)
            .or_default()
            .insert(utxo);
        self.refresh(address);
    }

    /// Forget an outpoint. Returns true if it was present.
    pub fn remove(&mut self, address: &str, shard_id: ShardId, utxo: &UtxoRef) -> bool {
        let Some(shards) = self.by_address.get_mut(address) else {
            return false;
        };
        let Some(set) = shards.get_mut(&shard_id) else {
            return false;
        };
        let removed = set.remove(utxo);
        if set.is_empty() {
            shards.remove(&shard_id);
        }
        if shards.is_empty() {
            self.by_address.remove(address);
        }
        self.refresh(address);
        removed
    }

    /// Number of indexed outputs.
    pub fn len(&self) -> usize {
        self.by_address
            .values()
            .flat_map(|shards| shards.values())
            .map(BTreeSet::len)
            .sum()
    }

    /// Returns true if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }

    /// Number of addresses currently spanning two or more shards.
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Select and remove one output on `local_shard` and one on another
    /// shard, both owned by the same address.
    ///
    /// Only addresses spanning two or more shards are scanned, in order;
    /// the first one present on `local_shard` wins.
    pub fn take_pair(&mut self, local_shard: ShardId) -> Option<CrossShardPair> {
        let (address, remote_shard) = self.candidates.iter().find_map(|address| {
            let shards = self.by_address.get(address)?;
            if !shards.contains_key(&local_shard) {
                return None;
            }
            shards
                .keys()
                .find(|shard| **shard != local_shard)
                .map(|shard| (address.clone(), *shard))
        })?;

        let local = self.pop_first(&address, local_shard)?;
        let remote = self.pop_first(&address, remote_shard)?;
        self.refresh(&address);

        Some(CrossShardPair {
            address,
            local_shard,
            local,
            remote_shard,
            remote,
        })
    }

    fn pop_first(&mut self, address: &str, shard_id: ShardId) -> Option<UtxoRef> {
        let shards = self.by_address.get_mut(address)?;
        let set = shards.get_mut(&shard_id)?;
        let utxo = set.pop_first()?;
        if set.is_empty() {
            shards.remove(&shard_id);
        }
        if shards.is_empty() {
            self.by_address.remove(address);
        }
        Some(utxo)
    }

    /// Empty per-shard sets are always pruned, so the map length is the
    /// number of shards holding outputs for `address`.
    fn refresh(&mut self, address: &str) {
        let spans = self
            .by_address
            .get(address)
            .is_some_and(|shards| shards.len() >= 2);
        if spans {
            self.candidates.insert(address.to_string());
        } else {
            self.candidates.remove(address);
        }
    }
}

/// All shard mirrors of a run plus the cross-shard index.
#[derive(Clone, Debug, Default)]
pub struct MirrorSet {
    mirrors: Vec<ShardMirror>,
    index: CrossShardIndex,
}

impl MirrorSet {
    /// One empty mirror per shard id, in the given order.
    pub fn new(shard_ids: &[ShardId]) -> Self {
        Self {
            mirrors: shard_ids.iter().map(|id| ShardMirror::new(*id)).collect(),
            index: CrossShardIndex::default(),
        }
    }

    /// Wrap in the shared lock.
    pub fn into_shared(self) -> SharedMirrors {
        Arc::new(Mutex::new(self))
    }

    /// Shard ids in configured order.
    pub fn shard_ids(&self) -> Vec<ShardId> {
        self.mirrors.iter().map(ShardMirror::shard_id).collect()
    }

    /// Checks if a mirror exists for `shard_id`.
    pub fn contains(&self, shard_id: ShardId) -> bool {
        self.mirror(shard_id).is_some()
    }

    /// Mirror for `shard_id`.
    pub fn mirror(&self, shard_id: ShardId) -> Option<&ShardMirror> {
        self.mirrors.iter().find(|m| m.shard_id() == shard_id)
    }

    /// The cross-shard selection index.
    pub fn index(&self) -> &CrossShardIndex {
        &self.index
    }

    /// Apply `block` to the mirror with the matching shard id.
    ///
    /// Returns `Ok(false)` for an already-applied block.
    pub fn apply_block(&mut self, block: &Block) -> Result<bool, TxGenError> {
        let mirror = self
            .mirrors
            .iter_mut()
            .find(|m| m.shard_id() == block.shard_id)
            .ok_or(TxGenError::UnknownShard(block.shard_id))?;

        let Some(events) = mirror.apply_block(block) else {
            debug!(shard_id = block.shard_id, height = block.height, "Block already applied");
            return Ok(false);
        };

        for event in events {
            match event {
                PoolEvent::Created(address, utxo) => {
                    self.index.insert(&address, block.shard_id, utxo);
                }
                PoolEvent::Spent(address, utxo) => {
                    self.index.remove(&address, block.shard_id, &utxo);
                }
            }
        }

        Ok(true)
    }

    /// Reserve a cross-shard pair for `local_shard` (see [`CrossShardIndex::take_pair`]).
    pub fn take_cross_shard_pair(&mut self, local_shard: ShardId) -> Option<CrossShardPair> {
        self.index.take_pair(local_shard)
    }
}
