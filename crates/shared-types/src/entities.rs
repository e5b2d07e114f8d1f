//! # Core Harness Entities
//!
//! Transactions and blocks as they travel between the generator and the
//! shard leaders under test.
//!
//! ## Clusters
//!
//! - **Chain**: `Transaction`, `TxInput`, `TxOutput`, `Block`
//! - **Networking**: `Peer`, `PeerRole`

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// Content-derived transaction identifier.
pub type TxId = [u8; 32];

/// Logical shard identifier.
pub type ShardId = u32;

/// Previous-transaction id carried by a coinbase input.
pub const COINBASE_PREV_TX_ID: TxId = [0u8; 32];

/// Previous-output index carried by a coinbase input ("newly minted").
pub const COINBASE_OUTPUT_INDEX: i32 = -1;

/// A reference to a previous output being spent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxInput {
    /// Identifier of the transaction that created the output.
    pub prev_tx_id: TxId,
    /// Index of the output within that transaction, `-1` for coinbase.
    pub prev_output_index: i32,
    /// Unlock credential. Always empty; authorization is not exercised.
    pub unlock: Vec<u8>,
    /// Shard the spent output lives in.
    pub shard_id: ShardId,
}

impl TxInput {
    /// Spend of `(prev_tx_id, prev_output_index)` on `shard_id`.
    pub fn new(prev_tx_id: TxId, prev_output_index: i32, shard_id: ShardId) -> Self {
        Self {
            prev_tx_id,
            prev_output_index,
            unlock: Vec::new(),
            shard_id,
        }
    }

    /// Sentinel input for newly minted value.
    pub fn coinbase(shard_id: ShardId) -> Self {
        Self::new(COINBASE_PREV_TX_ID, COINBASE_OUTPUT_INDEX, shard_id)
    }

    /// Returns true if this is the coinbase sentinel.
    pub fn is_coinbase(&self) -> bool {
        self.prev_tx_id == COINBASE_PREV_TX_ID && self.prev_output_index == COINBASE_OUTPUT_INDEX
    }
}

/// A value assigned to an address on a shard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxOutput {
    /// Amount in base units.
    pub value: u64,
    /// Destination address, as decoded from the source ledger script.
    pub address: String,
    /// Destination shard.
    pub shard_id: ShardId,
}

impl TxOutput {
    /// Create a new output.
    pub fn new(value: u64, address: impl Into<String>, shard_id: ShardId) -> Self {
        Self {
            value,
            address: address.into(),
            shard_id,
        }
    }
}

/// A harness transaction.
///
/// The id is derived from the input and output sets, so two transactions
/// built from byte-identical sets share the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Content-derived identifier (see [`Transaction::compute_id`]).
    pub id: TxId,
    /// Ordered inputs.
    pub inputs: Vec<TxInput>,
    /// Ordered outputs.
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Build a transaction and assign its id.
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        let mut tx = Self {
            id: [0u8; 32],
            inputs,
            outputs,
        };
        tx.id = tx.compute_id();
        tx
    }

    /// SHA-256 over the bincode encoding of `(inputs, outputs)`.
    pub fn compute_id(&self) -> TxId {
        let mut hasher = Sha256::new();
        // Vec/struct encodings are infallible for these field types.
        let encoded = bincode::serialize(&(&self.inputs, &self.outputs)).unwrap_or_default();
        hasher.update(&encoded);
        hasher.finalize().into()
    }

    /// Returns true if the only input is the coinbase sentinel.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    /// Distinct shard ids touched by any input or output, ascending.
    pub fn involved_shards(&self) -> Vec<ShardId> {
        let mut shards: Vec<ShardId> = self
            .inputs
            .iter()
            .map(|i| i.shard_id)
            .chain(self.outputs.iter().map(|o| o.shard_id))
            .collect();
        shards.sort_unstable();
        shards.dedup();
        shards
    }

    /// Returns true if the transaction spans more than one shard.
    pub fn is_cross_shard(&self) -> bool {
        self.involved_shards().len() > 1
    }

    /// Short hex form of the id for log lines.
    pub fn short_id(&self) -> String {
        hex::encode(&self.id[..4])
    }
}

/// A block committed by a shard leader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Shard that committed the block.
    pub shard_id: ShardId,
    /// Height within the shard chain.
    pub height: u64,
    /// Hash of the parent block.
    pub prev_hash: Hash,
    /// Hash of this block.
    pub hash: Hash,
    /// Committed transactions, in order.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Build a block, hashing the parent hash and transaction ids.
    pub fn new(shard_id: ShardId, height: u64, prev_hash: Hash, transactions: Vec<Transaction>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(shard_id.to_be_bytes());
        hasher.update(height.to_be_bytes());
        hasher.update(prev_hash);
        for tx in &transactions {
            hasher.update(tx.id);
        }
        Self {
            shard_id,
            height,
            prev_hash,
            hash: hasher.finalize().into(),
            transactions,
        }
    }
}

// =============================================================================
// CLUSTER B: NETWORKING
// =============================================================================

/// Role a peer plays in the harness topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerRole {
    /// Orders and commits transactions for one shard.
    Leader,
    /// Participates in a shard's consensus group.
    Validator,
    /// The transaction generator's own listening endpoint.
    Client,
}

impl std::str::FromStr for PeerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leader" => Ok(Self::Leader),
            "validator" => Ok(Self::Validator),
            "client" => Ok(Self::Client),
            other => Err(format!("unknown peer role: {other}")),
        }
    }
}

/// A network endpoint in the harness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    /// IP address or host name.
    pub ip: String,
    /// TCP port.
    pub port: u16,
    /// Role in the topology.
    pub role: PeerRole,
    /// Shard the peer belongs to.
    pub shard_id: ShardId,
}

impl Peer {
    /// `ip:port` form used for dialing.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}
