//! # TxGen
//!
//! Synthetic-load transaction generator for a sharded ledger harness.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Replays transactions from a reference ledger (Bitcoin block files) as
//! harness transactions, partitions them across shards and ships batches to
//! the shard leaders under test:
//! - Record-to-transaction synthesis with per-output address decoding
//! - Batch accumulation with cross-shard staging from mirrored UTXO pools
//! - Timed fire-and-forget distribution with a final stop broadcast
//! - Pending cross-shard tracking fed by confirmed blocks
//!
//! ## Module Structure
//!
//! ```text
//! txgen/
//! ├── domain/          # Entities, errors, shard mirrors, invariants
//! ├── algorithms/      # Synthesizer, accumulator, cross-shard construction
//! ├── ports/           # API traits + dependency traits
//! ├── adapters/        # Bitcoin ledger, TCP transport, dispatcher, config
//! └── service/         # Distributor, block sync, pending tracker
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{
    load_config, BitcoinAddressDecoder, BitcoinBlockFileLedger, ClientServer, DispatchSettings,
    Dispatcher, GeneratorConfig, LedgerNetwork, TcpTransport,
};
pub use algorithms::{accumulate, build_cross_shard_tx, synthesize, GeneratorContext};
pub use domain::{
    Batch, BlockSyncOutcome, ConfigError, CrossShardPair, DecodeError, DeliverySnapshot,
    DistributorState, GeneratorSettings, LedgerError, LedgerRecord, MirrorSet, OutPointRef,
    RawOutput, RunReport, SharedMirrors, TransportError, TxGenError,
};
pub use ports::{
    AddressDecoder, BlockSink, GeneratorApi, LedgerSource, MockAddressDecoder, RecordingTransport,
    Transport, VecLedger,
};
pub use service::{BlockSyncHandler, Distributor, PendingCrossShardTracker, RunTiming};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
