//! # Batch Accumulator
//!
//! Fills one batch for one shard from the reference ledger, interleaving
//! cross-shard transactions built from the mirrors when enabled.
//!
//! ## Policy
//!
//! For every free slot:
//! 1. If cross-shard mode is on and the RNG roll is below the ratio, try to
//!    reserve a [`CrossShardPair`](crate::domain::CrossShardPair) from the
//!    mirror index.
//! 2. Otherwise (or if no address qualifies) synthesize the next ledger record.
//!
//! The mirror lock is held for the whole call, so block sync never interleaves
//! with a partially built batch.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_types::ShardId;
use tracing::{debug, warn};

use super::cross_shard::build_cross_shard_tx;
use super::synthesizer::synthesize;
use crate::domain::{Batch, GeneratorSettings, LedgerError, SharedMirrors, TxGenError};
use crate::ports::{AddressDecoder, GeneratorApi, LedgerSource};

/// Everything the accumulator needs between ticks.
///
/// Owns the ledger cursor; only the distributor task drives it.
pub struct GeneratorContext {
    ledger: Box<dyn LedgerSource>,
    decoder: Box<dyn AddressDecoder>,
    rng: StdRng,
    settings: GeneratorSettings,
    mirrors: SharedMirrors,
    exhausted_logged: bool,
}

impl GeneratorContext {
    /// Create a context. With no `seed` the RNG is seeded from OS entropy.
    pub fn new(
        ledger: Box<dyn LedgerSource>,
        decoder: Box<dyn AddressDecoder>,
        settings: GeneratorSettings,
        mirrors: SharedMirrors,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            ledger,
            decoder,
            rng,
            settings,
            mirrors,
            exhausted_logged: false,
        }
    }

    /// Mirrors shared with block sync.
    pub fn mirrors(&self) -> &SharedMirrors {
        &self.mirrors
    }

    /// Returns true once the ledger has reported exhaustion.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted_logged
    }

    fn roll_cross_shard(&mut self) -> bool {
        self.settings.cross_shard && self.rng.gen::<f64>() < self.settings.cross_shard_ratio
    }
}

impl GeneratorApi for GeneratorContext {
    fn generate(&mut self, shard_id: ShardId) -> Result<Batch, TxGenError> {
        accumulate(self, shard_id)
    }

    fn shard_ids(&self) -> Vec<ShardId> {
        self.mirrors.lock().shard_ids()
    }
}

/// Accumulate up to `max_num_txs_per_batch` transactions for `shard_id`.
///
/// A short or empty batch means the ledger ran out.
pub fn accumulate(ctx: &mut GeneratorContext, shard_id: ShardId) -> Result<Batch, TxGenError> {
    let max = ctx.settings.max_num_txs_per_batch;
    let mirrors = ctx.mirrors.clone();
    let mut guard = mirrors.lock();
    if !guard.contains(shard_id) {
        return Err(TxGenError::UnknownShard(shard_id));
    }

    let mut batch = Batch::default();
    while batch.len() < max {
        if ctx.roll_cross_shard() {
            if let Some(pair) = guard.take_cross_shard_pair(shard_id) {
                batch.cross_shard.push(build_cross_shard_tx(&pair));
                continue;
            }
        }

        let record = match ctx.ledger.next_tx() {
            Ok(record) => record,
            Err(LedgerError::Exhausted) => {
                if !ctx.exhausted_logged {
                    warn!(shard_id, "Reference ledger exhausted, batches will be short");
                    ctx.exhausted_logged = true;
                }
                break;
            }
            Err(e) => {
                warn!(shard_id, error = %e, "Ledger read failed");
                break;
            }
        };

        match synthesize(&record, shard_id, ctx.decoder.as_ref()) {
            Ok(tx) => batch.single_shard.push(tx),
            Err(e) => warn!(shard_id, error = %e, "Skipping ledger record"),
        }
    }
    let candidates = guard.index().candidate_count();
    drop(guard);

    debug!(
        shard_id,
        single = batch.single_shard.len(),
        cross = batch.cross_shard.len(),
        candidates,
        "Batch accumulated"
    );
    Ok(batch)
}
