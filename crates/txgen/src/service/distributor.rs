//! # Distributor
//!
//! Timed loop that ships batches to shard leaders.
//!
//! ## Per Tick
//!
//! 1. For each leader in configured order: accumulate a batch for its shard
//!    and unicast the single-shard part.
//! 2. Record the collected cross-shard transactions as pending, then
//!    broadcast them to all leaders.
//!
//! ## Lifecycle
//!
//! ```text
//! [RUNNING] ──elapsed >= run_duration──→ [STOPPING] ──stop flushed──→ [STOPPED]
//! ```
//!
//! Ticks are paced by `tokio::time::interval`, so generation cost does not
//! stretch the period.

use shared_types::{construct_stop_message, construct_transaction_list_message, Peer, Transaction};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::pending::PendingCrossShardTracker;
use crate::adapters::Dispatcher;
use crate::domain::{DistributorState, RunReport, TxGenError};
use crate::ports::GeneratorApi;

/// Run pacing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunTiming {
    /// Total time from the first tick to the stop broadcast.
    pub run_duration: Duration,
    /// Tick period.
    pub tick_interval: Duration,
    /// Wait before the first tick.
    pub startup_delay: Duration,
}

impl Default for RunTiming {
    fn default() -> Self {
        Self {
            run_duration: Duration::from_secs(300),
            tick_interval: Duration::from_millis(500),
            startup_delay: Duration::from_secs(10),
        }
    }
}

/// The distribution loop.
pub struct Distributor {
    generator: Box<dyn GeneratorApi>,
    leaders: Vec<Peer>,
    validators: Vec<Peer>,
    dispatcher: Dispatcher,
    pending: Option<Arc<PendingCrossShardTracker>>,
    timing: RunTiming,
    state: DistributorState,
}

impl Distributor {
    /// Create a distributor over `leaders` (visited in the given order).
    pub fn new(
        generator: Box<dyn GeneratorApi>,
        leaders: Vec<Peer>,
        validators: Vec<Peer>,
        dispatcher: Dispatcher,
        timing: RunTiming,
    ) -> Self {
        Self {
            generator,
            leaders,
            validators,
            dispatcher,
            pending: None,
            timing,
            state: DistributorState::Running,
        }
    }

    /// Record broadcast cross-shard transactions in `pending`.
    pub fn with_pending(mut self, pending: Arc<PendingCrossShardTracker>) -> Self {
        self.pending = Some(pending);
        self
    }

    /// Current state.
    pub fn state(&self) -> DistributorState {
        self.state
    }

    /// Run until the run duration elapses, then broadcast stop.
    ///
    /// Fails up front if a leader's shard has no generator mirror.
    pub async fn run(mut self) -> Result<RunReport, TxGenError> {
        let known = self.generator.shard_ids();
        if let Some(leader) = self.leaders.iter().find(|l| !known.contains(&l.shard_id)) {
            return Err(TxGenError::UnknownShard(leader.shard_id));
        }

        let mut report = RunReport {
            shards: self.leaders.iter().map(|l| l.shard_id).collect(),
            ..Default::default()
        };

        if !self.timing.startup_delay.is_zero() {
            info!(delay_secs = self.timing.startup_delay.as_secs(), "Waiting for nodes to start");
            tokio::time::sleep(self.timing.startup_delay).await;
        }

        info!(
            leaders = self.leaders.len(),
            duration_secs = self.timing.run_duration.as_secs(),
            tick_ms = self.timing.tick_interval.as_millis() as u64,
            "Distributor started"
        );

        let start = Instant::now();
        let mut interval = tokio::time::interval(self.timing.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if start.elapsed() >= self.timing.run_duration {
                break;
            }
            self.tick(&mut report);
        }

        self.transition(DistributorState::Stopping);
        let stop = construct_stop_message()?;
        let targets = self.stop_targets();
        info!(peers = targets.len(), "Run finished, sending stop");
        self.dispatcher.broadcast_final(&targets, stop).await;
        report.delivery = self.dispatcher.shutdown().await;
        self.transition(DistributorState::Stopped);

        info!(
            ticks = report.ticks,
            single_shard_txs = report.single_shard_txs,
            cross_shard_txs = report.cross_shard_txs,
            sent = report.delivery.sent,
            failed = report.delivery.failed,
            dropped = report.delivery.dropped,
            "Distributor stopped"
        );
        Ok(report)
    }

    fn tick(&mut self, report: &mut RunReport) {
        let mut cross: Vec<Transaction> = Vec::new();

        for leader in &self.leaders {
            let batch = match self.generator.generate(leader.shard_id) {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(shard_id = leader.shard_id, error = %e, "Batch generation failed");
                    continue;
                }
            };

            match construct_transaction_list_message(&batch.single_shard) {
                Ok(payload) => {
                    debug!(leader = %leader, txs = batch.single_shard.len(), "Sending batch");
                    self.dispatcher.unicast(leader, payload);
                    report.single_shard_txs += batch.single_shard.len() as u64;
                }
                Err(e) => warn!(leader = %leader, error = %e, "Failed to encode batch"),
            }
            cross.extend(batch.cross_shard);
        }

        if !cross.is_empty() {
            match construct_transaction_list_message(&cross) {
                Ok(payload) => {
                    // Tracked before any worker can deliver it.
                    if let Some(pending) = &self.pending {
                        pending.insert_all(&cross);
                    }
                    debug!(txs = cross.len(), "Broadcasting cross-shard transactions");
                    self.dispatcher.broadcast(&self.leaders, payload);
                    report.cross_shard_txs += cross.len() as u64;
                }
                Err(e) => warn!(error = %e, "Failed to encode cross-shard batch"),
            }
        }

        report.ticks += 1;
    }

    /// Validators then leaders, each endpoint once.
    fn stop_targets(&self) -> Vec<Peer> {
        let mut seen = HashSet::new();
        self.validators
            .iter()
            .chain(self.leaders.iter())
            .filter(|peer| seen.insert(peer.endpoint()))
            .cloned()
            .collect()
    }

    fn transition(&mut self, next: DistributorState) {
        if self.state.can_transition_to(next) {
            debug!(from = ?self.state, to = ?next, "Distributor state change");
            self.state = next;
        } else {
            warn!(from = ?self.state, to = ?next, "Invalid distributor transition ignored");
        }
    }
}
