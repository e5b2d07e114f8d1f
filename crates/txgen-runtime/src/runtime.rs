//! Wiring of one generator run.
//!
//! ## Startup Sequence
//!
//! 1. Build one shard mirror per leader shard
//! 2. Open the reference ledger
//! 3. Start the client endpoint (only if a client peer is configured)
//! 4. Run the distribution loop until the run duration elapses
//! 5. Stop the client endpoint

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

use txgen::{
    AddressDecoder, BitcoinAddressDecoder, BitcoinBlockFileLedger, BlockSyncHandler, ClientServer,
    Dispatcher, Distributor, GeneratorConfig, GeneratorContext, GeneratorSettings, LedgerSource,
    MirrorSet, PendingCrossShardTracker, RunReport, RunTiming, TcpTransport, Transport,
};

/// One configured generator run.
pub struct TxGenRuntime {
    config: GeneratorConfig,
    max_num_txs_per_batch: usize,
}

impl TxGenRuntime {
    /// Create a runtime from a validated configuration.
    pub fn new(config: GeneratorConfig, max_num_txs_per_batch: usize) -> Self {
        Self {
            config,
            max_num_txs_per_batch,
        }
    }

    /// Run against the configured block files over TCP.
    pub async fn run(self) -> Result<RunReport> {
        let ledger_cfg = &self.config.ledger;
        let ledger = BitcoinBlockFileLedger::open(&ledger_cfg.blocks_dir, ledger_cfg.network)
            .with_context(|| {
                format!("Failed to open reference ledger at {}", ledger_cfg.blocks_dir.display())
            })?;
        let decoder = BitcoinAddressDecoder::new(ledger_cfg.network.to_bitcoin());
        let transport = TcpTransport::new(self.config.dispatch_settings().send_timeout);

        self.run_with(Box::new(ledger), Box::new(decoder), Arc::new(transport))
            .await
    }

    /// Run with explicit collaborators.
    pub async fn run_with(
        self,
        ledger: Box<dyn LedgerSource>,
        decoder: Box<dyn AddressDecoder>,
        transport: Arc<dyn Transport>,
    ) -> Result<RunReport> {
        let config = self.config;
        let shard_ids = config.shard_ids();
        info!("===========================================");
        info!("  TxGen v{}", txgen::VERSION);
        info!("  Shards: {:?}", shard_ids);
        info!("  Max txs per batch: {}", self.max_num_txs_per_batch);
        info!("===========================================");

        let mirrors = MirrorSet::new(&shard_ids).into_shared();
        let settings = GeneratorSettings::for_shards(
            self.max_num_txs_per_batch,
            shard_ids.len(),
            config.generator.cross_shard_ratio,
        );
        let ctx = GeneratorContext::new(ledger, decoder, settings, mirrors.clone(), config.generator.seed);

        let mut client = None;
        let mut pending = None;
        if let Some(port) = config.client_port() {
            let tracker = Arc::new(PendingCrossShardTracker::new());
            let handler = BlockSyncHandler::new(mirrors.clone()).with_pending(tracker.clone());
            let server = ClientServer::bind(port, Arc::new(handler))
                .await
                .with_context(|| format!("Failed to start client endpoint on port {port}"))?;
            let (stop_tx, stop_rx) = oneshot::channel();
            client = Some((stop_tx, tokio::spawn(server.run(stop_rx))));
            pending = Some(tracker);
        }

        let timing = RunTiming {
            run_duration: config.run_duration(),
            tick_interval: config.tick_interval(),
            startup_delay: config.startup_delay(),
        };
        let dispatcher = Dispatcher::new(transport, config.dispatch_settings());
        let mut distributor = Distributor::new(
            Box::new(ctx),
            config.leaders(),
            config.validators(),
            dispatcher,
            timing,
        );
        if let Some(tracker) = &pending {
            distributor = distributor.with_pending(tracker.clone());
        }

        let report = distributor.run().await.context("Distribution loop failed")?;

        if let Some((stop_tx, handle)) = client {
            let _ = stop_tx.send(());
            if let Err(e) = handle.await {
                warn!(error = %e, "Client endpoint task failed");
            }
        }
        if let Some(tracker) = pending {
            info!(unresolved = tracker.len(), "Cross-shard transactions still pending at stop");
        }

        Ok(report)
    }
}
