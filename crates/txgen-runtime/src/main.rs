//! # TxGen
//!
//! Entry point for the synthetic-load generator.
//!
//! ## Run Sequence
//!
//! 1. Parse flags and install logging
//! 2. Load the peer configuration (fatal on error)
//! 3. Wait for nodes, then distribute batches until the run duration elapses
//! 4. Broadcast stop to validators and leaders, then exit

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use txgen::load_config;
use txgen_runtime::{init_logging, Args, TxGenRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_path = init_logging(&args.log_folder)?;
    info!(log = %log_path.display(), "Logging to file");

    let config = load_config(&args.config_file)
        .with_context(|| format!("Failed to load config {}", args.config_file.display()))?;
    info!(
        leaders = config.leaders().len(),
        validators = config.validators().len(),
        client = config.client_port().is_some(),
        "Loaded configuration"
    );

    let report = TxGenRuntime::new(config, args.max_num_txs_per_batch)
        .run()
        .await?;

    info!(
        ticks = report.ticks,
        single_shard_txs = report.single_shard_txs,
        cross_shard_txs = report.cross_shard_txs,
        "TxGen finished"
    );
    Ok(())
}
