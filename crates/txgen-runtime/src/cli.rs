//! Command line.

use clap::Parser;
use std::path::PathBuf;

/// TxGen: synthetic-load transaction generator for the sharded ledger harness
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "txgen")]
#[command(about = "Replays Bitcoin ledger transactions as load for shard leaders")]
pub struct Args {
    /// Peer configuration: `*.toml`, or one `ip port role shard_id` per line
    #[arg(long, alias = "config_file", default_value = "local_config.txt")]
    pub config_file: PathBuf,

    /// Maximum transactions per batch, per leader, per tick
    #[arg(long, alias = "max_num_txs_per_batch", default_value_t = 100)]
    pub max_num_txs_per_batch: usize,

    /// Directory for `txgen.log`
    #[arg(long, alias = "log_folder", default_value = "latest")]
    pub log_folder: PathBuf,
}
