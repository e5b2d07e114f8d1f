//! # Domain Errors
//!
//! Error types for the transaction generator.
//!
//! Per-output and per-record failures (`DecodeError`, malformed records) are
//! contained by the accumulator. Only `ConfigError` and ledger open failures
//! are fatal, and only at startup.

use shared_types::{CodecError, ShardId};
use thiserror::Error;

pub use shared_types::{Hash, TxId};

/// Failure to resolve an output script to an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Script is empty.
    #[error("Empty output script")]
    EmptyScript,

    /// Script does not match any known address template.
    #[error("Unsupported output script: {0}")]
    Unsupported(String),

    /// Script carries an embedded public key that does not parse.
    #[error("Invalid public key in script: {0}")]
    InvalidPublicKey(String),
}

/// Errors from the reference ledger reader.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// All block files have been consumed.
    #[error("Ledger exhausted")]
    Exhausted,

    /// No block files found in the configured directory.
    #[error("No block files in {0}")]
    NoBlockFiles(String),

    /// File I/O failure.
    #[error("Failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },

    /// Block data does not decode.
    #[error("Corrupt ledger data: {0}")]
    Corrupt(String),
}

/// Errors from a single network send.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the peer.
    #[error("Connect to {peer} failed: {reason}")]
    Connect {
        /// `ip:port` of the peer.
        peer: String,
        /// Underlying error message.
        reason: String,
    },

    /// Read or write failed on an open connection.
    #[error("I/O error: {0}")]
    Io(String),

    /// Operation exceeded its deadline.
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// Frame could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Configuration loading errors. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("Failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },

    /// Syntax error in the file.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Parsed values violate a constraint.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level generator error.
#[derive(Debug, Error)]
pub enum TxGenError {
    /// No shard mirror for this shard id.
    #[error("Unknown shard: {0}")]
    UnknownShard(ShardId),

    /// A ledger record cannot be turned into a transaction.
    #[error("Malformed ledger record: {0}")]
    MalformedRecord(String),

    /// Ledger failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Wire encoding failure.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_shard_error() {
        let err = TxGenError::UnknownShard(7);
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_ledger_io_error() {
        let err = LedgerError::Io {
            path: "/data/blk00000.dat".to_string(),
            error: "denied".to_string(),
        };
        assert!(err.to_string().contains("blk00000.dat"));
    }

    #[test]
    fn test_timeout_error() {
        let err = TransportError::Timeout(2000);
        assert!(err.to_string().contains("2000ms"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: TxGenError = ConfigError::Invalid("no leaders".to_string()).into();
        assert!(err.to_string().contains("no leaders"));
    }
}
