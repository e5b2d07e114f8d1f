//! # Bitcoin Block-File Ledger
//!
//! Reads `blk*.dat` files as written by a Bitcoin full node and yields their
//! transactions in order.
//!
//! ## File Layout
//!
//! ```text
//! [magic: 4 bytes][size: u32 LE][consensus-encoded block: size bytes] ...
//! ```
//!
//! Files are visited in file-name order. A zero magic marks preallocated
//! padding at the end of a file.

use bitcoin::consensus::deserialize;
use bitcoin::hashes::Hash as _;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::domain::{LedgerError, LedgerRecord, OutPointRef, RawOutput};
use crate::ports::LedgerSource;

/// Upper bound on a single serialized block.
const MAX_BLOCK_SIZE: u32 = 32 * 1024 * 1024;

/// Network the block files were produced on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerNetwork {
    /// Mainnet.
    #[default]
    Bitcoin,
    /// Testnet3.
    Testnet,
    /// Regression test network.
    Regtest,
    /// Signet.
    Signet,
}

impl LedgerNetwork {
    /// Record-start magic in block files.
    pub fn magic(&self) -> [u8; 4] {
        match self {
            Self::Bitcoin => [0xf9, 0xbe, 0xb4, 0xd9],
            Self::Testnet => [0x0b, 0x11, 0x09, 0x07],
            Self::Regtest => [0xfa, 0xbf, 0xb5, 0xda],
            Self::Signet => [0x0a, 0x03, 0xcf, 0x40],
        }
    }

    /// Equivalent `bitcoin` crate network, used for address encoding.
    pub fn to_bitcoin(self) -> bitcoin::Network {
        match self {
            Self::Bitcoin => bitcoin::Network::Bitcoin,
            Self::Testnet => bitcoin::Network::Testnet,
            Self::Regtest => bitcoin::Network::Regtest,
            Self::Signet => bitcoin::Network::Signet,
        }
    }
}

impl FromStr for LedgerNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bitcoin" | "mainnet" => Ok(Self::Bitcoin),
            "testnet" => Ok(Self::Testnet),
            "regtest" => Ok(Self::Regtest),
            "signet" => Ok(Self::Signet),
            other => Err(format!("unknown network: {other}")),
        }
    }
}

/// Sequential reader over a directory of block files.
pub struct BitcoinBlockFileLedger {
    files: VecDeque<PathBuf>,
    reader: Option<(PathBuf, BufReader<File>)>,
    pending: VecDeque<LedgerRecord>,
    magic: [u8; 4],
    blocks_read: u64,
}

impl BitcoinBlockFileLedger {
    /// Open every `blk*.dat` in `dir`.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be listed or holds no block files.
    pub fn open<P: AsRef<Path>>(dir: P, network: LedgerNetwork) -> Result<Self, LedgerError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| LedgerError::Io {
            path: dir.display().to_string(),
            error: e.to_string(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_block_file(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(LedgerError::NoBlockFiles(dir.display().to_string()));
        }
        info!(dir = %dir.display(), files = files.len(), "Opened reference ledger");

        Ok(Self {
            files: files.into(),
            reader: None,
            pending: VecDeque::new(),
            magic: network.magic(),
            blocks_read: 0,
        })
    }

    /// Blocks decoded so far.
    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    /// Read the next block's transactions into `pending`.
    ///
    /// Returns `Ok(false)` once every file has been consumed. A corrupt
    /// record abandons the rest of its file, so the next call starts on the
    /// following file.
    fn load_next_block(&mut self) -> Result<bool, LedgerError> {
        loop {
            if self.reader.is_none() {
                let Some(path) = self.files.pop_front() else {
                    return Ok(false);
                };
                let file = File::open(&path).map_err(|e| io_error(&path, e))?;
                debug!(file = %path.display(), "Reading block file");
                self.reader = Some((path, BufReader::new(file)));
            }

            let Some((path, reader)) = self.reader.as_mut() else {
                continue;
            };

            match read_block(reader, path, self.magic) {
                Ok(Some(block)) => {
                    self.blocks_read += 1;
                    self.pending.extend(block.txdata.iter().map(to_record));
                    return Ok(true);
                }
                Ok(None) => {
                    self.reader = None;
                }
                Err(e) => {
                    warn!(
                        file = %path.display(),
                        error = %e,
                        remaining_files = self.files.len(),
                        "Skipping rest of block file"
                    );
                    self.reader = None;
                    return Err(e);
                }
            }
        }
    }
}

/// Read one framed block. `Ok(None)` at end of file or at zero padding.
fn read_block(
    reader: &mut impl Read,
    path: &Path,
    magic: [u8; 4],
) -> Result<Option<bitcoin::Block>, LedgerError> {
    let mut found = [0u8; 4];
    match reader.read_exact(&mut found) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(io_error(path, e)),
    }
    if found == [0u8; 4] {
        return Ok(None);
    }
    if found != magic {
        return Err(LedgerError::Corrupt(format!(
            "bad magic {} in {}",
            hex::encode(found),
            path.display()
        )));
    }

    let mut size = [0u8; 4];
    reader.read_exact(&mut size).map_err(|e| io_error(path, e))?;
    let size = u32::from_le_bytes(size);
    if size > MAX_BLOCK_SIZE {
        return Err(LedgerError::Corrupt(format!(
            "block of {size} bytes in {}",
            path.display()
        )));
    }

    let mut raw = vec![0u8; size as usize];
    reader.read_exact(&mut raw).map_err(|e| io_error(path, e))?;
    deserialize(&raw)
        .map(Some)
        .map_err(|e| LedgerError::Corrupt(e.to_string()))
}

impl LedgerSource for BitcoinBlockFileLedger {
    fn next_tx(&mut self) -> Result<LedgerRecord, LedgerError> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Ok(record);
            }
            if !self.load_next_block()? {
                return Err(LedgerError::Exhausted);
            }
        }
    }
}

fn is_block_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("blk") && name.ends_with(".dat"))
}

fn io_error(path: &Path, e: std::io::Error) -> LedgerError {
    LedgerError::Io {
        path: path.display().to_string(),
        error: e.to_string(),
    }
}

fn to_record(tx: &bitcoin::Transaction) -> LedgerRecord {
    let outputs = tx
        .output
        .iter()
        .map(|out| RawOutput {
            value: out.value,
            script: out.script_pubkey.to_bytes(),
        })
        .collect();

    if tx.is_coin_base() {
        return LedgerRecord::coinbase(outputs);
    }

    let inputs = tx
        .input
        .iter()
        .map(|input| OutPointRef {
            txid: input.previous_output.txid.to_byte_array(),
            vout: input.previous_output.vout,
        })
        .collect();
    LedgerRecord::spend(inputs, outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::blockdata::constants::genesis_block;
    use bitcoin::consensus::serialize;
    use std::io::Write;

    fn write_blocks(path: &Path, magic: [u8; 4], blocks: &[bitcoin::Block], padding: usize) {
        let mut file = File::create(path).unwrap();
        for block in blocks {
            let raw = serialize(block);
            file.write_all(&magic).unwrap();
            file.write_all(&(raw.len() as u32).to_le_bytes()).unwrap();
            file.write_all(&raw).unwrap();
        }
        file.write_all(&vec![0u8; padding]).unwrap();
    }

    #[test]
    fn test_network_magic() {
        assert_eq!(LedgerNetwork::Bitcoin.magic(), [0xf9, 0xbe, 0xb4, 0xd9]);
        assert_eq!("regtest".parse::<LedgerNetwork>().unwrap(), LedgerNetwork::Regtest);
        assert!("dogecoin".parse::<LedgerNetwork>().is_err());
    }

    #[test]
    fn test_reads_genesis_coinbase() {
        let dir = tempfile::tempdir().unwrap();
        let genesis = genesis_block(bitcoin::Network::Bitcoin);
        write_blocks(&dir.path().join("blk00000.dat"), LedgerNetwork::Bitcoin.magic(), &[genesis], 16);

        let mut ledger = BitcoinBlockFileLedger::open(dir.path(), LedgerNetwork::Bitcoin).unwrap();
        let record = ledger.next_tx().unwrap();

        assert!(record.is_coinbase());
        assert_eq!(record.outputs.len(), 1);
        assert_eq!(record.outputs[0].value, 50 * 100_000_000);
        assert_eq!(ledger.blocks_read(), 1);
        assert!(matches!(ledger.next_tx(), Err(LedgerError::Exhausted)));
    }

    #[test]
    fn test_files_read_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let magic = LedgerNetwork::Regtest.magic();
        write_blocks(&dir.path().join("blk00001.dat"), magic, &[genesis_block(bitcoin::Network::Regtest)], 0);
        write_blocks(&dir.path().join("blk00000.dat"), magic, &[genesis_block(bitcoin::Network::Regtest)], 0);
        std::fs::write(dir.path().join("rev00000.dat"), b"ignored").unwrap();

        let mut ledger = BitcoinBlockFileLedger::open(dir.path(), LedgerNetwork::Regtest).unwrap();
        assert!(ledger.next_tx().is_ok());
        assert!(ledger.next_tx().is_ok());
        assert_eq!(ledger.blocks_read(), 2);
        assert!(matches!(ledger.next_tx(), Err(LedgerError::Exhausted)));
    }

    #[test]
    fn test_wrong_magic_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        write_blocks(
            &dir.path().join("blk00000.dat"),
            LedgerNetwork::Testnet.magic(),
            &[genesis_block(bitcoin::Network::Testnet)],
            0,
        );

        let mut ledger = BitcoinBlockFileLedger::open(dir.path(), LedgerNetwork::Bitcoin).unwrap();
        assert!(matches!(ledger.next_tx(), Err(LedgerError::Corrupt(_))));
    }

    #[test]
    fn test_corrupt_file_skipped_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blk00000.dat"), vec![0x5a; 4096]).unwrap();
        write_blocks(
            &dir.path().join("blk00001.dat"),
            LedgerNetwork::Bitcoin.magic(),
            &[genesis_block(bitcoin::Network::Bitcoin)],
            0,
        );

        let mut ledger = BitcoinBlockFileLedger::open(dir.path(), LedgerNetwork::Bitcoin).unwrap();
        assert!(matches!(ledger.next_tx(), Err(LedgerError::Corrupt(_))));

        let record = ledger.next_tx().unwrap();
        assert!(record.is_coinbase());
        assert_eq!(ledger.blocks_read(), 1);
        assert!(matches!(ledger.next_tx(), Err(LedgerError::Exhausted)));
    }

    #[test]
    fn test_truncated_block_skips_to_next_file() {
        let dir = tempfile::tempdir().unwrap();
        let magic = LedgerNetwork::Regtest.magic();
        let mut truncated = magic.to_vec();
        truncated.extend_from_slice(&1000u32.to_le_bytes());
        truncated.extend_from_slice(&[1, 2, 3]);
        std::fs::write(dir.path().join("blk00000.dat"), truncated).unwrap();
        write_blocks(&dir.path().join("blk00001.dat"), magic, &[genesis_block(bitcoin::Network::Regtest)], 0);

        let mut ledger = BitcoinBlockFileLedger::open(dir.path(), LedgerNetwork::Regtest).unwrap();
        assert!(matches!(ledger.next_tx(), Err(LedgerError::Io { .. })));
        assert!(ledger.next_tx().unwrap().is_coinbase());
    }

    #[test]
    fn test_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            BitcoinBlockFileLedger::open(dir.path(), LedgerNetwork::Bitcoin),
            Err(LedgerError::NoBlockFiles(_))
        ));
    }
}
