//! # Outbound Ports
//!
//! Traits for external collaborators: the reference ledger, script decoding
//! and the network transport.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{decode_message, NodeMessage, Peer};
use std::collections::{HashSet, VecDeque};

use crate::domain::{DecodeError, LedgerError, LedgerRecord, TransportError};

/// Sequential source of raw ledger transactions.
///
/// Stateful and not restartable. Only the generator task advances it.
pub trait LedgerSource: Send {
    /// Next record, or `LedgerError::Exhausted` at the end.
    fn next_tx(&mut self) -> Result<LedgerRecord, LedgerError>;
}

/// Resolves an output locking script to an address string.
pub trait AddressDecoder: Send + Sync {
    /// Decode `script`, or report why it cannot be decoded.
    fn decode(&self, script: &[u8]) -> Result<String, DecodeError>;
}

/// Fire-and-forget delivery of one encoded message to one peer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `payload` to `peer`.
    async fn send(&self, peer: &Peer, payload: &[u8]) -> Result<(), TransportError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Ledger backed by an in-memory queue.
#[derive(Clone, Debug, Default)]
pub struct VecLedger {
    records: VecDeque<LedgerRecord>,
}

impl VecLedger {
    /// Ledger yielding `records` in order, then `Exhausted`.
    pub fn new(records: Vec<LedgerRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }

    /// Records not yet consumed.
    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl LedgerSource for VecLedger {
    fn next_tx(&mut self) -> Result<LedgerRecord, LedgerError> {
        self.records.pop_front().ok_or(LedgerError::Exhausted)
    }
}

/// Decoder that hex-encodes any non-empty script and rejects empty ones.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockAddressDecoder;

impl AddressDecoder for MockAddressDecoder {
    fn decode(&self, script: &[u8]) -> Result<String, DecodeError> {
        if script.is_empty() {
            return Err(DecodeError::EmptyScript);
        }
        Ok(hex::encode(script))
    }
}

/// A message captured by `RecordingTransport`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    /// `ip:port` of the destination.
    pub endpoint: String,
    /// Decoded payload.
    pub message: NodeMessage,
}

/// Transport that records every send and optionally fails some peers.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMessage>>,
    failing: HashSet<String>,
}

impl RecordingTransport {
    /// Transport where every send succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to `endpoint` fail.
    pub fn failing_for(mut self, endpoint: impl Into<String>) -> Self {
        self.failing.insert(endpoint.into());
        self
    }

    /// All successful sends so far, in completion order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Successful sends to `endpoint`.
    pub fn sent_to(&self, endpoint: &str) -> Vec<NodeMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.endpoint == endpoint)
            .map(|m| m.message.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, peer: &Peer, payload: &[u8]) -> Result<(), TransportError> {
        let endpoint = peer.endpoint();
        if self.failing.contains(&endpoint) {
            return Err(TransportError::Connect {
                peer: endpoint,
                reason: "connection refused".to_string(),
            });
        }
        let message = decode_message(payload)?;
        self.sent.lock().push(SentMessage { endpoint, message });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{construct_stop_message, PeerRole};

    fn leader(port: u16) -> Peer {
        Peer {
            ip: "127.0.0.1".to_string(),
            port,
            role: PeerRole::Leader,
            shard_id: 0,
        }
    }

    #[test]
    fn test_vec_ledger_exhausts() {
        let mut ledger = VecLedger::new(vec![LedgerRecord::coinbase(vec![])]);
        assert!(ledger.next_tx().is_ok());
        assert!(matches!(ledger.next_tx(), Err(LedgerError::Exhausted)));
    }

    #[test]
    fn test_mock_decoder() {
        assert_eq!(MockAddressDecoder.decode(&[0xab]).unwrap(), "ab");
        assert_eq!(MockAddressDecoder.decode(&[]), Err(DecodeError::EmptyScript));
    }

    #[tokio::test]
    async fn test_recording_transport_records() {
        let transport = RecordingTransport::new();
        let stop = construct_stop_message().unwrap();
        transport.send(&leader(9000), &stop).await.unwrap();
        assert_eq!(transport.sent_to("127.0.0.1:9000"), vec![NodeMessage::Stop]);
    }

    #[tokio::test]
    async fn test_recording_transport_failing_peer() {
        let transport = RecordingTransport::new().failing_for("127.0.0.1:9001");
        let stop = construct_stop_message().unwrap();
        assert!(transport.send(&leader(9001), &stop).await.is_err());
        assert!(transport.sent().is_empty());
    }
}
