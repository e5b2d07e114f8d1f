//! # Wire Envelope
//!
//! Every message exchanged with leaders, validators and the generator's
//! client endpoint is a versioned `Envelope` wrapping a `NodeMessage`.
//!
//! ## Framing
//!
//! ```text
//! [len: u32 big-endian][bincode(Envelope)]
//! ```
//!
//! Framing is applied by the transport; this module only produces and
//! consumes the envelope bytes.

use serde::{Deserialize, Serialize};

use crate::entities::{Block, Transaction};
use crate::errors::CodecError;

/// Current wire protocol version.
pub const PROTOCOL_VERSION: u16 = 1;

/// Upper bound on a single encoded message.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Node-level message payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeMessage {
    /// A batch of transactions for a leader to order.
    TransactionList(Vec<Transaction>),
    /// Blocks a leader has committed, pushed to the client endpoint.
    BlocksConfirmed(Vec<Block>),
    /// Terminate the receiving node.
    Stop,
}

/// Versioned wrapper around a `NodeMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Protocol version. Checked on decode.
    pub version: u16,
    /// The payload.
    pub payload: NodeMessage,
}

impl Envelope {
    /// Wrap a payload with the current version.
    pub fn new(payload: NodeMessage) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload,
        }
    }

    /// Serialize to bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let bytes = bincode::serialize(self).map_err(|e| CodecError::Encode(e.to_string()))?;
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge {
                size: bytes.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        Ok(bytes)
    }

    /// Deserialize from bytes, rejecting unknown versions.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge {
                size: bytes.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        let envelope: Envelope =
            bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
        if envelope.version != PROTOCOL_VERSION {
            return Err(CodecError::UnsupportedVersion {
                received: envelope.version,
                supported: PROTOCOL_VERSION,
            });
        }
        Ok(envelope)
    }
}

/// Encode a transaction batch for unicast or broadcast.
pub fn construct_transaction_list_message(txs: &[Transaction]) -> Result<Vec<u8>, CodecError> {
    Envelope::new(NodeMessage::TransactionList(txs.to_vec())).encode()
}

/// Encode the payload-less stop message.
pub fn construct_stop_message() -> Result<Vec<u8>, CodecError> {
    Envelope::new(NodeMessage::Stop).encode()
}

/// Encode a set of confirmed blocks (leader → client).
pub fn construct_blocks_message(blocks: &[Block]) -> Result<Vec<u8>, CodecError> {
    Envelope::new(NodeMessage::BlocksConfirmed(blocks.to_vec())).encode()
}

/// Decode envelope bytes into the payload.
pub fn decode_message(bytes: &[u8]) -> Result<NodeMessage, CodecError> {
    Envelope::decode(bytes).map(|e| e.payload)
}
