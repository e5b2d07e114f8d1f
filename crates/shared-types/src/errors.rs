//! # Error Types
//!
//! Errors shared by everything that touches the wire format.

use thiserror::Error;

/// Errors raised while encoding or decoding a wire message.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// Payload could not be serialized.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Payload could not be deserialized.
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Message version not supported.
    #[error("Unsupported version: received {received}, supported {supported}")]
    UnsupportedVersion { received: u16, supported: u16 },

    /// Frame exceeds the maximum accepted size.
    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
}
