//! # Shared Types Crate
//!
//! Harness entities and the wire envelope shared by the transaction
//! generator, shard leaders and the client endpoint.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses the wire is defined here.
//! - **Content-Derived Identity**: a transaction id is a hash of its inputs
//!   and outputs, never assigned externally.
//! - **Versioned Envelope**: all payloads travel inside `Envelope`.

pub mod entities;
pub mod envelope;
pub mod errors;

pub use entities::*;
pub use envelope::{
    construct_blocks_message, construct_stop_message, construct_transaction_list_message,
    decode_message, Envelope, NodeMessage, MAX_FRAME_SIZE, PROTOCOL_VERSION,
};
pub use errors::*;
