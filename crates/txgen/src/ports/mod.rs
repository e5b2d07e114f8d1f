//! # Ports Module
//!
//! Hexagonal architecture ports (API and SPI traits).

pub mod inbound;
pub mod outbound;

pub use inbound::{BlockSink, GeneratorApi};
pub use outbound::{
    AddressDecoder, LedgerSource, MockAddressDecoder, RecordingTransport, SentMessage, Transport,
    VecLedger,
};
