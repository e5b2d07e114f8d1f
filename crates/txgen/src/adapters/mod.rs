//! # Adapters Layer (Hexagonal Architecture)
//!
//! Concrete implementations of the outbound ports, plus the client endpoint
//! and configuration loading.

pub mod address_decoder;
pub mod bitcoin_ledger;
pub mod client_server;
pub mod config;
pub mod dispatcher;
pub mod tcp_transport;

pub use address_decoder::BitcoinAddressDecoder;
pub use bitcoin_ledger::{BitcoinBlockFileLedger, LedgerNetwork};
pub use client_server::ClientServer;
pub use config::{load_config, GeneratorConfig};
pub use dispatcher::{DeliveryStats, DispatchSettings, Dispatcher};
pub use tcp_transport::{read_frame, write_frame, TcpTransport};
