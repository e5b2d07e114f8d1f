//! # TxGen Runtime
//!
//! Command line, logging and wiring for the `txgen` executable.

pub mod cli;
pub mod logging;
pub mod runtime;

pub use cli::Args;
pub use logging::{init_logging, LOG_FILE_NAME};
pub use runtime::TxGenRuntime;
