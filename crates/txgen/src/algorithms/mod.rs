//! # Algorithms Module
//!
//! Transaction synthesis, batch accumulation and cross-shard construction.

pub mod accumulator;
pub mod cross_shard;
pub mod synthesizer;

pub use accumulator::{accumulate, GeneratorContext};
pub use cross_shard::build_cross_shard_tx;
pub use synthesizer::synthesize;
