//! Cassette infrastructure for deterministic replay of port interactions.

pub mod format;
pub mod replayer;
