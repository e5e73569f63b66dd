//! # Arbitrage Module
//!
//! This module contains the rate graph and the arbitrage detection engine.
//! It turns a snapshot of exchange rates into the list of profitable
//! trading cycles it contains, priced at the snapshot's rates.

/// Closed token paths
pub mod cycle;
/// Negative cycle detection over the log transformed graph
pub mod detector;
/// Validated exchange rate graph and its snapshots
pub mod graph;
/// Priced arbitrage opportunities
pub mod opportunity;
/// Test helpers and utilities
#[cfg(test)]
pub(crate) mod test_helpers;
/// Token identifiers and descriptions
pub mod token;

pub use cycle::Cycle;
pub use detector::ArbitrageDetector;
pub use graph::{GraphSnapshot, PartialUpdate, RateGraph};
pub use opportunity::{ArbitrageOpportunity, ExchangeHop};
pub use token::{Token, TokenInfo, TokenPair};
