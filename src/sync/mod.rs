//! # Sync Module
//!
//! Keeps the shared rate graph fresh. Fetch workers price their own subset of
//! token pairs through a [`QuoteSource`], paced by one process wide
//! [`ApiThrottler`], and hand every round to the [`GraphAggregator`].

/// Shared rate graph owner
pub mod aggregator;
/// Fetch worker body and pair partitioning
pub mod fetcher;
/// Quote sources
///
/// # Errors
/// Quotes fail on HTTP errors, undecodable bodies and non-positive amounts
pub mod quote;
/// Process wide request pacing
pub mod throttler;

pub use aggregator::GraphAggregator;
pub use fetcher::{partition_pairs, PriceFetcher};
pub use quote::{OneInchClient, QuoteSource, Throttled};
pub use throttler::ApiThrottler;
