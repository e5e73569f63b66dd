/*!
 * # Roundtrip - Cross-token Arbitrage Cycle Detection
 *
 * Roundtrip keeps a live graph of exchange rates between a basket of tokens and
 * reports every trading cycle that ends with more of the start token than it began with.
 *
 * ## Core Features
 *
 * - **Rate Fetching**: Parallel workers quote their own token pairs under one global request rate
 * - **Graph Aggregation**: Partial updates are merged into one shared graph, last write wins per edge
 * - **Arbitrage Detection**: Bellman-Ford on log transformed rates finds every reachable negative cycle
 * - **Notification**: Opportunities are appended to a log file and posted to Slack
 *
 * ## Module Structure
 *
 * - `arb`: Rate graph, cycles and the detection engine
 * - `bot`: Pipeline orchestration
 * - `config`: Configuration from the environment
 * - `notify`: Opportunity log, Slack and dispatch
 * - `sync`: Quote sources, request throttling, fetch workers and the shared graph
 * - `utils`: Logging and shutdown helpers
 */

/// Rate graph, cycles and the detection engine
pub mod arb;
/// Pipeline orchestration
pub mod bot;
/// Configuration from the environment
pub mod config;
/// Opportunity log, Slack and dispatch
pub mod notify;
/// Fetch workers and the shared graph
pub mod sync;
/// Utility functions and helpers
pub mod utils;
