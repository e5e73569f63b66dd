//! # Notify Module
//!
//! Everything that happens to an opportunity after it is found: the append-only
//! opportunity log, Slack messages, and the dispatcher fanning each opportunity
//! out to them without holding up detection.

use async_trait::async_trait;
use eyre::Result;

use crate::arb::opportunity::ArbitrageOpportunity;

/// Fire-and-forget fan-out of opportunities
pub mod dispatcher;
/// Append-only opportunity log
pub mod log_file;
/// Slack notifier
pub mod slack;

pub use dispatcher::AlertDispatcher;
pub use log_file::OpportunityLog;
pub use slack::SlackNotifier;

/// Subject line of every opportunity notification
pub const NOTIFICATION_SUBJECT: &str = "Arbitrage Opportunity Detected!";

/// A sink for detected opportunities.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Delivers one opportunity.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery failed. Callers log it and move on.
    async fn notify(&self, opportunity: &ArbitrageOpportunity) -> Result<()>;
}
