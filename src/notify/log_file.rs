use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eyre::{eyre, Result};
use log::info;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::Notifier;
use crate::arb::opportunity::ArbitrageOpportunity;

/// Writes every opportunity to the console log and appends it to a text file.
#[derive(Debug, Clone)]
pub struct OpportunityLog {
    /// File the reports are appended to, created on first write
    path: PathBuf,
}

impl OpportunityLog {
    /// Creates a log appending to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file reports are appended to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Notifier for OpportunityLog {
    fn name(&self) -> &str {
        "log_file"
    }

    async fn notify(&self, opportunity: &ArbitrageOpportunity) -> Result<()> {
        let entry = opportunity.to_string();
        info!("arb::detector: Arbitrage opportunity\n{entry}");

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| eyre!("Failed to open {}: {e}", self.path.display()))?;
        file.write_all(format!("\n{entry}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
