use async_trait::async_trait;
use eyre::{bail, eyre, Result};
use log::warn;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use super::{Notifier, NOTIFICATION_SUBJECT};
use crate::arb::opportunity::ArbitrageOpportunity;

/// Slack chat API endpoint
const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

/// Slack notifier
#[derive(Debug)]
pub struct SlackNotifier {
    /// The Slack OAuth token
    token: String,
    /// Channels every notification goes to
    channels: Vec<String>,
    /// The HTTP client
    client: Client,
}

impl SlackNotifier {
    /// Create a new Slack notifier posting to `channels`, with the token from `SLACK_OAUTH_TOKEN`
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not set or the HTTP client cannot be built.
    pub fn new(channels: Vec<String>) -> Result<Self> {
        let token = std::env::var("SLACK_OAUTH_TOKEN")
            .map_err(|_| eyre!("SLACK_OAUTH_TOKEN not set"))?;
        Self::with_token(token, channels)
    }

    /// Create a new Slack notifier with an explicit token
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_token(token: String, channels: Vec<String>) -> Result<Self> {
        // Create a client with a timeout
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            token,
            channels,
            client,
        })
    }

    /// Channels messages are sent to
    #[must_use]
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Send a message to a specific channel
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Slack rejects the message.
    pub async fn send_to(&self, msg: &str, channel: &str) -> Result<()> {
        let payload = json!({
            "channel": channel,
            "text": msg,
            "username": "Roundtrip",
            "icon_emoji": ":arrows_counterclockwise:"
        });

        let response = self
            .client
            .post(POST_MESSAGE_URL)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?
            .json::<serde_json::Value>()
            .await?;

        // Check if Slack API returned success
        if !response["ok"].as_bool().unwrap_or(false) {
            return Err(eyre!(
                "Slack API error: {}",
                response["error"].as_str().unwrap_or("unknown error")
            ));
        }

        Ok(())
    }

    /// Send a message to every configured channel
    ///
    /// Every channel is tried even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns an error naming the channels that could not be reached.
    pub async fn send(&self, msg: &str) -> Result<()> {
        if self.channels.is_empty() {
            bail!("No Slack channels configured");
        }

        let mut failed = Vec::new();
        for channel in &self.channels {
            if let Err(e) = self.send_to(msg, channel).await {
                warn!("notify::slack: Failed to post to {channel}: {e}");
                failed.push(channel.as_str());
            }
        }

        if !failed.is_empty() {
            bail!("Failed to post to {}", failed.join(", "));
        }
        Ok(())
    }
}

/// Slack message for an opportunity
fn format_message(opportunity: &ArbitrageOpportunity) -> String {
    format!(":rocket: *{NOTIFICATION_SUBJECT}*\n```{opportunity}```")
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn notify(&self, opportunity: &ArbitrageOpportunity) -> Result<()> {
        self.send(&format_message(opportunity)).await
    }
}
