use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use eyre::{bail, eyre, Result};

use crate::arb::token::TokenInfo;

/// Default token universe: mainnet USDT, WETH (as ETH), DAI, BNB, LINK and WBTC
const DEFAULT_TOKENS: &str = "USDT:0xdAC17F958D2ee523a2206206994597C13D831ec7:6,\
ETH:0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2:18,\
DAI:0x6B175474E89094C44Da98b954EedeAC495271d0F:18,\
BNB:0xb8c77482e45f1f44de1745f52c74426c631bdd52:18,\
LINK:0x514910771AF9Ca656af840dff83E8264EcF986CA:18,\
WBTC:0x2260fac5e5542a773aa44fbcfedf7c193bc2c599:8";

/// Number of fetch workers
const DEFAULT_WORKERS: usize = 3;
/// Requests per second across all workers
const DEFAULT_RATE_LIMIT: f64 = 0.5;
/// Seconds between detection passes
const DEFAULT_DETECT_INTERVAL_SECS: f64 = 2.0;
/// Seconds a single quote may take
const DEFAULT_FETCH_TIMEOUT_SECS: f64 = 10.0;
/// Opportunity log
const DEFAULT_LOG_FILE: &str = "arbitrage_log.txt";
/// 1inch swap API on Ethereum mainnet
const DEFAULT_API_URL: &str = "https://api.1inch.dev/swap/v6.0/1";

/// Runtime configuration, read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Tokens whose pairwise rates are tracked
    pub tokens: Vec<TokenInfo>,
    /// Number of parallel fetch workers
    pub workers: usize,
    /// Global ceiling on quote requests per second
    pub rate_limit: f64,
    /// Time between two detection passes
    pub detect_interval: Duration,
    /// Limit on a single quote request
    pub fetch_timeout: Duration,
    /// File opportunities are appended to
    pub log_file: PathBuf,
    /// Slack channels notified of every opportunity
    pub slack_channels: Vec<String>,
    /// Quote API base URL
    pub api_url: String,
    /// Quote API key
    pub api_key: Option<String>,
}

impl Config {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the result is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the result is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let tokens = get("ROUNDTRIP_TOKENS")
            .unwrap_or_else(|| DEFAULT_TOKENS.to_string())
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(TokenInfo::parse)
            .collect::<Result<Vec<_>>>()?;

        let config = Self {
            tokens,
            workers: parse_or(get("ROUNDTRIP_WORKERS"), "ROUNDTRIP_WORKERS", DEFAULT_WORKERS)?,
            rate_limit: parse_or(get("ROUNDTRIP_RATE_LIMIT"), "ROUNDTRIP_RATE_LIMIT", DEFAULT_RATE_LIMIT)?,
            detect_interval: seconds(
                parse_or(
                    get("ROUNDTRIP_DETECT_INTERVAL_SECS"),
                    "ROUNDTRIP_DETECT_INTERVAL_SECS",
                    DEFAULT_DETECT_INTERVAL_SECS,
                )?,
                "ROUNDTRIP_DETECT_INTERVAL_SECS",
            )?,
            fetch_timeout: seconds(
                parse_or(
                    get("ROUNDTRIP_FETCH_TIMEOUT_SECS"),
                    "ROUNDTRIP_FETCH_TIMEOUT_SECS",
                    DEFAULT_FETCH_TIMEOUT_SECS,
                )?,
                "ROUNDTRIP_FETCH_TIMEOUT_SECS",
            )?,
            log_file: get("ROUNDTRIP_LOG_FILE")
                .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from),
            slack_channels: get("ROUNDTRIP_SLACK_CHANNELS")
                .map(|channels| {
                    channels
                        .split(',')
                        .map(str::trim)
                        .filter(|channel| !channel.is_empty())
                        .map(ToString::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            api_url: get("ROUNDTRIP_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: get("ONEINCH_API_KEY"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        let symbols: HashSet<_> = self.tokens.iter().map(|info| &info.token).collect();
        if symbols.len() != self.tokens.len() {
            bail!("Token symbols must be unique");
        }
        if self.tokens.len() < 2 {
            bail!("At least 2 tokens are needed, got {}", self.tokens.len());
        }
        if self.workers == 0 {
            bail!("At least 1 fetch worker is needed");
        }
        if !self.rate_limit.is_finite() || self.rate_limit <= 0.0 {
            bail!("Rate limit must be a positive number, got {}", self.rate_limit);
        }
        if self.detect_interval.is_zero() {
            bail!("Detection interval must be positive");
        }
        if self.fetch_timeout.is_zero() {
            bail!("Fetch timeout must be positive");
        }
        Ok(())
    }
}

/// Parses `value` if present, `default` otherwise
fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map_or(Ok(default), |value| {
        value
            .trim()
            .parse()
            .map_err(|e| eyre!("Invalid {key} '{value}': {e}"))
    })
}

/// Converts a number of seconds into a duration
fn seconds(secs: f64, key: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|e| eyre!("Invalid {key} '{secs}': {e}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        let symbols: Vec<&str> = config.tokens.iter().map(|info| info.token.symbol()).collect();
        assert_eq!(symbols, vec!["USDT", "ETH", "DAI", "BNB", "LINK", "WBTC"]);
        assert_eq!(config.tokens[0].decimals, 6);
        assert_eq!(config.tokens[5].decimals, 8);
        assert_eq!(config.workers, 3);
        assert!((config.rate_limit - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.detect_interval, Duration::from_secs(2));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.log_file, PathBuf::from("arbitrage_log.txt"));
        assert!(config.slack_channels.is_empty());
        assert_eq!(config.api_url, "https://api.1inch.dev/swap/v6.0/1");
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("ROUNDTRIP_TOKENS", "USDT:0x1:6, ETH:0x2:18"),
            ("ROUNDTRIP_WORKERS", "5"),
            ("ROUNDTRIP_RATE_LIMIT", "2.5"),
            ("ROUNDTRIP_DETECT_INTERVAL_SECS", "0.5"),
            ("ROUNDTRIP_SLACK_CHANNELS", "#arb, #alerts ,"),
            ("ONEINCH_API_KEY", "secret"),
        ])
        .unwrap();

        assert_eq!(config.tokens.len(), 2);
        assert_eq!(config.tokens[1].address, "0x2");
        assert_eq!(config.workers, 5);
        assert_eq!(config.detect_interval, Duration::from_millis(500));
        assert_eq!(config.slack_channels, vec!["#arb", "#alerts"]);
        assert_eq!(config.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(config(&[("ROUNDTRIP_TOKENS", "USDT:0x1:6")]).is_err());
        assert!(config(&[("ROUNDTRIP_TOKENS", "USDT:0x1:6,USDT:0x2:6")]).is_err());
        assert!(config(&[("ROUNDTRIP_WORKERS", "0")]).is_err());
        assert!(config(&[("ROUNDTRIP_WORKERS", "many")]).is_err());
        assert!(config(&[("ROUNDTRIP_RATE_LIMIT", "0")]).is_err());
        assert!(config(&[("ROUNDTRIP_RATE_LIMIT", "inf")]).is_err());
        assert!(config(&[("ROUNDTRIP_DETECT_INTERVAL_SECS", "-1")]).is_err());
        assert!(config(&[("ROUNDTRIP_FETCH_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = config(&[("ROUNDTRIP_WORKERS", "  "), ("ONEINCH_API_KEY", "")]).unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.api_key, None);
    }
}
