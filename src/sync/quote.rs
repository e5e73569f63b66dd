use std::time::Duration;

use async_trait::async_trait;
use derive_more::Display;
use eyre::{bail, eyre, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::arb::token::TokenPair;

/// Something that can price one directed token pair.
///
/// A quote is the number of `pair.to` tokens received for one whole `pair.from`
/// token. Implementations report any failure as an error; callers treat every
/// error as a transient miss for that pair.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Quotes the exchange rate of `pair`.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate could not be obtained.
    async fn quote(&self, pair: &TokenPair) -> Result<f64>;
}

/// Error raised when the quote API answers `429 Too Many Requests`.
#[derive(Debug, Display)]
#[display("Quote API is throttling requests")]
pub struct Throttled;

impl std::error::Error for Throttled {}

/// Body of a successful `/quote` response. Only the amount is used.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    /// Destination amount in base units, as a decimal string
    dst_amount: String,
}

/// 1inch swap API quote client
#[derive(Debug, Clone)]
pub struct OneInchClient {
    /// Swap API base, e.g. `https://api.1inch.dev/swap/v6.0/1`
    base_url: Url,
    /// Bearer token, requests are sent unauthenticated without one
    api_key: Option<String>,
    /// The HTTP client
    client: Client,
}

impl OneInchClient {
    /// Creates a new client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| eyre!("Invalid quote API URL '{base_url}': {e}"))?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    /// URL of the quote endpoint
    fn quote_url(&self) -> String {
        format!("{}/quote", self.base_url.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl QuoteSource for OneInchClient {
    async fn quote(&self, pair: &TokenPair) -> Result<f64> {
        let amount = one_unit(pair.from.decimals);
        let mut request = self
            .client
            .get(self.quote_url())
            .header("accept", "application/json")
            .query(&[
                ("src", pair.from.address.as_str()),
                ("dst", pair.to.address.as_str()),
                ("amount", amount.as_str()),
                ("includeGas", "true"),
            ]);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(Throttled.into()),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                bail!("Quote API returned {status} for {pair}: {body}");
            }
            _ => {}
        }

        let body = response.json::<QuoteResponse>().await?;
        normalize_amount(&body.dst_amount, pair.to.decimals)
    }
}

/// One whole token in base units, as a decimal string (`10^decimals`).
fn one_unit(decimals: u8) -> String {
    format!("1{}", "0".repeat(usize::from(decimals)))
}

/// Converts a base unit amount into whole tokens.
fn normalize_amount(amount: &str, decimals: u8) -> Result<f64> {
    let raw: f64 = amount
        .parse()
        .map_err(|e| eyre!("Invalid destination amount '{amount}': {e}"))?;
    let rate = raw / 10f64.powi(i32::from(decimals));
    if !rate.is_finite() || rate <= 0.0 {
        bail!("Destination amount '{amount}' does not give a positive rate");
    }
    Ok(rate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_one_unit() {
        assert_eq!(one_unit(0), "1");
        assert_eq!(one_unit(6), "1000000");
        assert_eq!(one_unit(18), "1000000000000000000");
    }

    #[test]
    fn test_normalize_amount() {
        let rate = normalize_amount("500000000000000", 18).unwrap();
        assert!((rate - 0.0005).abs() < 1e-12);

        let rate = normalize_amount("1999000000", 6).unwrap();
        assert!((rate - 1999.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_amount_rejects_bad_values() {
        assert!(normalize_amount("0", 18).is_err());
        assert!(normalize_amount("abc", 18).is_err());
        assert!(normalize_amount("-5", 6).is_err());
    }

    #[test]
    fn test_throttled_survives_report_conversion() {
        assert_eq!(Throttled.to_string(), "Quote API is throttling requests");

        let report: eyre::Report = Throttled.into();
        assert!(report.downcast_ref::<Throttled>().is_some());
        assert_eq!(report.to_string(), "Quote API is throttling requests");
    }

    #[test]
    fn test_deserialize_quote_response() {
        let body = r#"{"dstAmount":"1999000000","gas":181416}"#;
        let response: QuoteResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.dst_amount, "1999000000");
    }

    #[test]
    fn test_quote_url() {
        let client = OneInchClient::new(
            "https://api.1inch.dev/swap/v6.0/1/",
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.quote_url(), "https://api.1inch.dev/swap/v6.0/1/quote");
        assert!(OneInchClient::new("not a url", None, Duration::from_secs(1)).is_err());
    }
}
