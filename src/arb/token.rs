use std::fmt::{self, Debug};

use derive_more::Display;
use eyre::{bail, Result};
use serde::{Deserialize, Serialize};

/// A tradable asset, identified by its symbol (`USDT`, `ETH`, ...).
///
/// Equality is by value. The ordering only exists so tokens can key ordered maps;
/// it carries no market meaning.
#[derive(Clone, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Creates a token from its symbol.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    /// The token symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.0
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Token {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

impl From<String> for Token {
    fn from(symbol: String) -> Self {
        Self(symbol)
    }
}

/// A token together with what the quote API needs to price it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// Symbol used as the graph key
    pub token: Token,
    /// Contract address the quote API knows the token by
    pub address: String,
    /// Number of decimals of the token's base unit
    pub decimals: u8,
}

impl TokenInfo {
    /// Creates a new token description.
    #[must_use]
    pub fn new(symbol: &str, address: &str, decimals: u8) -> Self {
        Self {
            token: Token::new(symbol),
            address: address.to_string(),
            decimals,
        }
    }

    /// Parses a `SYMBOL:ADDRESS:DECIMALS` entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry does not have exactly three non-empty fields
    /// or if the decimals do not fit in a `u8`.
    pub fn parse(entry: &str) -> Result<Self> {
        let fields: Vec<&str> = entry.trim().split(':').map(str::trim).collect();
        let [symbol, address, decimals] = fields.as_slice() else {
            bail!("Token entry '{entry}' must look like SYMBOL:ADDRESS:DECIMALS");
        };
        if symbol.is_empty() || address.is_empty() {
            bail!("Token entry '{entry}' has an empty symbol or address");
        }
        let Ok(decimals) = decimals.parse::<u8>() else {
            bail!("Token entry '{entry}' has invalid decimals '{decimals}'");
        };
        Ok(Self::new(symbol, address, decimals))
    }
}

/// A directed pair of tokens whose exchange rate one fetch worker is responsible for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Token being sold
    pub from: TokenInfo,
    /// Token being bought
    pub to: TokenInfo,
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.from.token, self.to.token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_entry() {
        let info = TokenInfo::parse(" USDT:0xdAC17F958D2ee523a2206206994597C13D831ec7:6 ").unwrap();
        assert_eq!(info.token, Token::from("USDT"));
        assert_eq!(info.address, "0xdAC17F958D2ee523a2206206994597C13D831ec7");
        assert_eq!(info.decimals, 6);
    }

    #[test]
    fn test_parse_token_entry_invalid() {
        assert_eq!(
            TokenInfo::parse("USDT:0xabc").err().unwrap().to_string(),
            "Token entry 'USDT:0xabc' must look like SYMBOL:ADDRESS:DECIMALS"
        );
        assert_eq!(
            TokenInfo::parse("USDT:0xabc:300").err().unwrap().to_string(),
            "Token entry 'USDT:0xabc:300' has invalid decimals '300'"
        );
        assert!(TokenInfo::parse(":0xabc:6").is_err());
    }

    #[test]
    fn test_display() {
        let pair = TokenPair {
            from: TokenInfo::new("USDT", "0x1", 6),
            to: TokenInfo::new("ETH", "0x2", 18),
        };
        assert_eq!(pair.to_string(), "USDT → ETH");
        assert_eq!(format!("{:?}", Token::from("DAI")), "DAI");
    }
}
