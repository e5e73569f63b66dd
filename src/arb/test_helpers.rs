#![allow(clippy::unwrap_used)]

use super::cycle::Cycle;
use super::graph::RateGraph;
use super::token::{Token, TokenInfo};

#[allow(dead_code)]
pub fn token(symbol: &str) -> Token {
    Token::from(symbol)
}

#[allow(dead_code)]
pub fn token_info(symbol: &str, decimals: u8) -> TokenInfo {
    TokenInfo::new(symbol, &format!("0x{symbol}"), decimals)
}

#[allow(dead_code)]
pub fn graph(edges: &[(&str, &str, f64)]) -> RateGraph {
    let mut graph = RateGraph::new();
    for (from, to, rate) in edges {
        graph.insert(token(from), token(to), *rate).unwrap();
    }
    graph
}

#[allow(dead_code)]
pub fn cycle(path: &[&str]) -> Cycle {
    Cycle::new(path.iter().map(|symbol| token(symbol)).collect()).unwrap()
}

/// No cycle multiplies to more than 1
#[allow(dead_code)]
pub fn no_arbitrage_graph() -> RateGraph {
    graph(&[
        ("USDT", "ETH", 0.0005),
        ("USDT", "DAI", 1.0),
        ("ETH", "DAI", 2000.0),
        ("ETH", "USDT", 1999.0),
        ("DAI", "USDT", 0.999),
        ("DAI", "ETH", 0.000_401),
    ])
}

/// `USDT → ETH → USDT` alone returns 5%
#[allow(dead_code)]
pub fn arbitrage_graph() -> RateGraph {
    graph(&[
        ("USDT", "ETH", 0.0005),
        ("USDT", "DAI", 1.0),
        ("ETH", "DAI", 2000.0),
        ("ETH", "USDT", 2100.0),
        ("DAI", "USDT", 1.01),
        ("DAI", "ETH", 0.000_501),
    ])
}
