//! The exchange rate graph shared between the fetch workers and the detector.
//!
//! Edges are directed and asymmetric: `rate(A → B)` is how many `B` one `A` buys,
//! and is generally not `1 / rate(B → A)` because of spreads and fees.

use std::collections::BTreeMap;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use eyre::{bail, Result};
use serde::Serialize;

use super::token::Token;

/// Adjacency map of positive exchange rates, `from → (to → rate)`.
///
/// Every token that appears on either side of an edge is a node, and nodes can exist
/// without edges. Rates are validated on insertion, so every stored rate is a strictly
/// positive finite number; an unpriced pair is absent, never stored as zero.
///
/// Keys are kept in token order so iteration, and therefore detection, is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RateGraph {
    /// Outgoing edges per token
    edges: BTreeMap<Token, BTreeMap<Token, f64>>,
}

/// One worker's fragment of the graph, handed to the aggregator.
pub type PartialUpdate = RateGraph;

impl RateGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token without any edges.
    pub fn add_token(&mut self, token: Token) {
        self.edges.entry(token).or_default();
    }

    /// Sets the rate of the `from → to` edge, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the graph untouched, if `from` and `to` are the same
    /// token or if the rate is not a strictly positive finite number.
    pub fn insert(&mut self, from: Token, to: Token, rate: f64) -> Result<()> {
        Self::validate(&from, &to, rate)?;
        self.add_token(to.clone());
        self.edges.entry(from).or_default().insert(to, rate);
        Ok(())
    }

    /// Checks that an edge may be stored in a graph.
    fn validate(from: &Token, to: &Token, rate: f64) -> Result<()> {
        if from == to {
            bail!("Edge {from} → {to} is a self-loop");
        }
        if !rate.is_finite() || rate <= 0.0 {
            bail!("Rate for {from} → {to} must be a positive finite number, got {rate}");
        }
        Ok(())
    }

    /// Overwrites this graph's edges with every edge present in `update`.
    ///
    /// Edges absent from `update` are left as they are: the graph only grows or
    /// refreshes, it never forgets an edge because a later update omitted it.
    pub fn merge(&mut self, update: &Self) {
        for (from, neighbors) in &update.edges {
            let entry = self.edges.entry(from.clone()).or_default();
            for (to, rate) in neighbors {
                entry.insert(to.clone(), *rate);
            }
        }
    }

    /// The rate of the `from → to` edge, if it is known.
    #[must_use]
    pub fn rate(&self, from: &Token, to: &Token) -> Option<f64> {
        self.edges.get(from).and_then(|neighbors| neighbors.get(to)).copied()
    }

    /// Outgoing edges of `token`, if the token is in the graph.
    #[must_use]
    pub fn neighbors(&self, token: &Token) -> Option<&BTreeMap<Token, f64>> {
        self.edges.get(token)
    }

    /// All tokens in key order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.edges.keys()
    }

    /// All edges as `(from, to, rate)`, grouped by source token in key order.
    pub fn edges(&self) -> impl Iterator<Item = (&Token, &Token, f64)> {
        self.edges
            .iter()
            .flat_map(|(from, neighbors)| neighbors.iter().map(move |(to, rate)| (from, to, *rate)))
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Number of directed edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeMap::len).sum()
    }

    /// Whether the graph has no tokens at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl TryFrom<BTreeMap<String, BTreeMap<String, f64>>> for RateGraph {
    type Error = eyre::Report;

    /// Builds a graph from a raw nested map, such as a decoded JSON document.
    ///
    /// Every key becomes a token, even one with no outgoing edges.
    fn try_from(raw: BTreeMap<String, BTreeMap<String, f64>>) -> Result<Self> {
        let mut graph = Self::new();
        for (from, neighbors) in raw {
            let from = Token::from(from);
            graph.add_token(from.clone());
            for (to, rate) in neighbors {
                graph.insert(from.clone(), Token::from(to), rate)?;
            }
        }
        Ok(graph)
    }
}

/// A point-in-time deep copy of the shared graph, consumed by one detection pass.
///
/// A snapshot hands out only shared references to its graph and never changes
/// after it is taken.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    /// Copied graph
    graph: RateGraph,
    /// When the copy was taken
    taken_at: DateTime<Utc>,
}

impl GraphSnapshot {
    /// Freezes `graph` as a snapshot taken now.
    #[must_use]
    pub fn new(graph: RateGraph) -> Self {
        Self {
            graph,
            taken_at: Utc::now(),
        }
    }

    /// When the snapshot was taken.
    #[must_use]
    pub const fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

impl Deref for GraphSnapshot {
    type Target = RateGraph;

    fn deref(&self) -> &RateGraph {
        &self.graph
    }
}
