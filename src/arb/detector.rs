//! # Negative cycle detection
//!
//! A cycle of trades is profitable when the product of its rates exceeds 1. Taking
//! `-ln(rate)` as the weight of every edge turns that product into a sum which is
//! negative exactly when the cycle is profitable, so arbitrage becomes negative cycle
//! detection and Bellman-Ford applies.
//!
//! The detector runs a single-source Bellman-Ford pass, then looks at every edge that
//! can still be relaxed. Each such edge leads, through the predecessor chain, into a
//! negative cycle which is extracted and reported once.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, warn};

use super::cycle::Cycle;
use super::graph::RateGraph;
use super::opportunity::ArbitrageOpportunity;
use super::token::Token;

/// Edge weights of the log transformed graph, `from → (to → -ln(rate))`.
pub type WeightedGraph = BTreeMap<Token, BTreeMap<Token, f64>>;

/// Finds every arbitrage cycle reachable from one start token of a rate graph.
///
/// The detector keeps no state between runs: each call is a pure function of the
/// graph it was created with.
#[derive(Debug, Clone, Copy)]
pub struct ArbitrageDetector<'a> {
    /// Graph being searched, usually a snapshot of the shared graph
    graph: &'a RateGraph,
}

impl<'a> ArbitrageDetector<'a> {
    /// Creates a detector over `graph`.
    #[must_use]
    pub const fn new(graph: &'a RateGraph) -> Self {
        Self { graph }
    }

    /// Transforms the rates into `-ln(rate)` weights.
    ///
    /// Every token of the graph is a key of the result, including tokens without
    /// outgoing edges.
    #[must_use]
    pub fn transform_graph(&self) -> WeightedGraph {
        self.graph
            .tokens()
            .map(|token| {
                let weights = self
                    .graph
                    .neighbors(token)
                    .into_iter()
                    .flatten()
                    // Rates are validated positive on insertion
                    .map(|(neighbor, rate)| (neighbor.clone(), -rate.ln()))
                    .collect();
                (token.clone(), weights)
            })
            .collect()
    }

    /// The first token in key order with at least one outgoing edge.
    ///
    /// A token that can only be bought relaxes nothing, so starting from it would
    /// hide every cycle in the graph.
    #[must_use]
    pub fn start_token(&self) -> Option<&'a Token> {
        let graph = self.graph;
        graph
            .tokens()
            .find(|token| graph.neighbors(token).is_some_and(|neighbors| !neighbors.is_empty()))
    }

    /// Detects every arbitrage opportunity reachable from [`Self::start_token`].
    ///
    /// An empty graph, a graph without edges or a graph whose cycles are all
    /// unprofitable gives an empty list.
    #[must_use]
    pub fn detect(&self) -> Vec<ArbitrageOpportunity> {
        let Some(start) = self.start_token() else {
            return Vec::new();
        };

        let opportunities: Vec<_> = self
            .bellman_ford_all_cycles(start)
            .into_iter()
            .filter_map(|cycle| {
                let path = cycle.to_string();
                let opportunity = ArbitrageOpportunity::price(cycle, self.graph);
                if opportunity.is_none() {
                    debug!("arb::detector: Dropping cycle {path}, not profitable at original rates");
                }
                opportunity
            })
            .collect();

        debug!(
            "arb::detector: Found {} opportunities across {} tokens and {} edges",
            opportunities.len(),
            self.graph.len(),
            self.graph.edge_count()
        );
        opportunities
    }

    /// Runs Bellman-Ford once from `start` and extracts every distinct negative cycle.
    ///
    /// Cycles are returned in the order they are first found, each one exactly once.
    /// A start token that is not in the graph gives an empty list.
    #[must_use]
    pub fn bellman_ford_all_cycles(&self, start: &Token) -> Vec<Cycle> {
        let transformed = self.transform_graph();
        if !transformed.contains_key(start) {
            warn!("arb::detector: Start token {start} is missing from the graph, skipping");
            return Vec::new();
        }

        // Index tokens so the relaxation works on plain vectors
        let tokens: Vec<&Token> = transformed.keys().collect();
        let index: HashMap<&Token, usize> = tokens.iter().enumerate().map(|(i, t)| (*t, i)).collect();
        let edges: Vec<(usize, usize, f64)> = transformed
            .iter()
            .flat_map(|(from, neighbors)| {
                let from = index[from];
                neighbors
                    .iter()
                    .filter_map(|(to, weight)| index.get(to).map(|to| (from, *to, *weight)))
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut distances = vec![f64::INFINITY; tokens.len()];
        let mut predecessors: Vec<Option<usize>> = vec![None; tokens.len()];
        distances[index[start]] = 0.0;

        for _ in 1..tokens.len() {
            for &(from, to, weight) in &edges {
                if distances[from] + weight < distances[to] {
                    distances[to] = distances[from] + weight;
                    predecessors[to] = Some(from);
                }
            }
        }

        let mut cycles = Vec::new();
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        for &(from, to, weight) in &edges {
            if distances[from] + weight >= distances[to] {
                continue;
            }
            let Some(cycle) = extract_cycle(&predecessors, to) else {
                continue;
            };
            if !seen.insert(cycle.clone()) {
                continue;
            }
            match Cycle::new(cycle.iter().map(|&i| tokens[i].clone()).collect()) {
                Ok(cycle) => cycles.push(cycle),
                Err(e) => warn!("arb::detector: Discarding malformed cycle: {e}"),
            }
        }
        cycles
    }
}

/// Extracts the cycle that the predecessor chain of `from` runs into.
///
/// Walks predecessors until a token repeats. The repeated token lies on the cycle;
/// walking the cycle once more from it and reversing gives the tokens in trade order,
/// with the first token repeated at the end.
///
/// Returns `None` if the chain ends at a token without a predecessor.
fn extract_cycle(predecessors: &[Option<usize>], from: usize) -> Option<Vec<usize>> {
    let mut visited = vec![false; predecessors.len()];
    let mut current = from;
    while !visited[current] {
        visited[current] = true;
        current = predecessors[current]?;
    }

    let cycle_start = current;
    let mut cycle = vec![cycle_start];
    current = predecessors[cycle_start]?;
    while current != cycle_start {
        if cycle.len() > predecessors.len() {
            return None;
        }
        cycle.push(current);
        current = predecessors[current]?;
    }
    cycle.push(cycle_start);
    cycle.reverse();
    Some(cycle)
}
