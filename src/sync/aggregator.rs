use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use parking_lot::Mutex;

use crate::arb::graph::{GraphSnapshot, PartialUpdate, RateGraph};

/// Sole owner of the shared rate graph and the only way to change it.
///
/// Merging an update and taking a snapshot both happen under one short lock, so a
/// snapshot never sees half of an update. The lock is only ever held for in-memory
/// work proportional to the graph size, never across a suspension point.
#[derive(Debug, Default)]
pub struct GraphAggregator {
    /// The shared graph
    graph: Mutex<RateGraph>,
    /// Number of updates merged so far
    submissions: AtomicU64,
}

impl GraphAggregator {
    /// Creates an aggregator around an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an aggregator seeded with `graph`.
    #[must_use]
    pub fn with_graph(graph: RateGraph) -> Self {
        Self {
            graph: Mutex::new(graph),
            submissions: AtomicU64::new(0),
        }
    }

    /// Merges `update` into the shared graph.
    ///
    /// Every edge of `update` overwrites the shared value for that edge; edges it does
    /// not mention are left untouched. Updates are applied in the order callers get
    /// the lock.
    pub fn submit(&self, update: &PartialUpdate) {
        let (tokens, edges) = {
            let mut graph = self.graph.lock();
            graph.merge(update);
            (graph.len(), graph.edge_count())
        };
        let count = self.submissions.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            "sync::aggregator: Merged update #{count} with {} edges, graph now has {tokens} tokens and {edges} edges",
            update.edge_count()
        );
    }

    /// Returns an independent copy of the graph as it is between two merges.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        let graph = self.graph.lock().clone();
        GraphSnapshot::new(graph)
    }

    /// Number of updates merged so far.
    #[must_use]
    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::Relaxed)
    }
}
