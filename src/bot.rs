use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use futures::future::join_all;
use log::{debug, error, info};

use crate::arb::detector::ArbitrageDetector;
use crate::arb::graph::GraphSnapshot;
use crate::arb::opportunity::ArbitrageOpportunity;
use crate::config::Config;
use crate::notify::{AlertDispatcher, Notifier};
use crate::sync::{partition_pairs, ApiThrottler, GraphAggregator, PriceFetcher, QuoteSource};
use crate::utils::shutdown::Shutdown;

/// Wires fetch workers, the shared graph and periodic detection together.
///
/// Every worker and the detection loop is its own task. They only meet inside the
/// aggregator's short critical sections and the throttler.
pub struct Driver {
    /// Shared rate graph
    aggregator: Arc<GraphAggregator>,
    /// One per worker, each owning a disjoint subset of pairs
    fetchers: Vec<PriceFetcher>,
    /// Sinks for detected opportunities
    notifiers: Vec<Arc<dyn Notifier>>,
    /// Time between detection passes
    detect_interval: Duration,
}

impl Driver {
    /// Builds the pipeline described by `config`, quoting through `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate limit is invalid.
    pub fn new(
        config: &Config,
        source: Arc<dyn QuoteSource>,
        notifiers: Vec<Arc<dyn Notifier>>,
    ) -> Result<Self> {
        let throttler = Arc::new(ApiThrottler::new(config.rate_limit)?);
        debug!("Quote requests spaced at least {:?} apart", throttler.min_interval());
        let fetchers = partition_pairs(&config.tokens, config.workers)
            .into_iter()
            .enumerate()
            .map(|(id, pairs)| {
                PriceFetcher::new(
                    id,
                    pairs,
                    Arc::clone(&source),
                    Arc::clone(&throttler),
                    config.fetch_timeout,
                )
            })
            .collect();

        Ok(Self {
            aggregator: Arc::new(GraphAggregator::new()),
            fetchers,
            notifiers,
            detect_interval: config.detect_interval,
        })
    }

    /// The shared graph the workers feed.
    #[must_use]
    pub fn aggregator(&self) -> Arc<GraphAggregator> {
        Arc::clone(&self.aggregator)
    }

    /// Runs every task until `shutdown` fires, then waits for all of them to stop.
    pub async fn run(self, shutdown: Shutdown) {
        info!(
            "Starting {} fetch workers, detecting every {:?}",
            self.fetchers.len(),
            self.detect_interval
        );

        let mut tasks = Vec::with_capacity(self.fetchers.len() + 1);
        for fetcher in self.fetchers {
            tasks.push(tokio::spawn(
                fetcher.run(Arc::clone(&self.aggregator), shutdown.clone()),
            ));
        }

        let dispatcher = AlertDispatcher::new(self.notifiers);
        tasks.push(tokio::spawn(detection_loop(
            Arc::clone(&self.aggregator),
            dispatcher,
            self.detect_interval,
            shutdown,
        )));

        for result in join_all(tasks).await {
            if let Err(e) = result {
                error!("Pipeline task failed: {e}");
            }
        }
        info!("All pipeline tasks stopped");
    }
}

/// Sleeps `interval`, detects on a fresh snapshot and dispatches what it finds, until shutdown.
async fn detection_loop(
    aggregator: Arc<GraphAggregator>,
    dispatcher: AlertDispatcher,
    interval: Duration,
    mut shutdown: Shutdown,
) {
    loop {
        tokio::select! {
            () = shutdown.wait() => break,
            () = tokio::time::sleep(interval) => {}
        }

        let snapshot = aggregator.snapshot();
        if snapshot.is_empty() {
            debug!("arb::detector: Graph still empty, skipping detection");
            continue;
        }

        debug!(
            "arb::detector: Scanning {} edges from snapshot taken at {}",
            snapshot.edge_count(),
            snapshot.taken_at().format("%H:%M:%S%.3f")
        );
        match detect(snapshot).await {
            Ok(opportunities) => {
                for opportunity in opportunities {
                    info!("arb::detector: Found {}", opportunity.summary());
                    dispatcher.dispatch(opportunity).await;
                }
            }
            Err(e) => error!("arb::detector: Detection pass failed: {e}"),
        }
    }

    dispatcher.close().await;
    info!("arb::detector: Stopped");
}

/// Runs one detection pass over `snapshot` on the blocking pool.
///
/// # Errors
///
/// Returns an error if the detection task panicked.
pub async fn detect(snapshot: GraphSnapshot) -> Result<Vec<ArbitrageOpportunity>> {
    let opportunities =
        tokio::task::spawn_blocking(move || ArbitrageDetector::new(&snapshot).detect()).await?;
    Ok(opportunities)
}
