use std::sync::Arc;
use std::time::Duration;

use itertools::Itertools;
use log::{debug, info, warn};

use crate::arb::graph::PartialUpdate;
use crate::arb::token::{TokenInfo, TokenPair};
use crate::sync::aggregator::GraphAggregator;
use crate::sync::quote::{QuoteSource, Throttled};
use crate::sync::throttler::ApiThrottler;
use crate::utils::shutdown::Shutdown;

/// Builds every directed pair of distinct tokens and deals them round-robin to
/// `workers` subsets (`pairs[i::workers]`).
///
/// The subsets are disjoint and together cover every pair exactly once. Pairs come
/// out in token order, both directions of a pair being separate entries.
#[must_use]
pub fn partition_pairs(tokens: &[TokenInfo], workers: usize) -> Vec<Vec<TokenPair>> {
    let workers = workers.max(1);
    let mut subsets = vec![Vec::new(); workers];
    let pairs = tokens
        .iter()
        .permutations(2)
        .filter(|pair| pair[0].token != pair[1].token)
        .map(|pair| TokenPair {
            from: pair[0].clone(),
            to: pair[1].clone(),
        });
    for (i, pair) in pairs.enumerate() {
        subsets[i % workers].push(pair);
    }
    subsets
}

/// Body of one fetch worker: prices a fixed subset of pairs over and over.
pub struct PriceFetcher {
    /// Worker number, used in log lines
    id: usize,
    /// Pairs this worker owns
    pairs: Vec<TokenPair>,
    /// Where quotes come from
    source: Arc<dyn QuoteSource>,
    /// Shared by every worker
    throttler: Arc<ApiThrottler>,
    /// Limit on a single quote, not counting the throttler wait
    timeout: Duration,
}

impl PriceFetcher {
    /// Creates a new fetch worker.
    #[must_use]
    pub fn new(
        id: usize,
        pairs: Vec<TokenPair>,
        source: Arc<dyn QuoteSource>,
        throttler: Arc<ApiThrottler>,
        timeout: Duration,
    ) -> Self {
        Self {
            id,
            pairs,
            source,
            throttler,
            timeout,
        }
    }

    /// Pairs this worker owns.
    #[must_use]
    pub fn pairs(&self) -> &[TokenPair] {
        &self.pairs
    }

    /// Prices every owned pair once and returns the ones that could be priced.
    ///
    /// Each quote waits for its turn at the throttler first. A pair whose quote fails,
    /// times out or yields an invalid rate is left out of the update. Returns `None`
    /// if shutdown was requested before the round finished.
    pub async fn update_prices(&self, shutdown: &mut Shutdown) -> Option<PartialUpdate> {
        let mut update = PartialUpdate::new();

        for pair in &self.pairs {
            if shutdown.is_triggered() {
                return None;
            }
            tokio::select! {
                () = shutdown.wait() => return None,
                () = self.throttler.acquire() => {}
            }

            let quote = tokio::select! {
                () = shutdown.wait() => return None,
                quote = tokio::time::timeout(self.timeout, self.source.quote(pair)) => quote,
            };

            let rate = match quote {
                Ok(Ok(rate)) => rate,
                Ok(Err(e)) if e.downcast_ref::<Throttled>().is_some() => {
                    warn!(
                        "sync::fetcher[{}]: Throttled by the quote API while pricing {pair}, keeping the previous rate",
                        self.id
                    );
                    continue;
                }
                Ok(Err(e)) => {
                    warn!("sync::fetcher[{}]: Failed to price {pair}: {e}", self.id);
                    continue;
                }
                Err(_) => {
                    warn!(
                        "sync::fetcher[{}]: Quote for {pair} timed out after {:?}",
                        self.id, self.timeout
                    );
                    continue;
                }
            };

            if let Err(e) = update.insert(pair.from.token.clone(), pair.to.token.clone(), rate) {
                warn!("sync::fetcher[{}]: Dropping quote: {e}", self.id);
                continue;
            }
            debug!("sync::fetcher[{}]: {pair} = {rate}", self.id);
        }

        Some(update)
    }

    /// Runs the worker until shutdown, handing every round's update to `aggregator`.
    pub async fn run(self, aggregator: Arc<GraphAggregator>, mut shutdown: Shutdown) {
        if self.pairs.is_empty() {
            info!("sync::fetcher[{}]: No pairs assigned, idling until shutdown", self.id);
            shutdown.wait().await;
            return;
        }

        info!(
            "sync::fetcher[{}]: Starting with {} pairs",
            self.id,
            self.pairs.len()
        );

        while let Some(update) = self.update_prices(&mut shutdown).await {
            if update.edge_count() > 0 {
                aggregator.submit(&update);
            }
            info!(
                "sync::fetcher[{}]: Completed round, priced {} of {} pairs",
                self.id,
                update.edge_count(),
                self.pairs.len()
            );
        }

        info!("sync::fetcher[{}]: Stopped", self.id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::arb::test_helpers::*;
    use crate::utils::shutdown;
    use async_trait::async_trait;
    use eyre::{bail, Result};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    /// Answers from a fixed table, failing pairs it does not know
    struct TableSource {
        rates: Vec<(&'static str, &'static str, f64)>,
    }

    #[async_trait]
    impl QuoteSource for TableSource {
        async fn quote(&self, pair: &TokenPair) -> Result<f64> {
            for (from, to, rate) in &self.rates {
                if pair.from.token.symbol() == *from && pair.to.token.symbol() == *to {
                    return Ok(*rate);
                }
            }
            bail!("no route for {pair}")
        }
    }

    /// Never answers
    struct HangingSource;

    #[async_trait]
    impl QuoteSource for HangingSource {
        async fn quote(&self, _pair: &TokenPair) -> Result<f64> {
            std::future::pending().await
        }
    }

    /// Counts requests and answers every pair with the same rate
    #[derive(Default)]
    struct CountingSource(AtomicUsize);

    #[async_trait]
    impl QuoteSource for CountingSource {
        async fn quote(&self, _pair: &TokenPair) -> Result<f64> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(1.0)
        }
    }

    /// Always throttled
    struct ThrottledSource;

    #[async_trait]
    impl QuoteSource for ThrottledSource {
        async fn quote(&self, _pair: &TokenPair) -> Result<f64> {
            Err(Throttled.into())
        }
    }

    fn tokens() -> Vec<TokenInfo> {
        vec![
            token_info("USDT", 6),
            token_info("ETH", 18),
            token_info("DAI", 18),
        ]
    }

    fn fetcher(source: Arc<dyn QuoteSource>, rate: f64) -> PriceFetcher {
        let pairs = partition_pairs(&tokens(), 1).remove(0);
        PriceFetcher::new(
            0,
            pairs,
            source,
            Arc::new(ApiThrottler::new(rate).unwrap()),
            Duration::from_secs(10),
        )
    }

    #[test]
    fn test_partition_pairs_is_disjoint_and_complete() {
        let subsets = partition_pairs(&tokens(), 4);
        assert_eq!(subsets.len(), 4);

        let all: Vec<String> = subsets.iter().flatten().map(ToString::to_string).collect();
        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(all.len(), 6);
        assert_eq!(unique.len(), 6);
        assert!(unique.contains(&"USDT → ETH".to_string()));
        assert!(unique.contains(&"ETH → USDT".to_string()));

        // Round robin: 6 pairs over 4 workers
        let sizes: Vec<usize> = subsets.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1, 1]);
    }

    #[test]
    fn test_partition_pairs_more_workers_than_pairs() {
        let subsets = partition_pairs(&tokens()[..2], 3);
        assert_eq!(subsets.iter().map(Vec::len).collect::<Vec<_>>(), vec![1, 1, 0]);
        assert_eq!(partition_pairs(&tokens(), 0).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_prices_omits_failed_pairs() {
        let source = Arc::new(TableSource {
            rates: vec![("USDT", "ETH", 0.0005), ("ETH", "USDT", 1999.0), ("DAI", "ETH", -1.0)],
        });
        let (_trigger, mut shutdown) = shutdown::channel();

        let update = fetcher(source, 100.0).update_prices(&mut shutdown).await.unwrap();

        assert_eq!(update.edge_count(), 2);
        assert_eq!(update.rate(&token("USDT"), &token("ETH")), Some(0.0005));
        assert_eq!(update.rate(&token("ETH"), &token("USDT")), Some(1999.0));
        assert_eq!(update.rate(&token("DAI"), &token("ETH")), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_prices_respects_throttler() {
        let source = Arc::new(TableSource { rates: vec![] });
        let (_trigger, mut shutdown) = shutdown::channel();
        let start = Instant::now();

        fetcher(source, 2.0).update_prices(&mut shutdown).await.unwrap();

        // Six requests at two per second: five full gaps of 500ms
        assert!(start.elapsed() >= Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_prices_times_out_slow_quotes() {
        let (_trigger, mut shutdown) = shutdown::channel();
        let update = fetcher(Arc::new(HangingSource), 100.0)
            .update_prices(&mut shutdown)
            .await
            .unwrap();
        assert!(update.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_prices_throttled_is_omitted() {
        let (_trigger, mut shutdown) = shutdown::channel();
        let update = fetcher(Arc::new(ThrottledSource), 100.0)
            .update_prices(&mut shutdown)
            .await
            .unwrap();
        assert!(update.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_prices_stops_on_shutdown() {
        let (trigger, mut shutdown) = shutdown::channel();
        let fetcher = fetcher(Arc::new(HangingSource), 100.0);

        let round = tokio::spawn(async move { fetcher.update_prices(&mut shutdown).await });
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.trigger();

        assert!(round.await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_prices_after_shutdown_sends_nothing() {
        let (trigger, mut shutdown) = shutdown::channel();
        trigger.trigger();
        let source = Arc::new(CountingSource::default());

        for _ in 0..20 {
            let round = fetcher(source.clone(), 100.0).update_prices(&mut shutdown).await;
            assert!(round.is_none());
        }
        assert_eq!(source.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_submits_to_aggregator() {
        let source = Arc::new(TableSource {
            rates: vec![("USDT", "ETH", 0.0005), ("ETH", "DAI", 2000.0)],
        });
        let aggregator = Arc::new(GraphAggregator::new());
        let (trigger, shutdown) = shutdown::channel();

        let worker = tokio::spawn(fetcher(source, 10.0).run(Arc::clone(&aggregator), shutdown));
        tokio::time::sleep(Duration::from_secs(2)).await;
        trigger.trigger();
        worker.await.unwrap();

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.rate(&token("USDT"), &token("ETH")), Some(0.0005));
        assert_eq!(snapshot.rate(&token("ETH"), &token("DAI")), Some(2000.0));
        assert!(aggregator.submissions() >= 1);
    }
}
