use std::time::Duration;

use eyre::{bail, eyre, Result};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Process wide gate keeping all fetch workers together under a request rate ceiling.
///
/// Admissions are strictly serialized: no two callers are admitted closer together
/// than `1 / rate` seconds. Waiting callers are admitted in the order they started
/// waiting, because the lock they queue on is fair.
///
/// The last admission instant lives behind its own lock, unrelated to the graph lock.
#[derive(Debug)]
pub struct ApiThrottler {
    /// Minimum spacing between two admissions
    min_interval: Duration,
    /// Instant of the last admission, `None` before the first one
    last_request: Mutex<Option<Instant>>,
}

impl ApiThrottler {
    /// Creates a throttler admitting at most `rate_limit_per_second` requests per second.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate is not a positive finite number.
    pub fn new(rate_limit_per_second: f64) -> Result<Self> {
        if !rate_limit_per_second.is_finite() || rate_limit_per_second <= 0.0 {
            bail!("Rate limit must be a positive number of requests per second, got {rate_limit_per_second}");
        }
        let min_interval = Duration::try_from_secs_f64(1.0 / rate_limit_per_second)
            .map_err(|e| eyre!("Rate limit {rate_limit_per_second} gives an unusable request interval: {e}"))?;
        Ok(Self {
            min_interval,
            last_request: Mutex::new(None),
        })
    }

    /// Minimum spacing between two admissions.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until issuing a request now would respect the rate limit, then records
    /// the admission and returns.
    ///
    /// The lock is held across the wait so the next caller measures its own wait from
    /// this admission. Dropping the returned future while it waits gives up the turn
    /// without recording an admission.
    pub async fn acquire(&self) {
        let mut last_request = self.last_request.lock().await;
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last_request = Some(Instant::now());
    }
}
