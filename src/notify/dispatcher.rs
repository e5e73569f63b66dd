use std::sync::Arc;

use log::{debug, error};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use super::Notifier;
use crate::arb::opportunity::ArbitrageOpportunity;

/// Capacity of the opportunity queue in front of the notifiers
const ALERT_CHANNEL_SIZE: usize = 1000;

/// Hands opportunities to every notifier without making the caller wait for delivery.
///
/// Each opportunity is delivered to each notifier in its own task. A failed delivery
/// is logged and dropped, it is never retried and never reaches the caller.
#[derive(Debug)]
pub struct AlertDispatcher {
    /// Queue feeding the delivery task
    tx: mpsc::Sender<Arc<ArbitrageOpportunity>>,
    /// Delivery task, finishes once the queue is closed and drained
    worker: JoinHandle<()>,
}

impl AlertDispatcher {
    /// Starts the delivery task. Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Arc<ArbitrageOpportunity>>(ALERT_CHANNEL_SIZE);

        let worker = tokio::spawn(async move {
            let mut deliveries = JoinSet::new();
            while let Some(opportunity) = rx.recv().await {
                for notifier in &notifiers {
                    let notifier = Arc::clone(notifier);
                    let opportunity = Arc::clone(&opportunity);
                    deliveries.spawn(async move {
                        match notifier.notify(&opportunity).await {
                            Ok(()) => debug!(
                                "notify::dispatcher: Delivered {} via {}",
                                opportunity.summary(),
                                notifier.name()
                            ),
                            Err(e) => error!(
                                "notify::dispatcher: Failed to deliver {} via {}: {e}",
                                opportunity.summary(),
                                notifier.name()
                            ),
                        }
                    });
                }
                // Reap finished deliveries so the set does not grow unbounded
                while deliveries.try_join_next().is_some() {}
            }
            while deliveries.join_next().await.is_some() {}
        });

        Self { tx, worker }
    }

    /// Queues `opportunity` for delivery to every notifier.
    pub async fn dispatch(&self, opportunity: ArbitrageOpportunity) {
        if let Err(e) = self.tx.send(Arc::new(opportunity)).await {
            error!("notify::dispatcher: Error sending opportunity to dispatcher: {e}");
        }
    }

    /// Stops accepting opportunities and waits for queued deliveries to finish.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            error!("notify::dispatcher: Delivery task failed: {e}");
        }
    }
}
