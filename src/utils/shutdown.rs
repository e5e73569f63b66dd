use tokio::sync::watch;

/// Creates a connected shutdown trigger and signal.
#[must_use]
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// Sending half of the cooperative shutdown signal, held by whoever decides the process stops.
#[derive(Debug)]
pub struct ShutdownTrigger {
    /// Flips to `true` once
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Asks every task holding a [`Shutdown`] to stop at its next suspension point.
    pub fn trigger(&self) {
        // No receivers left means nothing is running anymore
        let _ = self.tx.send(true);
    }
}

/// Receiving half of the shutdown signal, cloned into every long running task.
///
/// Dropping the trigger counts as a shutdown request.
#[derive(Debug, Clone)]
pub struct Shutdown {
    /// Observes the trigger's flag
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Completes once shutdown has been requested.
    pub async fn wait(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
