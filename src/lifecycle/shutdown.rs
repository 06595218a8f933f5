//! Shutdown coordination for the gateway.

use tokio::sync::broadcast;

/// Owner side of the shutdown signal.
///
/// Triggering it, or dropping it, releases every [`ShutdownListener`].
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

/// Task side of the shutdown signal.
pub struct ShutdownListener {
    rx: broadcast::Receiver<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    pub fn trigger(&self) {
        if self.tx.send(()).is_err() {
            tracing::debug!("Shutdown triggered with no listeners");
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    /// Resolve once shutdown is triggered or the owner is gone.
    pub async fn wait(mut self) {
        // Closed and lagged both mean the signal was sent or can never be.
        let _ = self.rx.recv().await;
    }
}
