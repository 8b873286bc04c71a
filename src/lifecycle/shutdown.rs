//! Shutdown coordination for the proxy.
//!
//! The accept loop and the dashboard each hold a receiver. The first
//! `trigger` wakes all of them; receiverr calls only report that shutdown is
//! already under way.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcasts a single stop request to every long-running task.
///
/// Subscribe before triggering; receivers created afterwards miss the signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask every subscriber to stop. Returns false if shutdown was already
    /// triggered.
    pub fn trigger(&self) -> bool {
        if self.triggered.swap(true, Ordering::AcqRel) {
            return false;
        }
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::info!(tasks = notified, "Shutdown triggered");
        true
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn all_subscribers_are_notified() {
        let shutdown = Shutdown::new();
        let mut server = shutdown.subscribe();
        let mut dashboard = shutdown.clone().subscribe();

        assert!(shutdown.trigger());
        assert!(server.recv().await.is_ok());
        assert!(dashboard.recv().await.is_ok());
    }

    #[test]
    fn only_the_first_trigger_counts() {
        let shutdown = Shutdown::new();
        let clone = shutdown.clone();
        let mut receiver = clone.subscribe();

        assert!(shutdown.trigger());
        assert!(!clone.trigger());
        assert!(receiver.try_recv().is_ok());
        // The second trigger sent nothing.
        assert!(receiver.try_recv().is_err());
    }
}
