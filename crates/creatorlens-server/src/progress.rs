//! Registry of live progress subscribers for long-running jobs.

use std::collections::HashMap;

use creatorlens_knowledge::ProgressEvent;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Tracks the active progress streams for each running job, keyed by
/// creator id. Lives on `AppState` so handlers and background tasks share
/// one instance and tests can construct their own.
#[derive(Default)]
pub struct ProgressRegistry {
    subscribers: Mutex<HashMap<i64, Vec<UnboundedSender<ProgressEvent>>>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for a job and return its receiving end.
    pub fn subscribe(&self, job_id: i64) -> UnboundedReceiver<ProgressEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().entry(job_id).or_default().push(tx);
        rx
    }

    /// Send an event to every live subscriber of a job. Subscribers whose
    /// receiving end has been dropped are pruned.
    pub fn broadcast(&self, job_id: i64, event: &ProgressEvent) {
        let mut subs = self.subscribers.lock();
        if let Some(senders) = subs.get_mut(&job_id) {
            senders.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// Drop all subscribers for a finished job, closing their streams.
    pub fn remove(&self, job_id: i64) {
        self.subscribers.lock().remove(&job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use creatorlens_knowledge::Stage;

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let registry = ProgressRegistry::new();
        let mut rx1 = registry.subscribe(1);
        let mut rx2 = registry.subscribe(1);

        registry.broadcast(1, &ProgressEvent::new(Stage::Summaries, "working", 0.1));

        assert_eq!(rx1.recv().await.unwrap().message, "working");
        assert_eq!(rx2.recv().await.unwrap().message, "working");
    }

    #[tokio::test]
    async fn test_remove_closes_streams() {
        let registry = ProgressRegistry::new();
        let mut rx = registry.subscribe(7);
        registry.remove(7);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let registry = ProgressRegistry::new();
        let rx = registry.subscribe(3);
        drop(rx);

        registry.broadcast(3, &ProgressEvent::new(Stage::Topics, "still going", 0.6));
        assert!(registry.subscribers.lock().get(&3).unwrap().is_empty());

        let mut rx2 = registry.subscribe(3);
        registry.broadcast(3, &ProgressEvent::new(Stage::Done, "done", 1.0));
        assert_eq!(rx2.recv().await.unwrap().stage, Stage::Done);
    }

    #[tokio::test]
    async fn test_jobs_are_isolated() {
        let registry = ProgressRegistry::new();
        let mut rx_a = registry.subscribe(1);
        let _rx_b = registry.subscribe(2);

        registry.broadcast(1, &ProgressEvent::new(Stage::Profile, "only job 1", 0.8));
        assert_eq!(rx_a.recv().await.unwrap().message, "only job 1");

        registry.broadcast(2, &ProgressEvent::error("only job 2"));
        assert!(rx_a.try_recv().is_err());
    }
}
