use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::types::SubscriberId;

/// Live counters for queue operations
#[derive(Debug, Default)]
pub struct LiveMetrics {
    enqueued: AtomicU64,
    rejected: AtomicU64,
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    canceled: AtomicU64,
    resent: AtomicU64,
    stale_events: AtomicU64,
    timed_out: AtomicU64,

    // Per-subscriber counts
    subscribers: DashMap<SubscriberId, SubscriberMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberMetrics {
    pub enqueued: u64,
    pub rejected: u64,
    pub failed: u64,
}

/// Point-in-time copy of the global counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub enqueued: u64,
    pub rejected: u64,
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub canceled: u64,
    pub resent: u64,
    pub stale_events: u64,
    pub timed_out: u64,
}

impl LiveMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&self, subscriber_id: &SubscriberId) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        self.subscribers.entry(subscriber_id.clone()).or_default().enqueued += 1;
    }

    pub fn record_rejected(&self, subscriber_id: &SubscriberId) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        self.subscribers.entry(subscriber_id.clone()).or_default().rejected += 1;
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self, subscriber_id: &SubscriberId) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.subscribers.entry(subscriber_id.clone()).or_default().failed += 1;
    }

    pub fn record_canceled(&self) {
        self.canceled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resent(&self) {
        self.resent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_event(&self) {
        self.stale_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscriber(&self, subscriber_id: &SubscriberId) -> SubscriberMetrics {
        self.subscribers
            .get(subscriber_id)
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            canceled: self.canceled.load(Ordering::Relaxed),
            resent: self.resent.load(Ordering::Relaxed),
            stale_events: self.stale_events.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = LiveMetrics::new();
        let reuters = SubscriberId::from("reuters");

        metrics.record_enqueued(&reuters);
        metrics.record_enqueued(&reuters);
        metrics.record_rejected(&reuters);
        metrics.record_failed(&reuters);
        metrics.record_stale_event();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.enqueued, 2);
        assert_eq!(snapshot.stale_events, 1);
        assert_eq!(
            metrics.subscriber(&reuters),
            SubscriberMetrics { enqueued: 2, rejected: 1, failed: 1 }
        );
        assert_eq!(metrics.subscriber(&SubscriberId::from("aap")), SubscriberMetrics::default());
    }
}
