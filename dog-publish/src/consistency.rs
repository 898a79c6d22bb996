//! Append-only audit trail of queue lifecycle events.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::{QueueId, QueueItem, QueueState, SubscriberId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyRecord {
    /// Position in the log, starting at 1
    pub sequence: u64,
    pub queue_id: QueueId,
    pub subscriber_id: SubscriberId,
    pub item_id: String,
    pub item_version: u32,
    pub state: QueueState,
    pub error_message: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Written only by the queue engine
#[derive(Debug, Default)]
pub struct ConsistencyLog {
    records: RwLock<Vec<ConsistencyRecord>>,
}

impl ConsistencyLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the entry's current state
    pub fn append(&self, entry: &QueueItem) -> u64 {
        let mut records = self.records.write();
        let sequence = records.len() as u64 + 1;
        records.push(ConsistencyRecord {
            sequence,
            queue_id: entry.queue_id.clone(),
            subscriber_id: entry.subscriber_id.clone(),
            item_id: entry.item_id.clone(),
            item_version: entry.item_version,
            state: entry.state,
            error_message: entry.error_message.clone(),
            recorded_at: entry.updated_at,
        });
        sequence
    }

    /// Newest first, at most `limit` records
    pub fn recent(&self, limit: usize) -> Vec<ConsistencyRecord> {
        self.records.read().iter().rev().take(limit).cloned().collect()
    }

    pub fn for_entry(&self, queue_id: &QueueId) -> Vec<ConsistencyRecord> {
        self.records
            .read()
            .iter()
            .filter(|record| &record.queue_id == queue_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentItem, Destination, DestinationConfig, FormattedItem, PublishingAction, PullConfig};
    use std::sync::Arc;

    fn entry() -> QueueItem {
        QueueItem::new(
            &ContentItem::new("urn:1", 1, "AAP-1", "Storm warning"),
            SubscriberId::from("sub"),
            Destination::new("pull", "text", DestinationConfig::Pull(PullConfig {})),
            PublishingAction::Publish,
            FormattedItem::new("text", "Storm warning"),
        )
    }

    #[test]
    fn test_recent_is_newest_first() {
        let log = ConsistencyLog::new();
        let first = entry();
        let second = entry();
        log.append(&first);
        log.append(&second);
        log.append(&first);

        let recent = log.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].sequence, 3);
        assert_eq!(recent[1].queue_id, second.queue_id);
        assert_eq!(log.for_entry(&first.queue_id).len(), 2);
    }

    #[test]
    fn test_concurrent_appends_keep_sequences_dense() {
        let log = Arc::new(ConsistencyLog::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        log.append(&entry());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut sequences: Vec<u64> = log.recent(usize::MAX).into_iter().map(|r| r.sequence).collect();
        sequences.sort_unstable();
        assert_eq!(sequences, (1..=200).collect::<Vec<u64>>());
    }
}
