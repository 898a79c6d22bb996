use std::cmp::Reverse;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::backend::{BoxStream, Mutation, QueueBackend};
use crate::consistency::ConsistencyLog;
use crate::query::QueueFilters;
use crate::types::{QueueEvent, QueueId, QueueItem, QueueState, Transition};
use crate::{PublishError, PublishResult};

type Entry = Arc<Mutex<QueueItem>>;

/// In-memory backend with one lock per entry
#[derive(Clone)]
pub struct MemoryBackend {
    /// Entries indexed by queue_id
    pub(crate) entries: Arc<DashMap<QueueId, Entry>>,

    /// Event broadcaster for live refresh
    pub(crate) event_broadcaster: broadcast::Sender<QueueEvent>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_event_capacity(1000)
    }

    pub fn with_event_capacity(capacity: usize) -> Self {
        let (event_broadcaster, _) = broadcast::channel(capacity.max(1));
        Self {
            entries: Arc::new(DashMap::new()),
            event_broadcaster,
        }
    }

    fn entry(&self, queue_id: &QueueId) -> PublishResult<Entry> {
        // Clone the handle out so the shard lock is released before locking the entry
        self.entries
            .get(queue_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PublishError::not_found(format!("queue entry {queue_id}")))
    }

    fn snapshots(&self) -> Vec<QueueItem> {
        let handles: Vec<Entry> = self.entries.iter().map(|entry| entry.value().clone()).collect();
        handles.iter().map(|entry| entry.lock().clone()).collect()
    }

    fn emit(&self, entry: &QueueItem) {
        let _ = self.event_broadcaster.send(QueueEvent::from_record(entry));
    }

    /// Backdate an entry's transmit start (test helper)
    pub fn backdate_transmit(&self, queue_id: &QueueId, by: chrono::Duration) -> PublishResult<()> {
        let entry = self.entry(queue_id)?;
        let mut record = entry.lock();
        if let Some(started) = record.transmit_started_at {
            record.transmit_started_at = Some(started - by);
        }
        Ok(())
    }
}

#[async_trait]
impl QueueBackend for MemoryBackend {
    async fn insert(&self, entry: QueueItem) -> PublishResult<()> {
        match self.entries.entry(entry.queue_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(PublishError::Internal(format!(
                "queue entry {} already exists",
                entry.queue_id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                self.emit(&entry);
                slot.insert(Arc::new(Mutex::new(entry)));
                Ok(())
            }
        }
    }

    async fn get(&self, queue_id: &QueueId) -> PublishResult<QueueItem> {
        let entry = self.entry(queue_id)?;
        let snapshot = entry.lock().clone();
        Ok(snapshot)
    }

    async fn apply(
        &self,
        queue_id: &QueueId,
        mutation: Mutation,
        journal: &ConsistencyLog,
    ) -> PublishResult<(Transition, QueueItem)> {
        let entry = self.entry(queue_id)?;
        let mut record = entry.lock();
        let now = Utc::now();

        let transition = match mutation {
            Mutation::Transport { state, error_message } => record.apply_transport_state(state, error_message, now)?,
            Mutation::Cancel => record.cancel(now)?,
        };

        if transition == Transition::Applied {
            journal.append(&record);
            self.emit(&record);
        }
        Ok((transition, record.clone()))
    }

    async fn query(
        &self,
        filters: &QueueFilters,
        offset: usize,
        limit: usize,
    ) -> PublishResult<(Vec<QueueItem>, usize)> {
        let mut matching: Vec<QueueItem> = self
            .snapshots()
            .into_iter()
            .filter(|entry| filters.matches(entry))
            .collect();
        matching.sort_by_key(|entry| Reverse((entry.created_at, entry.queue_id.clone())));

        let total = matching.len();
        let page = matching.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    async fn count(&self) -> PublishResult<usize> {
        Ok(self.entries.len())
    }

    async fn in_progress_before(&self, cutoff: DateTime<Utc>) -> PublishResult<Vec<QueueId>> {
        Ok(self
            .snapshots()
            .into_iter()
            .filter(|entry| {
                entry.state == QueueState::InProgress
                    && entry.transmit_started_at.map(|started| started < cutoff).unwrap_or(false)
            })
            .map(|entry| entry.queue_id)
            .collect())
    }

    fn event_stream(&self) -> BoxStream<QueueEvent> {
        let receiver = self.event_broadcaster.subscribe();
        use tokio_stream::{wrappers::BroadcastStream, StreamExt};
        let stream = BroadcastStream::new(receiver).filter_map(|result| result.ok());

        Box::pin(stream)
    }
}
