#[cfg(feature = "memory")]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::pin::Pin;

use crate::consistency::ConsistencyLog;
use crate::query::QueueFilters;
use crate::types::{QueueEvent, QueueId, QueueItem, QueueState, Transition};
use crate::PublishResult;

/// Type alias for boxed streams
pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// State change applied to one entry under its lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Transport reported (or was deemed to report) a new state
    Transport {
        state: QueueState,
        error_message: Option<String>,
    },
    Cancel,
}

/// Storage primitives for queue entries.
///
/// Mutations of one entry are serialized; unrelated entries must be able to
/// change in parallel.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Store a new entry
    async fn insert(&self, entry: QueueItem) -> PublishResult<()>;

    /// Get a snapshot of an entry
    async fn get(&self, queue_id: &QueueId) -> PublishResult<QueueItem>;

    /// Apply a mutation atomically, returning the outcome and resulting snapshot.
    ///
    /// An applied change is appended to `journal` before the entry is
    /// released, so the log order per entry matches the transition order.
    async fn apply(
        &self,
        queue_id: &QueueId,
        mutation: Mutation,
        journal: &ConsistencyLog,
    ) -> PublishResult<(Transition, QueueItem)>;

    /// Matching entries newest first, sliced by `offset`/`limit`, plus the full match count
    async fn query(
        &self,
        filters: &QueueFilters,
        offset: usize,
        limit: usize,
    ) -> PublishResult<(Vec<QueueItem>, usize)>;

    /// Total number of entries
    async fn count(&self) -> PublishResult<usize>;

    /// Ids of entries in progress since before `cutoff`
    async fn in_progress_before(&self, cutoff: DateTime<Utc>) -> PublishResult<Vec<QueueId>>;

    /// Live state-change events
    fn event_stream(&self) -> BoxStream<QueueEvent>;
}
