//! # dog-publish: Publish queue for editorial content
//!
//! Dispatches finalized content items to external subscribers (wire services,
//! newspapers, partner feeds) over heterogeneous transports, and tracks every
//! dispatch attempt through its lifecycle.
//!
//! - **Admission**: subscriber capabilities, the bound content filter and
//!   opted-in global filters are checked before an entry exists
//! - **State machine**: `pending -> in-progress -> success | error`, with
//!   cancel and resend as explicit commands; resend always creates a new entry
//! - **Idempotent completions**: repeated transport events are no-ops, events
//!   contradicting a terminal state are rejected as stale
//! - **Per-entry locking**: unrelated entries transition in parallel
//! - **Bulk commands** with per-id outcomes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dog_publish::prelude::*;
//!
//! # async fn run() -> PublishResult<()> {
//! let evaluator = ContentFilterEvaluator::new(Arc::new(FilterCatalogue::new()));
//! let queue = PublishQueue::in_memory(PublishConfig::default(), evaluator)?;
//! let pump = queue.start()?;
//!
//! let subscriber = queue.directory().save(
//!     Subscriber::new("Partner feed", SubscriberType::Wire).with_destination(Destination::new(
//!         "drop",
//!         "anpa",
//!         DestinationConfig::File(FileConfig { path: "/srv/outgoing".into() }),
//!     )),
//! )?;
//!
//! let item = ContentItem::new("urn:story:1", 1, "AAP-1", "Rates on hold");
//! let entry = queue.enqueue(&item, &subscriber.id, "drop", PublishingAction::Publish).await?;
//! println!("queued {}", entry.queue_id);
//!
//! pump.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod consistency;
pub mod directory;
pub mod engine;
pub mod error;
pub mod filter;
pub mod format;
pub mod observability;
pub mod query;
pub mod reaper;
pub mod store;
pub mod transport;
pub mod types;

pub use backend::QueueBackend;
#[cfg(feature = "memory")]
pub use backend::memory::MemoryBackend;
pub use config::PublishConfig;
pub use consistency::{ConsistencyLog, ConsistencyRecord};
pub use directory::{SubscriberDirectory, SubscriberDraft};
pub use engine::{BatchOutcome, PublishQueue, PublishRequest, WorkerHandle};
pub use error::{PublishError, PublishResult};
pub use filter::{Admission, ContentFilterEvaluator, FilterCatalogue, FilterMatcher, FilterRule};
pub use format::{FormatterRegistry, ItemFormatter};
pub use observability::LiveMetrics;
pub use query::{Dashboard, QueryPage, QueueFilters, QueueQuery, QueueView};
pub use reaper::DispatchReaper;
pub use store::{ContentStore, MemoryContentStore};
pub use transport::{CompletionReporter, Delivery, Transport, TransportRegistry};
pub use types::{
    BulkActions, ContentFilterBinding, ContentItem, Destination, DestinationConfig, FilterType, FormattedItem,
    PublishingAction, QueueEvent, QueueId, QueueItem, QueueState, Subscriber, SubscriberId, SubscriberType,
    Transition, TransportEvent, TransportKind,
};

pub mod prelude {
    // Queue and directory
    pub use crate::{PublishQueue, PublishConfig, SubscriberDirectory, SubscriberDraft, QueueBackend};

    #[cfg(feature = "memory")]
    pub use crate::MemoryBackend;

    // Essential types
    pub use crate::{
        BatchOutcome, ContentItem, Destination, DestinationConfig, PublishError, PublishResult,
        PublishingAction, QueueId, QueueItem, QueueState, Subscriber, SubscriberId, SubscriberType,
    };
    pub use crate::types::{EmailConfig, FileConfig, FtpConfig, HttpPushConfig, OdbcConfig, PullConfig};

    // Collaborators
    pub use crate::{
        ContentFilterEvaluator, ContentStore, FilterCatalogue, FilterMatcher, FilterRule, Transport,
        TransportRegistry,
    };

    // Query layer
    pub use crate::{QueueFilters, QueueQuery, QueueView};

    pub use async_trait::async_trait;
}
