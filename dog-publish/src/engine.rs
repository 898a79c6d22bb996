//! Queue engine: admission, dispatch and the entry state machine.
//!
//! `enqueue` returns as soon as the entry is stored as pending. Dispatch runs
//! on its own task; transports report completion through the
//! [`CompletionReporter`] channel, which [`PublishQueue::start`] drains.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::backend::{BoxStream, Mutation, QueueBackend};
use crate::config::PublishConfig;
use crate::consistency::{ConsistencyLog, ConsistencyRecord};
use crate::directory::{SubscriberDirectory, SubscriberDraft};
use crate::filter::{Admission, ContentFilterEvaluator};
use crate::format::FormatterRegistry;
use crate::observability::LiveMetrics;
use crate::query::{Dashboard, QueryPage, QueueQuery, QueueView};
use crate::store::ContentStore;
use crate::transport::{CompletionReporter, Delivery, TransportRegistry};
use crate::types::{
    BulkActions, ContentItem, PublishingAction, QueueEvent, QueueId, QueueItem, QueueState, SubscriberId,
    SubscriberType, Transition, TransportEvent,
};
use crate::{PublishError, PublishResult};

/// Per-id result of a bulk resend or cancel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub succeeded: Vec<QueueId>,
    pub failed: Vec<(QueueId, PublishError)>,
    /// Entries created by the batch; resend only
    pub created: Vec<QueueId>,
}

impl BatchOutcome {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failure(&self, queue_id: &QueueId) -> Option<&PublishError> {
        self.failed.iter().find(|(id, _)| id == queue_id).map(|(_, e)| e)
    }
}

/// Publish an item by reference to the content store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub item_id: String,
    pub item_version: u32,
    pub subscriber_id: SubscriberId,
    pub destination: String,
    pub action: PublishingAction,
}

/// Handle for a background task started by the queue
pub struct WorkerHandle {
    shutdown_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<PublishResult<()>>,
}

impl WorkerHandle {
    pub(crate) fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut,
        Fut: std::future::Future<Output = PublishResult<()>> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join_handle = tokio::spawn(task(shutdown_rx));
        Self { shutdown_tx, join_handle }
    }

    /// Gracefully stop the task
    pub async fn shutdown(self) -> PublishResult<()> {
        let _ = self.shutdown_tx.send(());
        self.join_handle
            .await
            .map_err(|e| PublishError::Internal(format!("Worker join error: {}", e)))?
    }
}

/// The publish queue
pub struct PublishQueue<B: QueueBackend> {
    backend: Arc<B>,
    directory: Arc<SubscriberDirectory>,
    evaluator: ContentFilterEvaluator,
    formatters: Arc<FormatterRegistry>,
    transports: Arc<TransportRegistry>,
    store: Option<Arc<dyn ContentStore>>,
    consistency: Arc<ConsistencyLog>,
    metrics: Arc<LiveMetrics>,
    reporter: CompletionReporter,
    completions: Arc<Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>>,
    config: PublishConfig,
}

impl<B: QueueBackend> Clone for PublishQueue<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            directory: self.directory.clone(),
            evaluator: self.evaluator.clone(),
            formatters: self.formatters.clone(),
            transports: self.transports.clone(),
            store: self.store.clone(),
            consistency: self.consistency.clone(),
            metrics: self.metrics.clone(),
            reporter: self.reporter.clone(),
            completions: self.completions.clone(),
            config: self.config.clone(),
        }
    }
}

#[cfg(feature = "memory")]
impl PublishQueue<crate::backend::memory::MemoryBackend> {
    /// Queue over a fresh in-memory backend sized from `config`
    pub fn in_memory(config: PublishConfig, evaluator: ContentFilterEvaluator) -> PublishResult<Self> {
        config.validate()?;
        let backend = crate::backend::memory::MemoryBackend::with_event_capacity(config.event_capacity);
        Ok(Self::new(backend, evaluator).with_config(config))
    }
}

impl<B: QueueBackend + 'static> PublishQueue<B> {
    pub fn new(backend: B, evaluator: ContentFilterEvaluator) -> Self {
        let (reporter, completions) = CompletionReporter::channel();
        Self {
            backend: Arc::new(backend),
            directory: Arc::new(SubscriberDirectory::new()),
            evaluator,
            formatters: Arc::new(FormatterRegistry::new()),
            transports: Arc::new(TransportRegistry::with_builtin()),
            store: None,
            consistency: Arc::new(ConsistencyLog::new()),
            metrics: Arc::new(LiveMetrics::new()),
            reporter,
            completions: Arc::new(Mutex::new(Some(completions))),
            config: PublishConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PublishConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_directory(mut self, directory: Arc<SubscriberDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_formatters(mut self, formatters: FormatterRegistry) -> Self {
        self.formatters = Arc::new(formatters);
        self
    }

    pub fn with_transports(mut self, transports: TransportRegistry) -> Self {
        self.transports = Arc::new(transports);
        self
    }

    pub fn with_content_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn directory(&self) -> &SubscriberDirectory {
        &self.directory
    }

    pub fn metrics(&self) -> &LiveMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Reporter for drivers that live outside the transport registry
    pub fn reporter(&self) -> CompletionReporter {
        self.reporter.clone()
    }

    /// Open an edit session; unrecorded global filters default to opt-in
    pub fn edit_subscriber(&self, subscriber_id: &SubscriberId) -> PublishResult<SubscriberDraft> {
        self.directory.edit(subscriber_id, &self.evaluator.matcher().global_filters())
    }

    pub fn new_subscriber(&self, name: impl Into<String>, subscriber_type: SubscriberType) -> SubscriberDraft {
        SubscriberDraft::create(name, subscriber_type, &self.evaluator.matcher().global_filters())
    }

    /// Admit `item` for one of the subscriber's destinations and start dispatch.
    ///
    /// A rejected item leaves the queue untouched.
    #[instrument(skip(self, item), fields(item_id = %item.item_id, subscriber = %subscriber_id))]
    pub async fn enqueue(
        &self,
        item: &ContentItem,
        subscriber_id: &SubscriberId,
        destination: &str,
        action: PublishingAction,
    ) -> PublishResult<QueueItem> {
        let subscriber = self.directory.get(subscriber_id)?;
        let destination = subscriber
            .destination(destination)
            .cloned()
            .ok_or_else(|| PublishError::not_found(format!("destination {destination} of {}", subscriber.name)))?;

        if let Admission::Rejected(reason) = self.evaluator.evaluate(item, &subscriber)? {
            self.metrics.record_rejected(subscriber_id);
            info!(%reason, "Item rejected");
            return Err(PublishError::AdmissionRejected(reason));
        }

        let format = destination.format.clone().ok_or_else(|| PublishError::FormatMismatch {
            subscriber: subscriber.name.clone(),
            subscriber_type: subscriber.subscriber_type.to_string(),
            destinations: vec![destination.name.clone()],
        })?;
        let formatted = self.formatters.format(&format, item, action)?;

        let entry = QueueItem::new(item, subscriber_id.clone(), destination, action, formatted);
        self.backend.insert(entry.clone()).await?;
        self.consistency.append(&entry);
        self.metrics.record_enqueued(subscriber_id);
        info!(queue_id = %entry.queue_id, "Enqueued");

        self.spawn_dispatch(entry.clone());
        Ok(entry)
    }

    /// Load an item from the content store and enqueue it
    #[instrument(skip(self, request), fields(item_id = %request.item_id, version = request.item_version))]
    pub async fn publish(&self, request: PublishRequest) -> PublishResult<QueueItem> {
        let item = self
            .content_store()?
            .get_item(&request.item_id, request.item_version)
            .await?;
        self.enqueue(&item, &request.subscriber_id, &request.destination, request.action)
            .await
    }

    /// Re-queue terminal entries as new pending entries
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn resend(&self, ids: &[QueueId]) -> BatchOutcome {
        let ids = distinct(ids);
        let results = join_all(ids.iter().map(|id| self.resend_one(id))).await;

        let mut outcome = BatchOutcome::default();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(created) => {
                    outcome.succeeded.push(id.clone());
                    outcome.created.push(created);
                }
                Err(e) => {
                    debug!(queue_id = %id, "Resend failed: {}", e);
                    outcome.failed.push((id.clone(), e));
                }
            }
        }
        outcome
    }

    async fn resend_one(&self, queue_id: &QueueId) -> PublishResult<QueueId> {
        let original = self.backend.get(queue_id).await?;
        original.ensure_resendable()?;

        let copy = original.resend();
        self.backend.insert(copy.clone()).await?;
        self.consistency.append(&copy);
        self.metrics.record_resent();
        info!(queue_id = %copy.queue_id, resend_of = %queue_id, "Resent");

        let created = copy.queue_id.clone();
        self.spawn_dispatch(copy);
        Ok(created)
    }

    /// Cancel pending or in-progress entries
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn cancel(&self, ids: &[QueueId]) -> BatchOutcome {
        let ids = distinct(ids);
        let results = join_all(ids.iter().map(|id| self.transition(id, Mutation::Cancel))).await;

        let mut outcome = BatchOutcome::default();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok((transition, _)) => {
                    if transition == Transition::Applied {
                        self.metrics.record_canceled();
                    }
                    outcome.succeeded.push(id.clone());
                }
                Err(e) => outcome.failed.push((id.clone(), e)),
            }
        }
        outcome
    }

    /// Apply a completion reported by a transport.
    ///
    /// Repeating an applied event is a no-op. An event that contradicts a
    /// recorded terminal state fails with `StaleTransition` and is dropped.
    #[instrument(skip(self, event), fields(queue_id = %event.queue_id, state = %event.state))]
    pub async fn apply_transport_event(&self, event: TransportEvent) -> PublishResult<Transition> {
        if matches!(event.state, QueueState::Pending | QueueState::Canceled) {
            return Err(PublishError::validation(format!(
                "transports cannot report state {}",
                event.state
            )));
        }

        let mutation = Mutation::Transport {
            state: event.state,
            error_message: event.error_message.clone(),
        };
        let (transition, entry) = match self.transition(&event.queue_id, mutation).await {
            Ok(result) => result,
            Err(e @ PublishError::StaleTransition { .. }) => {
                self.metrics.record_stale_event();
                warn!("Ignored stale transport event: {}", e);
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        if transition == Transition::Duplicate {
            debug!("Duplicate transport event");
            return Ok(transition);
        }

        match entry.state {
            QueueState::Success => self.metrics.record_succeeded(),
            QueueState::Error => {
                self.metrics.record_failed(&entry.subscriber_id);
                if let Some(code) = event.error_code {
                    self.check_critical_error(&entry, code);
                }
            }
            _ => {}
        }
        Ok(transition)
    }

    fn check_critical_error(&self, entry: &QueueItem, code: u32) {
        let subscriber = match self.directory.get(&entry.subscriber_id) {
            Ok(subscriber) => subscriber,
            Err(e) => {
                warn!(queue_id = %entry.queue_id, "Cannot check critical errors: {}", e);
                return;
            }
        };
        if subscriber.critical_errors.contains(&code) {
            let reason = format!("critical error {code} on queue entry {}", entry.queue_id);
            if let Err(e) = self.directory.deactivate(&subscriber.id, &reason) {
                error!("Failed to deactivate subscriber {}: {}", subscriber.id, e);
            }
        }
    }

    /// Bulk actions offered for a selection of entries
    pub async fn bulk_actions(&self, ids: &[QueueId]) -> PublishResult<BulkActions> {
        let mut states = Vec::with_capacity(ids.len());
        for id in ids {
            states.push(self.backend.get(id).await?.state);
        }
        Ok(BulkActions::for_states(states))
    }

    pub async fn get(&self, queue_id: &QueueId) -> PublishResult<QueueItem> {
        self.backend.get(queue_id).await
    }

    /// Content item an entry was created from
    pub async fn preview(&self, queue_id: &QueueId) -> PublishResult<ContentItem> {
        let entry = self.backend.get(queue_id).await?;
        self.content_store()?
            .get_item(&entry.item_id, entry.item_version)
            .await
    }

    /// One page of entries, newest first
    pub async fn query(&self, query: &QueueQuery) -> PublishResult<QueryPage> {
        query.validate(self.config.max_page_size)?;
        let (items, total) = self
            .backend
            .query(&query.filters, query.offset(), query.page_size)
            .await?;
        Ok(QueryPage::new(items, total, query))
    }

    /// Subscribers and the view's queue page, loaded together
    pub async fn dashboard(&self, view: &QueueView) -> PublishResult<Dashboard> {
        let query = view.query();
        let (subscribers, page) = tokio::join!(async { self.directory.list() }, self.query(&query));
        let page = page?;
        let actions = view.actions(&page);
        Ok(Dashboard { subscribers, page, actions })
    }

    pub async fn count(&self) -> PublishResult<usize> {
        self.backend.count().await
    }

    /// Every state change
    pub fn subscribe(&self) -> BoxStream<QueueEvent> {
        self.backend.event_stream()
    }

    /// State changes of one entry
    pub fn subscribe_to(&self, queue_id: QueueId) -> BoxStream<QueueEvent> {
        let stream = self
            .backend
            .event_stream()
            .filter(move |event| futures::future::ready(event.queue_id == queue_id));
        Box::pin(stream)
    }

    /// Most recent consistency records, newest first
    pub fn consistency_records(&self) -> Vec<ConsistencyRecord> {
        self.consistency.recent(self.config.consistency_limit)
    }

    /// Start applying transport completions; only one pump may run
    pub fn start(&self) -> PublishResult<WorkerHandle> {
        let mut completions = self
            .completions
            .lock()
            .take()
            .ok_or_else(|| PublishError::Internal("completion pump already started".to_string()))?;
        let queue = self.clone();

        Ok(WorkerHandle::spawn(move |mut shutdown_rx| async move {
            info!("Completion pump started");
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("Completion pump shutdown requested");
                        break;
                    }
                    event = completions.recv() => {
                        let Some(event) = event else { break };
                        if let Err(e) = queue.apply_transport_event(event).await {
                            debug!("Transport event not applied: {}", e);
                        }
                    }
                }
            }
            // Hand the receiver back so the pump can be restarted
            *queue.completions.lock() = Some(completions);
            Ok(())
        }))
    }

    /// Fail entries that stay in progress longer than the dispatch timeout
    pub fn start_reaper(&self) -> WorkerHandle {
        crate::reaper::DispatchReaper::new(self.clone()).spawn()
    }

    fn content_store(&self) -> PublishResult<&Arc<dyn ContentStore>> {
        self.store
            .as_ref()
            .ok_or_else(|| PublishError::Config("no content store configured".to_string()))
    }

    /// Apply a mutation; the backend journals applied changes under the entry lock
    async fn transition(&self, queue_id: &QueueId, mutation: Mutation) -> PublishResult<(Transition, QueueItem)> {
        self.backend.apply(queue_id, mutation, &self.consistency).await
    }

    fn spawn_dispatch(&self, entry: QueueItem) {
        let queue = self.clone();
        tokio::spawn(async move { queue.dispatch(entry).await });
    }

    /// Mark the entry in progress and hand it to its transport
    async fn dispatch(&self, entry: QueueItem) {
        let queue_id = entry.queue_id.clone();
        let in_progress = Mutation::Transport {
            state: QueueState::InProgress,
            error_message: None,
        };
        let entry = match self.transition(&queue_id, in_progress).await {
            Ok((_, entry)) => entry,
            Err(e) => {
                // Canceled before dispatch got to it
                debug!(%queue_id, "Skipping dispatch: {}", e);
                return;
            }
        };
        self.metrics.record_dispatched();

        let kind = entry.destination.kind();
        let Some(transport) = self.transports.get(kind).cloned() else {
            warn!(%queue_id, %kind, "No transport registered");
            self.fail_dispatch(queue_id, format!("no transport registered for {kind}")).await;
            return;
        };

        let extension = self.formatters.file_extension(entry.formatted_item.format());
        let delivery = Delivery::from_record(&entry, extension);
        if let Err(e) = transport.send(delivery, self.reporter.clone()).await {
            warn!(%queue_id, %kind, "Transport refused entry: {}", e);
            self.fail_dispatch(queue_id, e.to_string()).await;
        }
    }

    async fn fail_dispatch(&self, queue_id: QueueId, message: String) {
        if let Err(e) = self.apply_transport_event(TransportEvent::failure(queue_id, message)).await {
            debug!("Dispatch failure not recorded: {}", e);
        }
    }
}

/// Ids in first-seen order, each once
fn distinct(ids: &[QueueId]) -> Vec<&QueueId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().filter(|id| seen.insert(*id)).collect()
}
