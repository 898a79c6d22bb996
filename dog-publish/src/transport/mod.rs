//! Destination transport drivers.
//!
//! A [`Transport`] only reports whether it *accepted* an entry. The actual
//! outcome arrives later as a [`TransportEvent`] through the
//! [`CompletionReporter`] handed to every send, and the queue engine applies
//! it on its own task.

mod file;
#[cfg(feature = "http-push")]
mod http_push;
mod pull;
mod recording;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use crate::types::{Destination, FormattedItem, QueueId, QueueItem, TransportEvent, TransportKind};
use crate::{PublishError, PublishResult};

pub use file::FileTransport;
#[cfg(feature = "http-push")]
pub use http_push::HttpPushTransport;
pub use pull::PullTransport;
pub use recording::{RecordingMode, RecordingTransport};

/// Transport error codes a subscriber may mark as critical
pub const PUBLISH_ERRORS: &[(u32, &str)] = &[
    (10000, "Failed to publish the item"),
    (11000, "Email publish error"),
    (11001, "Email recipients are missing"),
    (12000, "FTP publish error"),
    (12001, "FTP connection refused"),
    (12002, "FTP login failed"),
    (13000, "ODBC publish error"),
    (14000, "File publish error"),
    (14001, "File destination path is not writable"),
    (15000, "HTTP push error"),
    (15001, "HTTP push rejected by the resource service"),
];

pub fn is_known_error_code(code: u32) -> bool {
    PUBLISH_ERRORS.iter().any(|(known, _)| *known == code)
}

pub fn error_description(code: u32) -> Option<&'static str> {
    PUBLISH_ERRORS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, description)| *description)
}

/// Everything a driver needs to transmit one queue entry
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub queue_id: QueueId,
    pub unique_name: String,
    pub formatted_item: FormattedItem,
    pub destination: Destination,
    /// File extension for the payload's format
    pub file_extension: String,
}

impl Delivery {
    pub fn from_record(record: &QueueItem, file_extension: impl Into<String>) -> Self {
        Self {
            queue_id: record.queue_id.clone(),
            unique_name: record.unique_name.clone(),
            formatted_item: record.formatted_item.clone(),
            destination: record.destination.clone(),
            file_extension: file_extension.into(),
        }
    }

    /// `{unique_name}-{queue_id}.{ext}`
    pub fn file_name(&self) -> String {
        format!("{}-{}.{}", self.unique_name, self.queue_id, self.file_extension)
    }
}

/// Sender side of the completion channel
#[derive(Debug, Clone)]
pub struct CompletionReporter {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl CompletionReporter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn report(&self, event: TransportEvent) -> PublishResult<()> {
        self.tx
            .send(event)
            .map_err(|e| PublishError::Internal(format!("completion channel closed for {}", e.0.queue_id)))
    }

    pub fn success(&self, queue_id: QueueId) {
        self.report_or_warn(TransportEvent::success(queue_id));
    }

    pub fn failure(&self, queue_id: QueueId, message: impl Into<String>, error_code: Option<u32>) {
        let mut event = TransportEvent::failure(queue_id, message);
        if let Some(code) = error_code {
            event = event.with_error_code(code);
        }
        self.report_or_warn(event);
    }

    fn report_or_warn(&self, event: TransportEvent) {
        if let Err(e) = self.report(event) {
            warn!("Dropped transport completion: {}", e);
        }
    }
}

/// Driver for one destination kind
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Accept `delivery` for dispatch.
    ///
    /// `Ok` means accepted; the outcome must later be reported through
    /// `reporter`. An `Err` is a synchronous refusal.
    async fn send(&self, delivery: Delivery, reporter: CompletionReporter) -> PublishResult<()>;
}

/// Transports indexed by destination kind
#[derive(Clone, Default)]
pub struct TransportRegistry {
    transports: HashMap<TransportKind, Arc<dyn Transport>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the in-process drivers (file, pull and, when enabled, HTTP push)
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(FileTransport::new());
        registry.register(PullTransport::new());
        #[cfg(feature = "http-push")]
        registry.register(HttpPushTransport::new());
        registry
    }

    pub fn register<T: Transport + 'static>(&mut self, transport: T) {
        self.register_arc(Arc::new(transport));
    }

    pub fn register_arc(&mut self, transport: Arc<dyn Transport>) {
        self.transports.insert(transport.kind(), transport);
    }

    pub fn get(&self, kind: TransportKind) -> Option<&Arc<dyn Transport>> {
        self.transports.get(&kind)
    }

    pub fn kinds(&self) -> Vec<TransportKind> {
        TransportKind::ALL
            .into_iter()
            .filter(|kind| self.transports.contains_key(kind))
            .collect()
    }
}
