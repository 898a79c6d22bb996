use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use super::{CompletionReporter, Delivery, Transport};
use crate::types::TransportKind;
use crate::{PublishError, PublishResult};

/// What a [`RecordingTransport`] does with an accepted delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingMode {
    /// Accept and never report; completion is driven by the caller
    Hold,
    /// Accept and report success
    Succeed,
    /// Accept and report failure with an optional catalogue code
    Fail { message: String, error_code: Option<u32> },
    /// Refuse synchronously
    Refuse(String),
}

/// In-memory driver for tests and development; keeps every delivery it sees
#[derive(Clone)]
pub struct RecordingTransport {
    kind: TransportKind,
    mode: Arc<Mutex<RecordingMode>>,
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl RecordingTransport {
    pub fn new(kind: TransportKind, mode: RecordingMode) -> Self {
        Self {
            kind,
            mode: Arc::new(Mutex::new(mode)),
            deliveries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn holding(kind: TransportKind) -> Self {
        Self::new(kind, RecordingMode::Hold)
    }

    pub fn set_mode(&self, mode: RecordingMode) {
        *self.mode.lock() = mode;
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.deliveries.lock().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn send(&self, delivery: Delivery, reporter: CompletionReporter) -> PublishResult<()> {
        let mode = self.mode.lock().clone();
        if let RecordingMode::Refuse(reason) = mode {
            return Err(PublishError::Transport(reason));
        }

        let queue_id = delivery.queue_id.clone();
        self.deliveries.lock().push(delivery);

        match mode {
            RecordingMode::Succeed => reporter.success(queue_id),
            RecordingMode::Fail { message, error_code } => reporter.failure(queue_id, message, error_code),
            RecordingMode::Hold | RecordingMode::Refuse(_) => {}
        }
        Ok(())
    }
}
