use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{QueueId, QueueItem, QueueState, SubscriberId};

/// State change broadcast to live observers, keyed by queue id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEvent {
    pub queue_id: QueueId,
    pub subscriber_id: SubscriberId,
    pub state: QueueState,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub at: DateTime<Utc>,
}

impl QueueEvent {
    pub fn from_record(record: &QueueItem) -> Self {
        Self {
            queue_id: record.queue_id.clone(),
            subscriber_id: record.subscriber_id.clone(),
            state: record.state,
            error_message: record.error_message.clone(),
            completed_at: record.completed_at,
            at: record.updated_at,
        }
    }

    /// Get event type name as string
    pub fn event_name(&self) -> &'static str {
        match self.state {
            QueueState::Pending => "queued",
            QueueState::InProgress => "transmitting",
            QueueState::Success => "transmitted",
            QueueState::Error => "failed",
            QueueState::Canceled => "canceled",
        }
    }
}

/// Completion report sent by a transport driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportEvent {
    pub queue_id: QueueId,
    pub state: QueueState,
    pub error_message: Option<String>,
    /// Code from the publish error catalogue, when the driver knows it
    pub error_code: Option<u32>,
}

impl TransportEvent {
    pub fn success(queue_id: QueueId) -> Self {
        Self {
            queue_id,
            state: QueueState::Success,
            error_message: None,
            error_code: None,
        }
    }

    pub fn failure(queue_id: QueueId, error_message: impl Into<String>) -> Self {
        Self {
            queue_id,
            state: QueueState::Error,
            error_message: Some(error_message.into()),
            error_code: None,
        }
    }

    pub fn with_error_code(mut self, code: u32) -> Self {
        self.error_code = Some(code);
        self
    }
}
