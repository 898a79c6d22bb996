use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ContentItem, Destination, PublishingAction, QueueId, SubscriberId};
use crate::{PublishError, PublishResult};

/// Queue entry lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueState {
    /// Admitted, not yet handed to a transport
    Pending,
    /// Accepted by the transport, waiting for its completion report
    InProgress,
    Success,
    Error,
    Canceled,
}

impl QueueState {
    pub const ALL: [QueueState; 5] = [
        Self::Pending,
        Self::InProgress,
        Self::Success,
        Self::Error,
        Self::Canceled,
    ];

    /// Check if the state is terminal (success, error or canceled)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Canceled)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Success => "success",
            Self::Error => "error",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QueueState {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.name() == s)
            .ok_or_else(|| PublishError::validation(format!("unknown queue state: {s}")))
    }
}

/// Transport-ready payload, computed once at admission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedItem {
    format: String,
    content: String,
}

impl FormattedItem {
    pub fn new(format: impl Into<String>, content: impl Into<String>) -> Self {
        Self { format: format.into(), content: content.into() }
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Outcome of a state change request that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state changed
    Applied,
    /// The entry was already in the requested state; nothing changed
    Duplicate,
}

/// One dispatch attempt of a content item to one destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub queue_id: QueueId,
    pub item_id: String,
    pub item_version: u32,
    pub subscriber_id: SubscriberId,
    pub unique_name: String,
    pub headline: String,
    pub content_type: String,
    pub destination: Destination,
    pub publishing_action: PublishingAction,
    pub formatted_item: FormattedItem,
    pub state: QueueState,
    /// Present iff the state is `error`
    pub error_message: Option<String>,
    /// Set once, when a terminal state is reached
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When the transport accepted the entry
    pub transmit_started_at: Option<DateTime<Utc>>,
    /// Entry this one was resent from
    pub resend_of: Option<QueueId>,
}

impl QueueItem {
    /// Create a pending entry for an admitted item
    pub fn new(
        item: &ContentItem,
        subscriber_id: SubscriberId,
        destination: Destination,
        publishing_action: PublishingAction,
        formatted_item: FormattedItem,
    ) -> Self {
        let now = Utc::now();
        Self {
            queue_id: QueueId::new(),
            item_id: item.item_id.clone(),
            item_version: item.version,
            subscriber_id,
            unique_name: item.unique_name.clone(),
            headline: item.headline.clone(),
            content_type: item.content_type.clone(),
            destination,
            publishing_action,
            formatted_item,
            state: QueueState::Pending,
            error_message: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
            transmit_started_at: None,
            resend_of: None,
        }
    }

    /// Fresh pending entry carrying this entry's dispatch fields
    pub fn resend(&self) -> Self {
        let now = Utc::now();
        Self {
            queue_id: QueueId::new(),
            item_id: self.item_id.clone(),
            item_version: self.item_version,
            subscriber_id: self.subscriber_id.clone(),
            unique_name: self.unique_name.clone(),
            headline: self.headline.clone(),
            content_type: self.content_type.clone(),
            destination: self.destination.clone(),
            publishing_action: self.publishing_action,
            formatted_item: self.formatted_item.clone(),
            state: QueueState::Pending,
            error_message: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
            transmit_started_at: None,
            resend_of: Some(self.queue_id.clone()),
        }
    }

    /// Apply a state reported by (or on behalf of) the transport.
    ///
    /// Repeating the current state is a `Duplicate`; reaching a different
    /// state after a terminal one is a `StaleTransition`.
    pub fn apply_transport_state(
        &mut self,
        target: QueueState,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> PublishResult<Transition> {
        if self.state == target {
            return Ok(Transition::Duplicate);
        }
        if self.state.is_terminal() {
            return Err(PublishError::StaleTransition {
                queue_id: self.queue_id.clone(),
                current: self.state,
                attempted: target,
            });
        }

        match (self.state, target) {
            (QueueState::Pending, QueueState::InProgress) => {
                self.transmit_started_at = Some(now);
            }
            (QueueState::InProgress, QueueState::Success) => {
                self.completed_at = Some(now);
            }
            (QueueState::InProgress, QueueState::Error) => {
                self.error_message =
                    Some(error_message.unwrap_or_else(|| "transmission failed".to_string()));
                self.completed_at = Some(now);
            }
            (state, _) => {
                return Err(PublishError::InvalidTransition {
                    queue_id: self.queue_id.clone(),
                    state,
                    action: transition_action(target),
                });
            }
        }

        self.state = target;
        self.updated_at = now;
        Ok(Transition::Applied)
    }

    /// Cancel a pending or in-progress entry; canceling twice is a `Duplicate`
    pub fn cancel(&mut self, now: DateTime<Utc>) -> PublishResult<Transition> {
        match self.state {
            QueueState::Canceled => Ok(Transition::Duplicate),
            QueueState::Pending | QueueState::InProgress => {
                self.state = QueueState::Canceled;
                self.completed_at = Some(now);
                self.updated_at = now;
                Ok(Transition::Applied)
            }
            state @ (QueueState::Success | QueueState::Error) => Err(PublishError::InvalidTransition {
                queue_id: self.queue_id.clone(),
                state,
                action: "cancel",
            }),
        }
    }

    /// Check the entry may be resent
    pub fn ensure_resendable(&self) -> PublishResult<()> {
        if self.state.is_terminal() {
            Ok(())
        } else {
            Err(PublishError::InvalidTransition {
                queue_id: self.queue_id.clone(),
                state: self.state,
                action: "resend",
            })
        }
    }

    /// Check if the entry has been in progress longer than `timeout`
    pub fn transmit_overdue(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        match (self.state, self.transmit_started_at) {
            (QueueState::InProgress, Some(started)) => now - started > timeout,
            _ => false,
        }
    }
}

fn transition_action(target: QueueState) -> &'static str {
    match target {
        QueueState::Pending => "reset",
        QueueState::InProgress => "transmit",
        QueueState::Success => "complete",
        QueueState::Error => "fail",
        QueueState::Canceled => "cancel",
    }
}

/// Bulk actions offered for a selection of queue entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkActions {
    pub resend: bool,
    pub cancel: bool,
}

impl BulkActions {
    /// Resend needs every entry to be success/error, cancel needs every entry
    /// to be pending; mixed selections get neither.
    pub fn for_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = QueueState>,
    {
        let states: Vec<QueueState> = states.into_iter().collect();
        if states.is_empty() {
            return Self::default();
        }

        let resend = !states.iter().any(|s| {
            matches!(s, QueueState::Pending | QueueState::InProgress | QueueState::Canceled)
        });
        if resend {
            return Self { resend: true, cancel: false };
        }

        let cancel = !states.iter().any(|s| {
            matches!(
                s,
                QueueState::Success | QueueState::InProgress | QueueState::Canceled | QueueState::Error
            )
        });
        Self { resend: false, cancel }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DestinationConfig, PullConfig};

    fn entry() -> QueueItem {
        let item = ContentItem::new("urn:item:1", 3, "AAP-1", "Floods close highway");
        QueueItem::new(
            &item,
            SubscriberId::from("sub-1"),
            Destination::new("pull", "text", DestinationConfig::Pull(PullConfig {})),
            PublishingAction::Publish,
            FormattedItem::new("text", "Floods close highway"),
        )
    }

    #[test]
    fn test_state_names_round_trip() {
        for state in QueueState::ALL {
            assert_eq!(state.name().parse::<QueueState>().unwrap(), state);
        }
        assert_eq!(serde_json::to_string(&QueueState::InProgress).unwrap(), "\"in-progress\"");
    }

    #[test]
    fn test_terminal_event_is_first_write_wins() {
        let mut record = entry();
        let t0 = Utc::now();
        record.apply_transport_state(QueueState::InProgress, None, t0).unwrap();
        record.apply_transport_state(QueueState::Error, Some("550 refused".into()), t0).unwrap();

        let later = t0 + chrono::Duration::seconds(5);
        let again = record.apply_transport_state(QueueState::Error, Some("other".into()), later).unwrap();

        assert_eq!(again, Transition::Duplicate);
        assert_eq!(record.completed_at, Some(t0));
        assert_eq!(record.error_message.as_deref(), Some("550 refused"));
    }

    #[test]
    fn test_success_after_cancel_is_stale() {
        let mut record = entry();
        let now = Utc::now();
        record.apply_transport_state(QueueState::InProgress, None, now).unwrap();
        record.cancel(now).unwrap();

        let result = record.apply_transport_state(QueueState::Success, None, now);
        assert!(matches!(result, Err(PublishError::StaleTransition { current: QueueState::Canceled, .. })));
        assert_eq!(record.state, QueueState::Canceled);
    }

    #[test]
    fn test_cancel_rules() {
        let now = Utc::now();
        let mut record = entry();
        assert_eq!(record.cancel(now).unwrap(), Transition::Applied);
        assert_eq!(record.cancel(now).unwrap(), Transition::Duplicate);

        let mut done = entry();
        done.apply_transport_state(QueueState::InProgress, None, now).unwrap();
        done.apply_transport_state(QueueState::Success, None, now).unwrap();
        assert!(matches!(done.cancel(now), Err(PublishError::InvalidTransition { action: "cancel", .. })));
        assert_eq!(done.state, QueueState::Success);
    }

    #[test]
    fn test_completion_requires_transmit() {
        let mut record = entry();
        let result = record.apply_transport_state(QueueState::Success, None, Utc::now());
        assert!(matches!(result, Err(PublishError::InvalidTransition { state: QueueState::Pending, .. })));
    }

    #[test]
    fn test_resend_snapshots_dispatch_fields() {
        let mut original = entry();
        let now = Utc::now();
        original.apply_transport_state(QueueState::InProgress, None, now).unwrap();
        original.apply_transport_state(QueueState::Error, Some("timeout".into()), now).unwrap();

        let copy = original.resend();
        assert_ne!(copy.queue_id, original.queue_id);
        assert_eq!(copy.state, QueueState::Pending);
        assert_eq!(copy.item_id, original.item_id);
        assert_eq!(copy.item_version, original.item_version);
        assert_eq!(copy.destination, original.destination);
        assert_eq!(copy.formatted_item, original.formatted_item);
        assert_eq!(copy.error_message, None);
        assert_eq!(copy.resend_of.as_ref(), Some(&original.queue_id));
    }

    #[test]
    fn test_bulk_actions() {
        use QueueState::*;
        assert_eq!(BulkActions::for_states([Success, Error]), BulkActions { resend: true, cancel: false });
        assert_eq!(BulkActions::for_states([Pending, Pending]), BulkActions { resend: false, cancel: true });
        assert_eq!(BulkActions::for_states([Pending, Success, Error]), BulkActions::default());
        assert_eq!(BulkActions::for_states([Canceled]), BulkActions::default());
        assert_eq!(BulkActions::for_states([InProgress]), BulkActions::default());
        assert_eq!(BulkActions::for_states(Vec::new()), BulkActions::default());
    }
}
