use thiserror::Error;

use crate::types::{QueueId, QueueState};

/// Result type for publish queue operations
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors raised by the subscriber directory and the publish queue
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PublishError {
    /// Malformed subscriber or destination data
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Another subscriber already uses this name (case-insensitive)
    #[error("Subscriber with name {0} already exists")]
    DuplicateName(String),

    /// A subscriber must have at least one destination
    #[error("Subscriber {0} must have at least one destination")]
    NoDestination(String),

    /// Destination formats are not supported by the subscriber type
    #[error("Destinations {destinations:?} of subscriber {subscriber} need a new format for type {subscriber_type}")]
    FormatMismatch {
        subscriber: String,
        subscriber_type: String,
        destinations: Vec<String>,
    },

    /// The item may not be dispatched to this subscriber
    #[error("Admission rejected: {0}")]
    AdmissionRejected(String),

    /// The command is not valid for the entry's current state
    #[error("Cannot {action} queue entry {queue_id} in state {state}")]
    InvalidTransition {
        queue_id: QueueId,
        state: QueueState,
        action: &'static str,
    },

    /// A transport event arrived after a different terminal state was recorded
    #[error("Stale transition for queue entry {queue_id}: {current} -> {attempted}")]
    StaleTransition {
        queue_id: QueueId,
        current: QueueState,
        attempted: QueueState,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Payload formatting failed
    #[error("Format error: {0}")]
    Format(String),

    /// The transport refused the send synchronously
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PublishError {
    /// Stable taxonomy name, used in batch outcome reports
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::DuplicateName(_) => "DuplicateNameError",
            Self::NoDestination(_) => "NoDestinationError",
            Self::FormatMismatch { .. } => "FormatMismatch",
            Self::AdmissionRejected(_) => "AdmissionRejected",
            Self::InvalidTransition { .. } => "InvalidTransition",
            Self::StaleTransition { .. } => "StaleTransition",
            Self::NotFound(_) => "NotFound",
            Self::Format(_) => "FormatError",
            Self::Transport(_) => "TransportError",
            Self::Config(_) => "ConfigError",
            Self::Internal(_) => "InternalError",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Check whether the error was caused by caller input rather than queue state
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::DuplicateName(_)
                | Self::NoDestination(_)
                | Self::FormatMismatch { .. }
        )
    }
}

impl From<serde_json::Error> for PublishError {
    fn from(err: serde_json::Error) -> Self {
        Self::Format(err.to_string())
    }
}

impl From<std::io::Error> for PublishError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_match_taxonomy() {
        assert_eq!(PublishError::validation("bad").kind_name(), "ValidationError");
        assert_eq!(PublishError::DuplicateName("x".into()).kind_name(), "DuplicateNameError");

        let err = PublishError::InvalidTransition {
            queue_id: QueueId::from("q1"),
            state: QueueState::Success,
            action: "cancel",
        };
        assert_eq!(err.kind_name(), "InvalidTransition");
        assert_eq!(err.to_string(), "Cannot cancel queue entry q1 in state success");
    }

    #[test]
    fn test_precondition_errors() {
        assert!(PublishError::NoDestination("Reuters".into()).is_precondition());
        assert!(!PublishError::AdmissionRejected("blocked".into()).is_precondition());
    }
}
