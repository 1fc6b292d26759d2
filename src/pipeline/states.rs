//! Per-delivery state machine for the retry pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// States a delivery moves through inside the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    /// Delivery received from the transport
    Received,
    /// Processing operation is running
    Processing,
    /// Failure with retry budget left; redelivery scheduled with backoff
    RetryScheduled,
    /// Processed successfully and acknowledged
    Acked,
    /// Escalated to the dead-letter sink
    DeadLettered,
}

impl EventState {
    /// Check if this is a terminal state (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Acked | Self::DeadLettered)
    }

    /// Check if this state leaves the event owned by the transport again
    /// (a scheduled retry is a new delivery, not a continuation)
    pub fn is_requeued(&self) -> bool {
        matches!(self, Self::RetryScheduled)
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Processing => write!(f, "processing"),
            Self::RetryScheduled => write!(f, "retry_scheduled"),
            Self::Acked => write!(f, "acked"),
            Self::DeadLettered => write!(f, "dead_lettered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(EventState::Acked.is_terminal());
        assert!(EventState::DeadLettered.is_terminal());
        assert!(!EventState::Received.is_terminal());
        assert!(!EventState::Processing.is_terminal());
        assert!(!EventState::RetryScheduled.is_terminal());
    }

    #[test]
    fn test_requeued_state() {
        assert!(EventState::RetryScheduled.is_requeued());
        assert!(!EventState::Acked.is_requeued());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&EventState::RetryScheduled).unwrap();
        assert_eq!(json, "\"retry_scheduled\"");
    }
}
