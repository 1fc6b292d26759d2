//! # Dead-Letter Sink
//!
//! Terminal destination for events that exhausted their retries or failed
//! permanent validation. The sink records the event and reason for manual
//! review and never raises back into the pipeline; only a failure to write
//! the record itself is surfaced, and the pipeline reacts by leaving the
//! delivery unacknowledged so the transport retries the sink write.

use crate::models::PaymentEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Failure to durably record a dead-lettered event. Must not be swallowed.
#[derive(Debug, Error)]
#[error("Dead letter write failed: {message}")]
pub struct DeadLetterWriteFailure {
    pub message: String,
}

impl DeadLetterWriteFailure {
    /// Create a write failure with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Terminal handler for exhausted-retry and invalid events
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    /// Durably record the event and reason for manual inspection
    async fn intake(
        &self,
        event: &PaymentEvent,
        reason: &str,
    ) -> Result<(), DeadLetterWriteFailure>;
}

/// A recorded dead-lettered event awaiting manual review
#[derive(Debug, Clone)]
pub struct DeadLetterRecord {
    pub id: Uuid,
    pub event: PaymentEvent,
    pub reason: String,
    pub received_at: DateTime<Utc>,
}

/// In-memory sink retaining records for inspection
#[derive(Debug, Default)]
pub struct InMemoryDeadLetterSink {
    records: RwLock<Vec<DeadLetterRecord>>,
}

impl InMemoryDeadLetterSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    pub fn records(&self) -> Vec<DeadLetterRecord> {
        self.records.read().clone()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check whether the sink holds no records
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetterSink {
    async fn intake(
        &self,
        event: &PaymentEvent,
        reason: &str,
    ) -> Result<(), DeadLetterWriteFailure> {
        // Alerting hook: operators page on this line
        error!(
            payment_id = %event.payment_id,
            user_id = %event.user_id,
            reason,
            "💀 Payment event dead-lettered, storing for manual review"
        );

        self.records.write().push(DeadLetterRecord {
            id: Uuid::new_v4(),
            event: event.clone(),
            reason: reason.to_string(),
            received_at: Utc::now(),
        });
        Ok(())
    }
}
