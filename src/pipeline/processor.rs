//! # Payment Processor
//!
//! The business operation the pipeline retries. At-least-once delivery
//! means the same event can arrive twice, so the operation must be safe to
//! invoke repeatedly for one payment id: the default implementation keys
//! its business effect by id and applies it at most once.

use crate::models::PaymentEvent;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while processing a payment event
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed event; permanent, routes straight to the dead-letter sink
    #[error("Payment event failed validation: {reason}")]
    Validation { reason: String },

    /// Processing failure; retryable within the retry budget
    #[error("Payment processing failed: {message}")]
    Processing { message: String },
}

impl PipelineError {
    /// Create a validation error
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Create a processing error
    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }

    /// Permanent errors never consume a retry slot
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Business operation invoked once per delivery
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Process a payment event; errors are classified by
    /// [`PipelineError::is_permanent`]
    async fn process(&self, event: &PaymentEvent) -> Result<(), PipelineError>;
}

/// Default processor: simulated work with an induced-failure hook and an
/// idempotent-by-id business effect.
///
/// Any event whose `payment_id` contains `"fail"` fails processing — the
/// knob tests and the demo use to drive events into the retry path.
pub struct DefaultPaymentProcessor {
    effects: DashMap<String, u64>,
    processing_delay: Duration,
}

impl DefaultPaymentProcessor {
    /// Create a processor with no simulated work delay
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Create a processor simulating `delay` of work per event
    pub fn with_delay(processing_delay: Duration) -> Self {
        Self {
            effects: DashMap::new(),
            processing_delay,
        }
    }

    /// How many times the business effect was applied for a payment id
    /// (never more than once)
    pub fn effect_count(&self, payment_id: &str) -> u64 {
        self.effects.get(payment_id).map(|e| *e).unwrap_or(0)
    }

    /// Number of distinct payments whose effect was applied
    pub fn distinct_effects(&self) -> usize {
        self.effects.len()
    }
}

impl Default for DefaultPaymentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProcessor for DefaultPaymentProcessor {
    async fn process(&self, event: &PaymentEvent) -> Result<(), PipelineError> {
        info!(
            payment_id = %event.payment_id,
            user_id = %event.user_id,
            amount = event.amount,
            "Processing payment"
        );

        if event.payment_id.contains("fail") {
            return Err(PipelineError::processing("Payment processing failed"));
        }

        if !self.processing_delay.is_zero() {
            tokio::time::sleep(self.processing_delay).await;
        }

        // Idempotent by id: a redelivered event must not double-apply
        match self.effects.entry(event.payment_id.clone()) {
            Entry::Occupied(_) => {
                debug!(payment_id = %event.payment_id, "Business effect already applied, skipping");
            }
            Entry::Vacant(slot) => {
                slot.insert(1);
            }
        }

        info!(payment_id = %event.payment_id, "Payment processed successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(payment_id: &str) -> PaymentEvent {
        PaymentEvent::new(payment_id, "USER_1", 25.0, "USD")
    }

    #[tokio::test]
    async fn test_success_applies_effect_once() {
        let processor = DefaultPaymentProcessor::new();
        processor.process(&event("PAY_1")).await.unwrap();
        assert_eq!(processor.effect_count("PAY_1"), 1);
    }

    #[tokio::test]
    async fn test_double_delivery_is_idempotent() {
        let processor = DefaultPaymentProcessor::new();
        processor.process(&event("PAY_1")).await.unwrap();
        processor.process(&event("PAY_1")).await.unwrap();
        assert_eq!(processor.effect_count("PAY_1"), 1);
        assert_eq!(processor.distinct_effects(), 1);
    }

    #[tokio::test]
    async fn test_induced_failure() {
        let processor = DefaultPaymentProcessor::new();
        let result = processor.process(&event("PAY_fail_7")).await;
        assert!(matches!(result, Err(PipelineError::Processing { .. })));
        assert_eq!(processor.effect_count("PAY_fail_7"), 0);
    }

    #[test]
    fn test_error_classification() {
        assert!(PipelineError::validation("empty id").is_permanent());
        assert!(!PipelineError::processing("boom").is_permanent());
    }
}
