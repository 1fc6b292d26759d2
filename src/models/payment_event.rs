//! # Queued Payment Event
//!
//! The message consumed by the retry pipeline. The pipeline is the single
//! writer of `retry_count` while it holds an event; the `-1` sentinel marks
//! an event already forwarded to the dead-letter sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved `retry_count` value marking an event forwarded to the
/// dead-letter sink, preventing double escalation.
pub const DEAD_LETTER_MARKER: i32 = -1;

/// A payment event flowing through the retry pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub payment_id: String,
    pub user_id: String,
    pub amount: f64,
    pub currency: String,
    /// When the event was first enqueued; the transport's TTL backstop
    /// measures age from here
    pub enqueued_at: DateTime<Utc>,
    /// Mutated only by the retry pipeline
    pub retry_count: i32,
}

impl PaymentEvent {
    /// Create a new payment event with a zero retry count
    pub fn new(
        payment_id: impl Into<String>,
        user_id: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            payment_id: payment_id.into(),
            user_id: user_id.into(),
            amount,
            currency: currency.into(),
            enqueued_at: Utc::now(),
            retry_count: 0,
        }
    }

    /// Increment the retry count ahead of a scheduled redelivery
    pub fn increment_retry(&mut self) {
        self.retry_count += 1;
    }

    /// Mark this event as forwarded to the dead-letter sink
    pub fn mark_dead_lettered(&mut self) {
        self.retry_count = DEAD_LETTER_MARKER;
    }

    /// Check whether this event already went to the dead-letter sink
    pub fn is_dead_lettered(&self) -> bool {
        self.retry_count == DEAD_LETTER_MARKER
    }

    /// Check whether the retry budget is spent
    pub fn retries_exhausted(&self, max_retries: i32) -> bool {
        self.retry_count >= max_retries
    }

    /// Age of the event since first enqueue, in milliseconds
    pub fn age_ms(&self) -> u64 {
        Utc::now()
            .signed_duration_since(self.enqueued_at)
            .num_milliseconds()
            .max(0) as u64
    }

    /// Structural validation; a failure here is permanent and routes the
    /// event straight to the dead-letter sink without consuming a retry.
    pub fn validate(&self) -> Result<(), String> {
        if self.payment_id.is_empty() {
            return Err("payment_id must not be empty".to_string());
        }
        if self.user_id.is_empty() {
            return Err("user_id must not be empty".to_string());
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(format!("amount must be positive, got {}", self.amount));
        }
        if self.currency.len() != 3 {
            return Err(format!("currency must be a 3-letter code, got {:?}", self.currency));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> PaymentEvent {
        PaymentEvent::new("PAY_001", "USER_1", 49.99, "USD")
    }

    #[test]
    fn test_retry_bookkeeping() {
        let mut e = event();
        assert_eq!(e.retry_count, 0);
        assert!(!e.retries_exhausted(3));

        e.increment_retry();
        e.increment_retry();
        e.increment_retry();
        assert_eq!(e.retry_count, 3);
        assert!(e.retries_exhausted(3));
    }

    #[test]
    fn test_dead_letter_marker() {
        let mut e = event();
        assert!(!e.is_dead_lettered());
        e.mark_dead_lettered();
        assert!(e.is_dead_lettered());
        assert_eq!(e.retry_count, DEAD_LETTER_MARKER);
    }

    #[test]
    fn test_validation() {
        assert!(event().validate().is_ok());

        let mut bad = event();
        bad.payment_id.clear();
        assert!(bad.validate().is_err());

        let mut bad = event();
        bad.amount = -5.0;
        assert!(bad.validate().is_err());

        let mut bad = event();
        bad.amount = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = event();
        bad.currency = "DOLLARS".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let e = event();
        let json = serde_json::to_string(&e).unwrap();
        let parsed: PaymentEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, e);
    }
}
