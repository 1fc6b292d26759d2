//! # Retry Consumer
//!
//! Drives the per-delivery state machine: process, then ack, schedule a
//! backoff redelivery, or escalate to the dead-letter sink. Exactly one ack
//! is issued per delivery on every path except a failed dead-letter write,
//! which leaves the delivery unacknowledged so the transport retries it.
//! A scheduled retry is a new delivery of the mutated event, so a slow
//! backoff never blocks the consumer.

use crate::config::PipelineConfig;
use crate::models::PaymentEvent;
use crate::pipeline::dead_letter::DeadLetterSink;
use crate::pipeline::processor::{PaymentProcessor, PipelineError};
use crate::pipeline::states::EventState;
use crate::transport::{Delivery, MessageTransport, QueueConsumer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// What the pipeline did with one delivery
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// Processed successfully and acknowledged
    Acked,
    /// Failure with retry budget left; redelivery scheduled
    RetryScheduled { retry_count: i32, delay: Duration },
    /// Forwarded to the dead-letter sink and acknowledged
    DeadLettered { reason: String },
    /// Dead-letter write failed; delivery left unacknowledged
    DeadLetterFailed { reason: String },
}

impl DeliveryOutcome {
    /// The state the delivery's state machine ended in
    pub fn final_state(&self) -> EventState {
        match self {
            Self::Acked => EventState::Acked,
            Self::RetryScheduled { .. } => EventState::RetryScheduled,
            Self::DeadLettered { .. } | Self::DeadLetterFailed { .. } => EventState::DeadLettered,
        }
    }
}

/// Single consumer over one ingress queue
pub struct PaymentConsumer {
    transport: Arc<dyn MessageTransport>,
    processor: Arc<dyn PaymentProcessor>,
    sink: Arc<dyn DeadLetterSink>,
    config: PipelineConfig,
}

impl PaymentConsumer {
    /// Create a consumer over the shared collaborators
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        processor: Arc<dyn PaymentProcessor>,
        sink: Arc<dyn DeadLetterSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            transport,
            processor,
            sink,
            config,
        }
    }

    /// Backoff before redelivery number `retry_count`:
    /// `base^retry_count * unit` (defaults: 2s, 4s, 8s).
    pub fn backoff_delay(&self, retry_count: i32) -> Duration {
        let exponent = retry_count.max(0) as u32;
        self.config.backoff_unit * self.config.backoff_base.saturating_pow(exponent)
    }

    /// Handle one delivery through the state machine. Returns the outcome;
    /// all acking happens inside.
    pub async fn handle_delivery(&self, delivery: &Delivery) -> DeliveryOutcome {
        let mut event = delivery.event.clone();

        info!(
            payment_id = %event.payment_id,
            attempt = event.retry_count + 1,
            queue = %delivery.queue,
            "Processing payment event"
        );

        // An already-escalated event must not be escalated twice
        if event.is_dead_lettered() {
            warn!(
                payment_id = %event.payment_id,
                "Event already dead-lettered, dropping delivery"
            );
            self.ack_quietly(delivery).await;
            return DeliveryOutcome::Acked;
        }

        // Malformed events are permanent: straight to the sink, no retry slot
        if let Err(reason) = event.validate() {
            warn!(
                payment_id = %event.payment_id,
                reason = %reason,
                "Payment event failed validation, routing directly to dead letter"
            );
            return self
                .escalate(&mut event, delivery, &format!("validation failed: {reason}"))
                .await;
        }

        match self.processor.process(&event).await {
            Ok(()) => {
                self.ack_quietly(delivery).await;
                DeliveryOutcome::Acked
            }
            Err(e) if e.is_permanent() => {
                warn!(payment_id = %event.payment_id, error = %e, "Permanent failure, dead-lettering");
                self.escalate(&mut event, delivery, &e.to_string()).await
            }
            Err(e) if !event.retries_exhausted(self.config.max_retries) => {
                self.schedule_retry(&mut event, delivery, &e).await
            }
            Err(e) => {
                error!(
                    payment_id = %event.payment_id,
                    attempts = event.retry_count + 1,
                    error = %e,
                    "Retry budget exhausted, dead-lettering"
                );
                self.escalate(&mut event, delivery, &format!("max retries exceeded: {e}"))
                    .await
            }
        }
    }

    /// Consume deliveries until the queue closes or shutdown fires
    pub async fn run(&self, mut consumer: QueueConsumer, mut shutdown: watch::Receiver<bool>) {
        info!(queue = %consumer.queue(), "Payment consumer started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!(queue = %consumer.queue(), "Payment consumer shutting down");
                    break;
                }
                maybe = consumer.next() => {
                    match maybe {
                        Some(delivery) => {
                            self.handle_delivery(&delivery).await;
                        }
                        None => {
                            info!(queue = %consumer.queue(), "Queue closed, consumer stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// `Processing → RetryScheduled`: increment, back off, re-publish as a
    /// new delivery, ack the original.
    async fn schedule_retry(
        &self,
        event: &mut PaymentEvent,
        delivery: &Delivery,
        cause: &PipelineError,
    ) -> DeliveryOutcome {
        event.increment_retry();
        let delay = self.backoff_delay(event.retry_count);

        match self
            .transport
            .publish_delayed(&delivery.queue, event, delay)
            .await
        {
            Ok(()) => {
                info!(
                    payment_id = %event.payment_id,
                    retry_count = event.retry_count,
                    delay_ms = delay.as_millis() as u64,
                    error = %cause,
                    "Payment event requeued with delay"
                );
                self.ack_quietly(delivery).await;
                DeliveryOutcome::RetryScheduled {
                    retry_count: event.retry_count,
                    delay,
                }
            }
            Err(e) => {
                // No retry path left for this delivery: escalate instead
                error!(
                    payment_id = %event.payment_id,
                    error = %e,
                    "Failed to schedule retry, dead-lettering"
                );
                self.escalate(event, delivery, &format!("retry scheduling failed: {e}"))
                    .await
            }
        }
    }

    /// `Processing → DeadLettered`: mark, intake, ack. A failed intake
    /// leaves the delivery unacknowledged for the transport to redeliver.
    async fn escalate(
        &self,
        event: &mut PaymentEvent,
        delivery: &Delivery,
        reason: &str,
    ) -> DeliveryOutcome {
        event.mark_dead_lettered();

        match self.sink.intake(event, reason).await {
            Ok(()) => {
                self.ack_quietly(delivery).await;
                DeliveryOutcome::DeadLettered {
                    reason: reason.to_string(),
                }
            }
            Err(e) => {
                error!(
                    payment_id = %event.payment_id,
                    error = %e,
                    "Dead letter write failed, leaving delivery unacknowledged"
                );
                DeliveryOutcome::DeadLetterFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn ack_quietly(&self, delivery: &Delivery) {
        if let Err(e) = self.transport.ack(delivery).await {
            warn!(
                delivery_tag = delivery.delivery_tag,
                error = %e,
                "Ack failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::dead_letter::{DeadLetterWriteFailure, InMemoryDeadLetterSink};
    use crate::pipeline::processor::DefaultPaymentProcessor;
    use crate::transport::InMemoryTransport;
    use async_trait::async_trait;

    /// Sink that always fails its writes
    struct FailingSink;

    #[async_trait]
    impl DeadLetterSink for FailingSink {
        async fn intake(&self, _: &PaymentEvent, _: &str) -> Result<(), DeadLetterWriteFailure> {
            Err(DeadLetterWriteFailure::new("disk full"))
        }
    }

    fn pipeline_config() -> PipelineConfig {
        PipelineConfig {
            backoff_unit: Duration::from_millis(1000),
            ..PipelineConfig::default()
        }
    }

    fn build(
        sink: Arc<dyn DeadLetterSink>,
    ) -> (PaymentConsumer, Arc<InMemoryTransport>, Arc<DefaultPaymentProcessor>) {
        let transport = Arc::new(InMemoryTransport::new("payments-dlq", Duration::from_secs(60)));
        transport.create_queue("payments-a");
        let processor = Arc::new(DefaultPaymentProcessor::new());
        let consumer = PaymentConsumer::new(
            transport.clone(),
            processor.clone(),
            sink,
            pipeline_config(),
        );
        (consumer, transport, processor)
    }

    #[test]
    fn test_backoff_delays_match_contract() {
        let (consumer, _, _) = build(Arc::new(InMemoryDeadLetterSink::new()));
        assert_eq!(consumer.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(consumer.backoff_delay(2), Duration::from_millis(4000));
        assert_eq!(consumer.backoff_delay(3), Duration::from_millis(8000));
    }

    #[tokio::test]
    async fn test_success_path_acks() {
        let sink = Arc::new(InMemoryDeadLetterSink::new());
        let (consumer, transport, processor) = build(sink.clone());
        let mut queue = transport.consumer("payments-a").unwrap();

        let event = PaymentEvent::new("PAY_1", "USER_1", 10.0, "USD");
        transport.publish("payments-a", &event).await.unwrap();
        let delivery = queue.next().await.unwrap();

        let outcome = consumer.handle_delivery(&delivery).await;
        assert_eq!(outcome, DeliveryOutcome::Acked);
        assert_eq!(outcome.final_state(), EventState::Acked);
        assert_eq!(transport.unacked_count(), 0);
        assert_eq!(processor.effect_count("PAY_1"), 1);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_skips_retries() {
        let sink = Arc::new(InMemoryDeadLetterSink::new());
        let (consumer, transport, _) = build(sink.clone());
        let mut queue = transport.consumer("payments-a").unwrap();

        let mut event = PaymentEvent::new("PAY_1", "USER_1", 10.0, "USD");
        event.amount = -1.0;
        transport.publish("payments-a", &event).await.unwrap();
        let delivery = queue.next().await.unwrap();

        let outcome = consumer.handle_delivery(&delivery).await;
        assert!(matches!(outcome, DeliveryOutcome::DeadLettered { .. }));
        assert_eq!(transport.unacked_count(), 0);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].reason.contains("validation failed"));
        // No retry slot consumed: the recorded event carries the marker,
        // not an incremented count
        assert!(records[0].event.is_dead_lettered());
    }

    #[tokio::test]
    async fn test_dead_letter_write_failure_leaves_unacked() {
        let (consumer, transport, _) = build(Arc::new(FailingSink));
        let mut queue = transport.consumer("payments-a").unwrap();

        let mut event = PaymentEvent::new("PAY_fail_1", "USER_1", 10.0, "USD");
        event.retry_count = 3; // budget already spent
        transport.publish("payments-a", &event).await.unwrap();
        let delivery = queue.next().await.unwrap();

        let outcome = consumer.handle_delivery(&delivery).await;
        assert!(matches!(outcome, DeliveryOutcome::DeadLetterFailed { .. }));
        // The delivery stays in flight so the transport can redeliver it
        assert_eq!(transport.unacked_count(), 1);
        assert_eq!(transport.redeliver_unacked(), 1);
    }

    #[tokio::test]
    async fn test_already_dead_lettered_event_is_dropped() {
        let sink = Arc::new(InMemoryDeadLetterSink::new());
        let (consumer, transport, processor) = build(sink.clone());
        let mut queue = transport.consumer("payments-a").unwrap();

        let mut event = PaymentEvent::new("PAY_1", "USER_1", 10.0, "USD");
        event.mark_dead_lettered();
        transport.publish("payments-a", &event).await.unwrap();
        let delivery = queue.next().await.unwrap();

        let outcome = consumer.handle_delivery(&delivery).await;
        assert_eq!(outcome, DeliveryOutcome::Acked);
        // Neither re-escalated nor processed
        assert!(sink.is_empty());
        assert_eq!(processor.effect_count("PAY_1"), 0);
    }
}
