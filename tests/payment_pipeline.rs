//! Integration tests for the payment retry pipeline: retry counting and
//! backoff, dead-letter escalation, idempotent reprocessing, and shutdown
//! cancellation of scheduled retries.

use aegis_core::config::PipelineConfig;
use aegis_core::models::PaymentEvent;
use aegis_core::pipeline::{
    DefaultPaymentProcessor, DeliveryOutcome, InMemoryDeadLetterSink, PaymentConsumer,
    PaymentProducer,
};
use aegis_core::transport::{InMemoryTransport, MessageTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

const QUEUE: &str = "payments-a";

struct Harness {
    consumer: PaymentConsumer,
    transport: Arc<InMemoryTransport>,
    processor: Arc<DefaultPaymentProcessor>,
    sink: Arc<InMemoryDeadLetterSink>,
}

fn harness(backoff_unit: Duration) -> Harness {
    let config = PipelineConfig {
        backoff_unit,
        ..PipelineConfig::default()
    };
    let transport = Arc::new(InMemoryTransport::new(
        config.dead_letter_queue.clone(),
        config.message_ttl,
    ));
    transport.create_queue(QUEUE);
    let processor = Arc::new(DefaultPaymentProcessor::new());
    let sink = Arc::new(InMemoryDeadLetterSink::new());
    let consumer = PaymentConsumer::new(
        transport.clone(),
        processor.clone(),
        sink.clone(),
        config,
    );
    Harness {
        consumer,
        transport,
        processor,
        sink,
    }
}

#[tokio::test]
async fn four_failures_three_retries_then_dead_letter() {
    let h = harness(Duration::from_millis(1000));
    let mut queue = h.transport.consumer(QUEUE).unwrap();

    let mut event = PaymentEvent::new("PAY_fail_42", "USER_1", 75.0, "USD");
    let mut retry_counts = Vec::new();
    let mut delays = Vec::new();

    // Three consecutive failures each schedule a retry
    for _ in 0..3 {
        h.transport.publish(QUEUE, &event).await.unwrap();
        let delivery = queue.next().await.unwrap();
        match h.consumer.handle_delivery(&delivery).await {
            DeliveryOutcome::RetryScheduled { retry_count, delay } => {
                retry_counts.push(retry_count);
                delays.push(delay);
                // Simulate the redelivery the scheduler would produce
                event.retry_count = retry_count;
            }
            other => panic!("expected retry, got {other:?}"),
        }
        // Every retry path acks the original delivery
        assert_eq!(h.transport.unacked_count(), 0);
    }

    assert_eq!(retry_counts, vec![1, 2, 3]);
    assert_eq!(
        delays,
        vec![
            Duration::from_millis(2000),
            Duration::from_millis(4000),
            Duration::from_millis(8000),
        ]
    );

    // The fourth failure exhausts the budget and escalates
    h.transport.publish(QUEUE, &event).await.unwrap();
    let delivery = queue.next().await.unwrap();
    let outcome = h.consumer.handle_delivery(&delivery).await;
    assert!(matches!(outcome, DeliveryOutcome::DeadLettered { .. }));
    assert_eq!(h.transport.unacked_count(), 0);

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event.payment_id, "PAY_fail_42");
    assert!(records[0].event.is_dead_lettered());
    assert!(records[0].reason.contains("max retries exceeded"));

    // Cancel the real scheduled redeliveries still pending
    h.transport.shutdown();
}

#[tokio::test]
async fn end_to_end_retry_drain_into_dead_letter() {
    let h = harness(Duration::from_millis(1));
    let queue_consumer = h.transport.consumer(QUEUE).unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let consumer = Arc::new(h.consumer);
    let run_task = {
        let consumer = consumer.clone();
        tokio::spawn(async move { consumer.run(queue_consumer, shutdown_rx).await })
    };

    let producer = PaymentProducer::new(h.transport.clone(), QUEUE);
    producer
        .send(&PaymentEvent::new("PAY_fail_e2e", "USER_1", 10.0, "USD"))
        .await
        .unwrap();

    // 1ms backoff unit: all three retries and the escalation drain quickly
    sleep(Duration::from_millis(300)).await;

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event.payment_id, "PAY_fail_e2e");
    assert_eq!(h.processor.effect_count("PAY_fail_e2e"), 0);

    shutdown_tx.send(true).unwrap();
    h.transport.shutdown();
    run_task.await.unwrap();
}

#[tokio::test]
async fn duplicate_delivery_applies_effect_once() {
    let h = harness(Duration::from_millis(1));
    let queue_consumer = h.transport.consumer(QUEUE).unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let consumer = Arc::new(h.consumer);
    let run_task = {
        let consumer = consumer.clone();
        tokio::spawn(async move { consumer.run(queue_consumer, shutdown_rx).await })
    };

    let producer = PaymentProducer::new(h.transport.clone(), QUEUE);
    let event = PaymentEvent::new("PAY_twice", "USER_1", 10.0, "USD");

    // At-least-once semantics: the same event delivered twice
    producer.send(&event).await.unwrap();
    producer.send(&event).await.unwrap();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(h.processor.effect_count("PAY_twice"), 1);
    assert!(h.sink.is_empty());

    shutdown_tx.send(true).unwrap();
    h.transport.shutdown();
    run_task.await.unwrap();
}

#[tokio::test]
async fn malformed_event_dead_letters_without_retrying() {
    let h = harness(Duration::from_millis(1000));
    let mut queue = h.transport.consumer(QUEUE).unwrap();

    let mut event = PaymentEvent::new("PAY_bad", "USER_1", 10.0, "USD");
    event.currency = "??".to_string();
    h.transport.publish(QUEUE, &event).await.unwrap();

    let delivery = queue.next().await.unwrap();
    let outcome = h.consumer.handle_delivery(&delivery).await;

    assert!(matches!(outcome, DeliveryOutcome::DeadLettered { .. }));
    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert!(records[0].reason.contains("validation failed"));
    // No retry was scheduled for a permanent failure
    assert_eq!(h.transport.pending_delayed(), 0);
}

#[tokio::test]
async fn shutdown_cancels_scheduled_retries() {
    let h = harness(Duration::from_millis(50));
    let mut queue = h.transport.consumer(QUEUE).unwrap();

    let event = PaymentEvent::new("PAY_fail_late", "USER_1", 10.0, "USD");
    h.transport.publish(QUEUE, &event).await.unwrap();
    let delivery = queue.next().await.unwrap();

    let outcome = h.consumer.handle_delivery(&delivery).await;
    assert!(matches!(outcome, DeliveryOutcome::RetryScheduled { .. }));
    assert_eq!(h.transport.pending_delayed(), 1);

    // Shutdown before the 100ms redelivery fires: nothing is resurrected
    h.transport.shutdown();
    sleep(Duration::from_millis(200)).await;
    assert_eq!(h.transport.pending_delayed(), 0);
    let nothing = tokio::time::timeout(Duration::from_millis(30), queue.next()).await;
    assert!(nothing.is_err(), "cancelled retry must not be redelivered");
}
