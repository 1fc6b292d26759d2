//! End-to-end demo wiring the read path and the payment pipeline against
//! the simulated downstream. Runs in a few seconds with millisecond-scale
//! latency and backoff; the HTTP status a route layer would return is shown
//! next to each read response (200 ok, 206 degraded).

use aegis_core::cache::CacheService;
use aegis_core::config::AegisConfig;
use aegis_core::downstream::SimulatedOrderClient;
use aegis_core::health::{HealthMonitor, RandomHealthStrategy};
use aegis_core::logging::init_structured_logging;
use aegis_core::models::{ApiResponse, PaymentEvent};
use aegis_core::pipeline::{
    DefaultPaymentProcessor, InMemoryDeadLetterSink, PaymentConsumer, PaymentProducer,
};
use aegis_core::resilience::{CircuitBreaker, ResilientOrderService};
use aegis_core::transport::InMemoryTransport;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

fn http_status<T>(response: &ApiResponse<T>) -> u16 {
    if response.ok {
        200
    } else {
        206
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let mut config = AegisConfig::from_env()?;
    // Millisecond-scale knobs so the demo finishes quickly
    config.downstream.latency = Duration::from_millis(20);
    config.read.deadline = Duration::from_millis(500);
    config.read.attempt_delay = Duration::from_millis(50);
    config.pipeline.backoff_unit = Duration::from_millis(25);
    config.health.interval = Duration::from_millis(500);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // --- read path ---
    let cache = Arc::new(CacheService::in_memory(config.cache.clone()));
    let client = Arc::new(SimulatedOrderClient::new(&config.downstream));
    let breaker = Arc::new(CircuitBreaker::new(
        config.read.service_name.clone(),
        config.circuit.clone(),
    ));
    let orders = Arc::new(ResilientOrderService::new(
        client.clone(),
        cache.clone(),
        breaker,
        config.read.clone(),
    ));

    let monitor = HealthMonitor::new(
        cache.clone(),
        Arc::new(RandomHealthStrategy),
        config.health.clone(),
    );
    let monitor_handle = monitor.spawn(shutdown_rx.clone());

    println!("=== Read path: healthy downstream ===");
    client.set_failure_rate(0.0);
    let ids = ["ORD_1001", "ORD_1002", "ORD_1003"];
    let responses = join_all(ids.iter().map(|id| orders.get_with_resilience(id))).await;
    for (id, response) in ids.iter().zip(&responses) {
        println!(
            "GET /orders/{id} -> {} ok={} provenance={}",
            http_status(response),
            response.ok,
            response.provenance
        );
    }

    println!("\n=== Read path: downstream down, cache serves ===");
    client.set_failure_rate(1.0);
    let response = orders.get_with_resilience("ORD_1001").await;
    println!(
        "GET /orders/ORD_1001 -> {} provenance={} ({})",
        http_status(&response),
        response.provenance,
        response.message
    );

    let response = orders.get_with_resilience("ORD_9999").await;
    println!(
        "GET /orders/ORD_9999 -> {} provenance={} ({})",
        http_status(&response),
        response.provenance,
        response.message
    );
    println!("circuit state after failures: {:?}", orders.circuit_state());

    println!("\n=== Read path: manual health gate ===");
    let response = orders.get_with_manual_fallback("ORD_1002").await;
    println!(
        "GET /orders/ORD_1002/manual-fallback -> {} provenance={}",
        http_status(&response),
        response.provenance
    );

    println!("\n=== History tiers ===");
    client.set_failure_rate(0.0);
    let response = orders.get_history_with_tiers("CUST_42").await;
    println!(
        "GET /orders/history/CUST_42 -> {} provenance={} ({} orders)",
        http_status(&response),
        response.provenance,
        response.payload.len()
    );
    client.set_failure_rate(1.0);
    let response = orders.get_history_with_tiers("CUST_42").await;
    println!(
        "GET /orders/history/CUST_42 -> {} provenance={} ({} orders)",
        http_status(&response),
        response.provenance,
        response.payload.len()
    );

    // --- write path ---
    println!("\n=== Payment pipeline ===");
    let transport = Arc::new(InMemoryTransport::new(
        config.pipeline.dead_letter_queue.clone(),
        config.pipeline.message_ttl,
    ));
    for queue in &config.pipeline.queues {
        transport.create_queue(queue);
    }

    let processor = Arc::new(DefaultPaymentProcessor::new());
    let sink = Arc::new(InMemoryDeadLetterSink::new());
    let queue_name = config.pipeline.queues[0].clone();

    let consumer = Arc::new(PaymentConsumer::new(
        transport.clone(),
        processor.clone(),
        sink.clone(),
        config.pipeline.clone(),
    ));
    let queue_consumer = transport
        .consumer(&queue_name)
        .expect("queue consumer available");
    let consumer_task = {
        let consumer = consumer.clone();
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { consumer.run(queue_consumer, shutdown_rx).await })
    };

    let producer = PaymentProducer::new(transport.clone(), queue_name);
    let good = PaymentEvent::new(format!("PAY_{}", Uuid::new_v4()), "USER_1", 49.99, "USD");
    let doomed = PaymentEvent::new("PAY_fail_demo", "USER_2", 12.50, "USD");
    let malformed = PaymentEvent::new("PAY_bad_amount", "USER_3", -3.0, "USD");

    producer.send(&good).await?;
    producer.send(&doomed).await?;
    producer.send(&malformed).await?;

    // Let retries drain: 3 backoffs at 25ms unit is well under a second
    tokio::time::sleep(Duration::from_millis(600)).await;

    println!(
        "processed {} (effect applied {} time(s))",
        good.payment_id,
        processor.effect_count(&good.payment_id)
    );
    for record in sink.records() {
        println!(
            "dead-lettered {} (retry_count={}): {}",
            record.event.payment_id, record.event.retry_count, record.reason
        );
    }

    // --- shutdown: cancel pending retries, stop tasks ---
    shutdown_tx.send(true)?;
    transport.shutdown();
    consumer_task.await?;
    monitor_handle.await?;

    println!("\ndone");
    Ok(())
}
