//! Simulated downstream order service with injectable latency and failure
//! rate. Stands in for the real remote dependency in tests and the demo.

use crate::config::DownstreamConfig;
use crate::downstream::client::{DownstreamError, OrderClient};
use crate::models::{Order, OrderStatus};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Simulated remote order service.
///
/// Every call sleeps for the configured latency, then fails with
/// [`DownstreamError::Unavailable`] with the configured probability. Both
/// knobs are adjustable at runtime so tests can force success or failure.
pub struct SimulatedOrderClient {
    latency: RwLock<Duration>,
    failure_rate: RwLock<f64>,
    calls: AtomicU64,
}

impl SimulatedOrderClient {
    /// Create a client from configuration
    pub fn new(config: &DownstreamConfig) -> Self {
        Self {
            latency: RwLock::new(config.latency),
            failure_rate: RwLock::new(config.failure_rate),
            calls: AtomicU64::new(0),
        }
    }

    /// Override the failure probability (`0.0` = always succeed,
    /// `1.0` = always fail)
    pub fn set_failure_rate(&self, rate: f64) {
        *self.failure_rate.write() = rate.clamp(0.0, 1.0);
    }

    /// Override the artificial latency
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// Total calls issued against this client, across both operations
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn simulate_call(&self, operation: &str) -> Result<(), DownstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.read();
        if !latency.is_zero() {
            sleep(latency).await;
        }

        let failure_rate = *self.failure_rate.read();
        if fastrand::f64() < failure_rate {
            debug!(operation, "Injected downstream failure");
            return Err(DownstreamError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl OrderClient for SimulatedOrderClient {
    async fn fetch_one(&self, order_id: &str) -> Result<Order, DownstreamError> {
        self.simulate_call("fetch_one").await?;

        Ok(Order::new(
            order_id,
            format!("CUST_{}", fastrand::u32(..1000)),
            format!("Product_{}", fastrand::u32(..100)),
            fastrand::f64() * 1000.0,
            OrderStatus::Active,
        ))
    }

    async fn fetch_history(&self, customer_id: &str) -> Result<Vec<Order>, DownstreamError> {
        self.simulate_call("fetch_history").await?;

        Ok(vec![
            Order::new("ORD_001", customer_id, "Product A", 299.99, OrderStatus::Completed),
            Order::new("ORD_002", customer_id, "Product B", 149.99, OrderStatus::Shipped),
        ])
    }
}
