//! # Resilient Read Executor
//!
//! Wraps the downstream client with a deadline, bounded retry, and the
//! circuit breaker, delegating to the fallback resolver on any failure.
//! Two entry points express two policies over the same fallback core:
//! `get_with_resilience` gates on the automatic circuit breaker, while
//! `get_with_manual_fallback` gates on the cached service health flag.
//! Callers only ever see a tagged response, never a raw error.

use crate::cache::CacheService;
use crate::config::ReadExecutorConfig;
use crate::downstream::{DownstreamError, OrderClient};
use crate::models::{ApiResponse, Order};
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
use crate::resilience::fallback::FallbackResolver;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

/// Circuit-gated, deadline-bounded order reads with tiered fallback
pub struct ResilientOrderService {
    client: Arc<dyn OrderClient>,
    cache: Arc<CacheService>,
    fallback: FallbackResolver,
    breaker: Arc<CircuitBreaker>,
    config: ReadExecutorConfig,
}

impl ResilientOrderService {
    /// Create an executor over the shared collaborators
    pub fn new(
        client: Arc<dyn OrderClient>,
        cache: Arc<CacheService>,
        breaker: Arc<CircuitBreaker>,
        config: ReadExecutorConfig,
    ) -> Self {
        let fallback = FallbackResolver::new(cache.clone());
        Self {
            client,
            cache,
            fallback,
            breaker,
            config,
        }
    }

    /// Fetch an order through the circuit breaker.
    ///
    /// An open circuit skips the downstream entirely and resolves fallback
    /// immediately. Otherwise the guarded call runs up to `max_attempts`
    /// deadline-bounded attempts with a fixed inter-attempt delay; the
    /// breaker records one outcome for the whole attempt series.
    pub async fn get_with_resilience(&self, order_id: &str) -> ApiResponse<Order> {
        info!(order_id, "Attempting to fetch order details");

        let outcome = self
            .breaker
            .call(|| self.attempt_with_retries(order_id))
            .await;

        match outcome {
            Ok(order) => {
                self.cache.cache_order(&order).await;
                self.cache
                    .set_service_health(&self.config.service_name, true)
                    .await;
                ApiResponse::live(order)
            }
            Err(CircuitBreakerError::CircuitOpen { component }) => {
                warn!(order_id, component = %component, "Circuit open, skipping downstream call");
                self.fallback.resolve(order_id, "circuit breaker open").await
            }
            Err(CircuitBreakerError::OperationFailed(e)) => {
                error!(order_id, error = %e, "External service call failed");
                self.cache
                    .set_service_health(&self.config.service_name, false)
                    .await;
                self.fallback.resolve(order_id, &e.to_string()).await
            }
        }
    }

    /// Fetch an order gated on the cached health flag instead of the
    /// breaker: unhealthy skips the call outright; healthy attempts exactly
    /// one deadline-bounded call and updates the flag afterward.
    pub async fn get_with_manual_fallback(&self, order_id: &str) -> ApiResponse<Order> {
        if !self
            .cache
            .is_service_healthy(&self.config.service_name)
            .await
        {
            warn!(order_id, "Service is marked as unhealthy, using fallback");
            return self.fallback.resolve(order_id, "service marked unhealthy").await;
        }

        match self.attempt_once(order_id).await {
            Ok(order) => {
                self.cache.cache_order(&order).await;
                self.cache
                    .set_service_health(&self.config.service_name, true)
                    .await;
                ApiResponse::live(order)
            }
            Err(e) => {
                error!(order_id, error = %e, "Service call failed, falling back");
                self.cache
                    .set_service_health(&self.config.service_name, false)
                    .await;
                self.fallback.resolve(order_id, &e.to_string()).await
            }
        }
    }

    /// Fetch a customer's order history with three tiers: live (populating
    /// the fallback cache), cached, placeholder. Each tier is guarded
    /// independently, so a live failure cannot prevent the cache tier.
    pub async fn get_history_with_tiers(&self, customer_id: &str) -> ApiResponse<Vec<Order>> {
        match self.attempt_history(customer_id).await {
            Ok(orders) => {
                self.cache.cache_history(customer_id, &orders).await;
                ApiResponse::live(orders)
            }
            Err(e) => {
                warn!(customer_id, error = %e, "Live history tier failed, trying cache");
                self.fallback
                    .resolve_history(customer_id, &e.to_string())
                    .await
            }
        }
    }

    /// Current circuit state (monitoring)
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// One deadline-bounded attempt per retry slot, fixed delay between
    async fn attempt_with_retries(&self, order_id: &str) -> Result<Order, DownstreamError> {
        let mut last_error = DownstreamError::Unavailable;

        for attempt in 1..=self.config.max_attempts {
            match self.attempt_once(order_id).await {
                Ok(order) => return Ok(order),
                Err(e) => {
                    warn!(
                        order_id,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "Downstream attempt failed"
                    );
                    last_error = e;
                }
            }

            if attempt < self.config.max_attempts && !self.config.attempt_delay.is_zero() {
                sleep(self.config.attempt_delay).await;
            }
        }

        Err(last_error)
    }

    async fn attempt_once(&self, order_id: &str) -> Result<Order, DownstreamError> {
        match timeout(self.config.deadline, self.client.fetch_one(order_id)).await {
            Ok(result) => result,
            Err(_) => Err(DownstreamError::Timeout {
                timeout_ms: self.config.deadline.as_millis() as u64,
            }),
        }
    }

    async fn attempt_history(&self, customer_id: &str) -> Result<Vec<Order>, DownstreamError> {
        match timeout(self.config.deadline, self.client.fetch_history(customer_id)).await {
            Ok(result) => result,
            Err(_) => Err(DownstreamError::Timeout {
                timeout_ms: self.config.deadline.as_millis() as u64,
            }),
        }
    }
}
