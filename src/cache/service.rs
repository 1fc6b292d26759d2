//! # Cache Service Facade
//!
//! Namespaced, best-effort helpers over the raw [`CacheStore`]. Every
//! operation catches store errors, logs them, and degrades: writes become
//! no-ops, reads become "absent", and health reads fail closed (an
//! unreachable cache is never trusted as "healthy").

use crate::cache::store::{CacheStore, InMemoryCacheStore};
use crate::config::CacheConfig;
use crate::models::Order;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Namespace for cached orders
pub const ORDER_NAMESPACE: &str = "order";
/// Namespace for cached fallback responses (order history)
pub const FALLBACK_NAMESPACE: &str = "fallback";
/// Namespace for service health flags
pub const HEALTH_NAMESPACE: &str = "health";

const HEALTH_UP: &str = "UP";
const HEALTH_DOWN: &str = "DOWN";

/// Best-effort cache facade used by the read executor and fallback resolver
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
}

impl CacheService {
    /// Create a facade over the given store
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// Create a facade over a fresh in-memory store
    pub fn in_memory(config: CacheConfig) -> Self {
        Self::new(Arc::new(InMemoryCacheStore::new()), config)
    }

    /// Cache an order under the order namespace (best-effort)
    pub async fn cache_order(&self, order: &Order) {
        let value = match serde_json::to_value(order) {
            Ok(value) => value,
            Err(e) => {
                error!(order_id = %order.order_id, error = %e, "Failed to serialize order for caching");
                return;
            }
        };

        match self
            .store
            .put(ORDER_NAMESPACE, &order.order_id, value, self.config.order_ttl)
            .await
        {
            Ok(()) => info!(order_id = %order.order_id, "Cached order"),
            Err(e) => error!(order_id = %order.order_id, error = %e, "Failed to cache order"),
        }
    }

    /// Fetch a cached order; absent on miss, expiry, or store failure
    pub async fn cached_order(&self, order_id: &str) -> Option<Order> {
        match self.store.get(ORDER_NAMESPACE, order_id).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(order) => Some(order),
                Err(e) => {
                    error!(order_id, error = %e, "Failed to deserialize cached order");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                error!(order_id, error = %e, "Failed to retrieve cached order");
                None
            }
        }
    }

    /// Cache an order history list under `history:{customer_id}` (best-effort)
    pub async fn cache_history(&self, customer_id: &str, orders: &[Order]) {
        let key = Self::history_key(customer_id);
        let value = match serde_json::to_value(orders) {
            Ok(value) => value,
            Err(e) => {
                error!(customer_id, error = %e, "Failed to serialize history for caching");
                return;
            }
        };

        match self
            .store
            .put(FALLBACK_NAMESPACE, &key, value, self.config.history_ttl)
            .await
        {
            Ok(()) => info!(customer_id, "Cached fallback response for key: {key}"),
            Err(e) => error!(customer_id, error = %e, "Failed to cache fallback response"),
        }
    }

    /// Fetch cached history; absent on miss, expiry, or store failure
    pub async fn cached_history(&self, customer_id: &str) -> Option<Vec<Order>> {
        let key = Self::history_key(customer_id);
        match self.store.get(FALLBACK_NAMESPACE, &key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(orders) => Some(orders),
                Err(e) => {
                    error!(customer_id, error = %e, "Failed to deserialize cached history");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                error!(customer_id, error = %e, "Failed to retrieve fallback response");
                None
            }
        }
    }

    /// Drop the cached history for a customer (maintenance/tests)
    pub async fn clear_history(&self, customer_id: &str) {
        let key = Self::history_key(customer_id);
        if let Err(e) = self.store.remove(FALLBACK_NAMESPACE, &key).await {
            error!(customer_id, error = %e, "Failed to clear cached history");
        }
    }

    /// Record a service health flag with a short TTL so staleness self-heals
    pub async fn set_service_health(&self, service_name: &str, healthy: bool) {
        let flag = if healthy { HEALTH_UP } else { HEALTH_DOWN };
        match self
            .store
            .put(
                HEALTH_NAMESPACE,
                service_name,
                serde_json::Value::String(flag.to_string()),
                self.config.health_ttl,
            )
            .await
        {
            Ok(()) => debug!(service_name, flag, "Updated service health"),
            Err(e) => error!(service_name, error = %e, "Failed to update service health"),
        }
    }

    /// Read a service health flag. Fail-closed: absence, expiry, or a store
    /// error all read as unhealthy.
    pub async fn is_service_healthy(&self, service_name: &str) -> bool {
        match self.store.get(HEALTH_NAMESPACE, service_name).await {
            Ok(Some(serde_json::Value::String(flag))) => flag == HEALTH_UP,
            Ok(_) => false,
            Err(_) => false,
        }
    }

    fn history_key(customer_id: &str) -> String {
        format!("history:{customer_id}")
    }
}
