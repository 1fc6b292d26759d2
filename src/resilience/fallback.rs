//! # Fallback Resolver
//!
//! Tiered degradation shared by both read-path entry points. For single
//! orders: cache, then synthesized default. For history: the secondary
//! fallback cache, then a one-element placeholder list. No tier errors;
//! absence falls through silently and the final tier is pure construction,
//! so resolution always produces a response.

use crate::cache::CacheService;
use crate::models::{ApiResponse, Order};
use std::sync::Arc;
use tracing::{info, warn};

/// Resolves degraded responses when the live tier is unavailable
#[derive(Clone)]
pub struct FallbackResolver {
    cache: Arc<CacheService>,
}

impl FallbackResolver {
    /// Create a resolver over the shared cache facade
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self { cache }
    }

    /// Resolve a single-order fallback: cache first, sentinel default last.
    pub async fn resolve(&self, order_id: &str, reason: &str) -> ApiResponse<Order> {
        warn!(order_id, reason, "Fallback triggered for order");

        if let Some(cached) = self.cache.cached_order(order_id).await {
            info!(order_id, "Returning cached order");
            return ApiResponse::cached(cached);
        }

        info!(order_id, "Returning default order");
        ApiResponse::fallback(
            Order::unavailable(order_id),
            format!("Service temporarily unavailable. Default response provided. ({reason})"),
        )
    }

    /// Resolve a history fallback: fallback cache namespace first, then the
    /// one-element placeholder list.
    pub async fn resolve_history(&self, customer_id: &str, reason: &str) -> ApiResponse<Vec<Order>> {
        warn!(customer_id, reason, "Fallback triggered for order history");

        if let Some(cached) = self.cache.cached_history(customer_id).await {
            if !cached.is_empty() {
                info!(customer_id, count = cached.len(), "Returning cached order history");
                return ApiResponse::cached(cached);
            }
        }

        ApiResponse::fallback(
            vec![Order::history_placeholder(customer_id)],
            "Service temporarily unavailable",
        )
    }
}
