//! Downstream order service contract.

use crate::models::Order;
use async_trait::async_trait;
use thiserror::Error;

/// Failures surfaced by the downstream order service
#[derive(Debug, Clone, Error)]
pub enum DownstreamError {
    #[error("External order service is unavailable")]
    Unavailable,

    #[error("Call to external order service timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl DownstreamError {
    /// Both variants are transient: a later attempt may succeed
    pub fn is_transient(&self) -> bool {
        true
    }
}

/// Remote order service client
#[async_trait]
pub trait OrderClient: Send + Sync {
    /// Fetch a single order by id
    async fn fetch_one(&self, order_id: &str) -> Result<Order, DownstreamError>;

    /// Fetch a customer's order history, most recent first
    async fn fetch_history(&self, customer_id: &str) -> Result<Vec<Order>, DownstreamError>;
}
