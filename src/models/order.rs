//! # Order Record
//!
//! The domain record served by the read path, including the sentinel
//! instances returned when no data tier succeeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order is open and being fulfilled
    Active,
    /// Order was fulfilled
    Completed,
    /// Order has shipped
    Shipped,
    /// Sentinel status for a synthesized single-order default
    Cached,
    /// Sentinel status for synthesized history entries
    Unavailable,
}

impl OrderStatus {
    /// Check whether this status marks a synthesized (non-live) record
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Cached | Self::Unavailable)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Shipped => write!(f, "SHIPPED"),
            Self::Cached => write!(f, "CACHED"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "COMPLETED" => Ok(Self::Completed),
            "SHIPPED" => Ok(Self::Shipped),
            "CACHED" => Ok(Self::Cached),
            "UNAVAILABLE" => Ok(Self::Unavailable),
            _ => Err(format!("Invalid order status: {s}")),
        }
    }
}

/// A customer order as returned by the downstream service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub product_name: String,
    pub amount: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a new order record
    pub fn new(
        order_id: impl Into<String>,
        customer_id: impl Into<String>,
        product_name: impl Into<String>,
        amount: f64,
        status: OrderStatus,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            customer_id: customer_id.into(),
            product_name: product_name.into(),
            amount,
            status,
            created_at: Utc::now(),
        }
    }

    /// Sentinel default for an order id when no data tier succeeds.
    ///
    /// Constructible from the id alone: unknown customer, zero amount.
    pub fn unavailable(order_id: impl Into<String>) -> Self {
        Self::new(
            order_id,
            "UNKNOWN",
            "Service Unavailable",
            0.0,
            OrderStatus::Cached,
        )
    }

    /// Sentinel history entry for a customer with no reachable history
    pub fn history_placeholder(customer_id: impl Into<String>) -> Self {
        Self::new(
            "UNKNOWN",
            customer_id,
            "No recent orders",
            0.0,
            OrderStatus::Unavailable,
        )
    }

    /// Check whether this record is one of the synthesized sentinels
    pub fn is_sentinel(&self) -> bool {
        self.status.is_sentinel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_sentinel() {
        let order = Order::unavailable("ORD_42");
        assert_eq!(order.order_id, "ORD_42");
        assert_eq!(order.customer_id, "UNKNOWN");
        assert_eq!(order.amount, 0.0);
        assert_eq!(order.status, OrderStatus::Cached);
        assert!(order.is_sentinel());
    }

    #[test]
    fn test_history_placeholder() {
        let order = Order::history_placeholder("CUST_7");
        assert_eq!(order.order_id, "UNKNOWN");
        assert_eq!(order.customer_id, "CUST_7");
        assert_eq!(order.product_name, "No recent orders");
        assert_eq!(order.status, OrderStatus::Unavailable);
    }

    #[test]
    fn test_status_string_conversion() {
        assert_eq!(OrderStatus::Shipped.to_string(), "SHIPPED");
        assert_eq!(
            "COMPLETED".parse::<OrderStatus>().unwrap(),
            OrderStatus::Completed
        );
        assert!("bogus".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_serde_round_trip() {
        let order = Order::new("ORD_001", "CUST_1", "Product A", 299.99, OrderStatus::Active);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "ACTIVE");
        let parsed: Order = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, order);
    }
}
