//! # Transport Module
//!
//! Queue transport primitives consumed by the payment pipeline: publish
//! (immediate or delayed), ack, and nack. The in-memory transport stands in
//! for a broker, with an in-flight table for manual-ack discipline, a
//! dead-letter destination for nacks, and an ingress TTL backstop that
//! diverts expired deliveries independently of the pipeline's retry
//! counting.

pub mod in_memory;
pub mod scheduler;

use crate::models::PaymentEvent;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Unknown queue: {queue}")]
    UnknownQueue { queue: String },

    #[error("Queue {queue} is closed")]
    QueueClosed { queue: String },

    #[error("Delivery {delivery_tag} is not in flight")]
    UnknownDelivery { delivery_tag: u64 },

    #[error("Transport is shut down")]
    ShutDown,
}

/// A single delivery of an event from a queue.
///
/// The same event re-published later is a new delivery with a new tag; the
/// manual-ack discipline is per delivery, not per event.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub event: PaymentEvent,
    pub delivery_tag: u64,
    pub queue: String,
}

/// Send/ack primitives the pipeline consumes
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Publish an event to a queue immediately
    async fn publish(&self, queue: &str, event: &PaymentEvent) -> Result<(), TransportError>;

    /// Publish an event after a delay; the delay is cancellable on shutdown
    async fn publish_delayed(
        &self,
        queue: &str,
        event: &PaymentEvent,
        delay: Duration,
    ) -> Result<(), TransportError>;

    /// Acknowledge a delivery, removing redelivery risk
    async fn ack(&self, delivery: &Delivery) -> Result<(), TransportError>;

    /// Negatively acknowledge a delivery, routing it to the dead-letter queue
    async fn nack(&self, delivery: &Delivery) -> Result<(), TransportError>;
}

pub use in_memory::{InMemoryTransport, QueueConsumer};
pub use scheduler::DelayScheduler;
