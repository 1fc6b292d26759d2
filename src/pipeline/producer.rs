//! Payment event producer: the write API's entry point into the queue.

use crate::models::PaymentEvent;
use crate::transport::{MessageTransport, TransportError};
use std::sync::Arc;
use tracing::{error, info};

/// Publishes payment events onto a main ingress queue
#[derive(Clone)]
pub struct PaymentProducer {
    transport: Arc<dyn MessageTransport>,
    queue: String,
}

impl PaymentProducer {
    /// Create a producer for one ingress queue
    pub fn new(transport: Arc<dyn MessageTransport>, queue: impl Into<String>) -> Self {
        Self {
            transport,
            queue: queue.into(),
        }
    }

    /// Enqueue a payment event; transport failures propagate to the caller
    pub async fn send(&self, event: &PaymentEvent) -> Result<(), TransportError> {
        match self.transport.publish(&self.queue, event).await {
            Ok(()) => {
                info!(payment_id = %event.payment_id, queue = %self.queue, "Payment event sent");
                Ok(())
            }
            Err(e) => {
                error!(
                    payment_id = %event.payment_id,
                    queue = %self.queue,
                    error = %e,
                    "Failed to send payment event"
                );
                Err(e)
            }
        }
    }

    /// Queue this producer publishes to
    pub fn queue(&self) -> &str {
        &self.queue
    }
}
