//! # In-Memory Transport
//!
//! Named queues over unbounded channels, standing in for a broker behind
//! the [`MessageTransport`] trait. Deliveries become "in flight" when a
//! consumer receives them and stay there until acked or nacked; unacked
//! deliveries can be re-injected, which is the transport-retry hook the
//! dead-letter-write-failure path relies on. Deliveries older than the
//! ingress TTL are diverted to the dead-letter queue at receive time.

use crate::models::PaymentEvent;
use crate::transport::scheduler::DelayScheduler;
use crate::transport::{Delivery, MessageTransport, TransportError};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

#[derive(Debug)]
struct TransportInner {
    queues: DashMap<String, mpsc::UnboundedSender<Delivery>>,
    in_flight: DashMap<u64, Delivery>,
    next_tag: AtomicU64,
    dead_letter_queue: String,
    message_ttl: Duration,
}

impl TransportInner {
    fn enqueue(&self, queue: &str, event: &PaymentEvent) -> Result<(), TransportError> {
        let sender = self
            .queues
            .get(queue)
            .ok_or_else(|| TransportError::UnknownQueue {
                queue: queue.to_string(),
            })?;

        let delivery = Delivery {
            event: event.clone(),
            delivery_tag: self.next_tag.fetch_add(1, Ordering::SeqCst),
            queue: queue.to_string(),
        };

        sender.send(delivery).map_err(|_| TransportError::QueueClosed {
            queue: queue.to_string(),
        })
    }
}

/// Broker stand-in with named queues, manual-ack tracking, and a TTL backstop
pub struct InMemoryTransport {
    inner: Arc<TransportInner>,
    receivers: Mutex<HashMap<String, mpsc::UnboundedReceiver<Delivery>>>,
    scheduler: DelayScheduler,
}

impl InMemoryTransport {
    /// Create a transport with the given dead-letter destination and ingress
    /// TTL. The dead-letter queue itself is created automatically.
    pub fn new(dead_letter_queue: impl Into<String>, message_ttl: Duration) -> Self {
        let transport = Self {
            inner: Arc::new(TransportInner {
                queues: DashMap::new(),
                in_flight: DashMap::new(),
                next_tag: AtomicU64::new(1),
                dead_letter_queue: dead_letter_queue.into(),
                message_ttl,
            }),
            receivers: Mutex::new(HashMap::new()),
            scheduler: DelayScheduler::new(),
        };
        let dlq = transport.inner.dead_letter_queue.clone();
        transport.create_queue(&dlq);
        transport
    }

    /// Declare a queue; idempotent
    pub fn create_queue(&self, queue: &str) {
        if self.inner.queues.contains_key(queue) {
            return;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.queues.insert(queue.to_string(), tx);
        self.receivers.lock().insert(queue.to_string(), rx);
        debug!(queue, "Declared queue");
    }

    /// Take the single consumer handle for a queue. Returns `None` when the
    /// queue is unknown or its consumer was already taken.
    pub fn consumer(&self, queue: &str) -> Option<QueueConsumer> {
        self.receivers.lock().remove(queue).map(|rx| QueueConsumer {
            queue: queue.to_string(),
            rx,
            inner: self.inner.clone(),
        })
    }

    /// Number of deliveries received but not yet acked or nacked
    pub fn unacked_count(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Re-inject every unacked delivery into its original queue, as a broker
    /// would after a visibility timeout. Returns the number re-injected.
    pub fn redeliver_unacked(&self) -> usize {
        let tags: Vec<u64> = self.inner.in_flight.iter().map(|e| *e.key()).collect();
        let mut redelivered = 0;
        for tag in tags {
            if let Some((_, delivery)) = self.inner.in_flight.remove(&tag) {
                match self.inner.enqueue(&delivery.queue, &delivery.event) {
                    Ok(()) => redelivered += 1,
                    Err(e) => error!(queue = %delivery.queue, error = %e, "Failed to redeliver"),
                }
            }
        }
        redelivered
    }

    /// Cancel pending delayed publishes; used on process shutdown
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    /// Pending delayed publishes (monitoring/tests)
    pub fn pending_delayed(&self) -> usize {
        self.scheduler.pending_count()
    }
}

#[async_trait]
impl MessageTransport for InMemoryTransport {
    async fn publish(&self, queue: &str, event: &PaymentEvent) -> Result<(), TransportError> {
        self.inner.enqueue(queue, event)
    }

    async fn publish_delayed(
        &self,
        queue: &str,
        event: &PaymentEvent,
        delay: Duration,
    ) -> Result<(), TransportError> {
        if !self.inner.queues.contains_key(queue) {
            return Err(TransportError::UnknownQueue {
                queue: queue.to_string(),
            });
        }

        let inner = self.inner.clone();
        let queue = queue.to_string();
        let event = event.clone();
        let scheduled = self.scheduler.schedule(delay, async move {
            if let Err(e) = inner.enqueue(&queue, &event) {
                error!(queue = %queue, payment_id = %event.payment_id, error = %e, "Delayed publish failed");
            }
        });

        if scheduled {
            Ok(())
        } else {
            Err(TransportError::ShutDown)
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), TransportError> {
        self.inner
            .in_flight
            .remove(&delivery.delivery_tag)
            .map(|_| ())
            .ok_or(TransportError::UnknownDelivery {
                delivery_tag: delivery.delivery_tag,
            })
    }

    async fn nack(&self, delivery: &Delivery) -> Result<(), TransportError> {
        self.inner
            .in_flight
            .remove(&delivery.delivery_tag)
            .ok_or(TransportError::UnknownDelivery {
                delivery_tag: delivery.delivery_tag,
            })?;
        let dlq = self.inner.dead_letter_queue.clone();
        self.inner.enqueue(&dlq, &delivery.event)
    }
}

/// Single-consumer handle for one queue
pub struct QueueConsumer {
    queue: String,
    rx: mpsc::UnboundedReceiver<Delivery>,
    inner: Arc<TransportInner>,
}

impl QueueConsumer {
    /// Receive the next delivery, registering it as in flight.
    ///
    /// Deliveries whose event age exceeds the ingress TTL are diverted to
    /// the dead-letter queue here, independent of the pipeline's retry
    /// counting, and the next delivery is awaited instead.
    pub async fn next(&mut self) -> Option<Delivery> {
        loop {
            let delivery = self.rx.recv().await?;

            let expired = !self.inner.message_ttl.is_zero()
                && delivery.event.age_ms() > self.inner.message_ttl.as_millis() as u64;
            if expired && self.queue != self.inner.dead_letter_queue {
                warn!(
                    queue = %self.queue,
                    payment_id = %delivery.event.payment_id,
                    age_ms = delivery.event.age_ms(),
                    "Delivery expired on ingress, routing to dead-letter queue"
                );
                let dlq = self.inner.dead_letter_queue.clone();
                if let Err(e) = self.inner.enqueue(&dlq, &delivery.event) {
                    error!(error = %e, "Failed to divert expired delivery");
                }
                continue;
            }

            self.inner
                .in_flight
                .insert(delivery.delivery_tag, delivery.clone());
            return Some(delivery);
        }
    }

    /// Queue this consumer is attached to
    pub fn queue(&self) -> &str {
        &self.queue
    }
}
