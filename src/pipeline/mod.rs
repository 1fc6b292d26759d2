//! # Payment Retry Pipeline
//!
//! At-least-once processing of queued payment events with bounded retries,
//! exponential backoff, and dead-letter escalation. The consumer drives a
//! per-delivery state machine and issues exactly one ack per delivery on
//! every path except a failed dead-letter write, which deliberately leaves
//! the delivery unacknowledged so the transport retries the sink write.

pub mod consumer;
pub mod dead_letter;
pub mod processor;
pub mod producer;
pub mod states;

pub use consumer::{DeliveryOutcome, PaymentConsumer};
pub use dead_letter::{DeadLetterRecord, DeadLetterSink, DeadLetterWriteFailure, InMemoryDeadLetterSink};
pub use processor::{DefaultPaymentProcessor, PaymentProcessor, PipelineError};
pub use producer::PaymentProducer;
pub use states::EventState;
