#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Aegis Core
//!
//! Resilience core protecting callers from an unreliable downstream
//! dependency.
//!
//! ## Overview
//!
//! Two mechanisms share one decision problem — under partial failure and
//! unknown downstream health, do we retry, substitute a stale answer, or
//! give up?
//!
//! - **Synchronous reads**: a circuit-breaker-gated, deadline-bounded call
//!   with tiered fallback (live → cache → static default). A second entry
//!   point gates on an explicit cached health flag instead of the breaker;
//!   both converge on the same fallback resolver.
//! - **Asynchronous writes**: an at-least-once payment pipeline with
//!   bounded retries, exponential backoff, and dead-letter escalation under
//!   manual-ack discipline.
//!
//! HTTP routing, broker glue, and connection pooling are out of scope; the
//! downstream client, cache store, and queue transport are collaborators
//! behind narrow traits, with simulated/in-memory implementations included.
//!
//! ## Module Organization
//!
//! - [`models`] - Order records, payment events, and the tagged response
//! - [`cache`] - Namespaced TTL cache with a best-effort facade
//! - [`downstream`] - Order client trait and the simulated remote service
//! - [`resilience`] - Circuit breaker, read executor, fallback resolver
//! - [`pipeline`] - Retry consumer, processor, producer, dead-letter sink
//! - [`transport`] - Publish/ack/nack primitives and the in-memory broker
//! - [`health`] - Injectable health probing on an interval
//! - [`config`] - Per-subsystem configuration with env overrides
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aegis_core::cache::CacheService;
//! use aegis_core::config::AegisConfig;
//! use aegis_core::downstream::SimulatedOrderClient;
//! use aegis_core::resilience::{CircuitBreaker, ResilientOrderService};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = AegisConfig::from_env().expect("valid configuration");
//! let cache = Arc::new(CacheService::in_memory(config.cache.clone()));
//! let client = Arc::new(SimulatedOrderClient::new(&config.downstream));
//! let breaker = Arc::new(CircuitBreaker::new(
//!     config.read.service_name.clone(),
//!     config.circuit.clone(),
//! ));
//!
//! let orders = ResilientOrderService::new(client, cache, breaker, config.read.clone());
//! let response = orders.get_with_resilience("ORD_1001").await;
//! println!("ok={} provenance={}", response.ok, response.provenance);
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod downstream;
pub mod error;
pub mod health;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod resilience;
pub mod transport;

pub use config::AegisConfig;
pub use error::{AegisError, Result};
pub use models::{ApiResponse, Order, OrderStatus, PaymentEvent, Provenance};
