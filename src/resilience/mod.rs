//! # Resilience Module
//!
//! The decision core of the crate: deciding, under partial failure and
//! unknown downstream health, whether to retry, substitute a stale answer,
//! or give up.
//!
//! ## Architecture
//!
//! - **Circuit Breaker**: isolates a failing downstream by failing fast
//!   during a cool-down window
//! - **Resilient Read Executor**: composes deadline, bounded retry, and the
//!   breaker around the downstream call, with two entry points (automatic
//!   circuit vs. explicit health gate) converging on one fallback core
//! - **Fallback Resolver**: tiered degradation, live → cache → synthesized
//!   default
//!
//! ## Usage
//!
//! ```rust,no_run
//! use aegis_core::cache::CacheService;
//! use aegis_core::config::AegisConfig;
//! use aegis_core::downstream::SimulatedOrderClient;
//! use aegis_core::resilience::{CircuitBreaker, ResilientOrderService};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = AegisConfig::default();
//! let cache = Arc::new(CacheService::in_memory(config.cache.clone()));
//! let client = Arc::new(SimulatedOrderClient::new(&config.downstream));
//! let breaker = Arc::new(CircuitBreaker::new(
//!     "order-service".to_string(),
//!     config.circuit.clone(),
//! ));
//!
//! let orders = ResilientOrderService::new(client, cache, breaker, config.read.clone());
//! let response = orders.get_with_resilience("ORD_1001").await;
//! println!("{} via {}", response.payload.order_id, response.provenance);
//! # }
//! ```

pub mod circuit_breaker;
pub mod executor;
pub mod fallback;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerMetrics, CircuitState,
};
pub use executor::ResilientOrderService;
pub use fallback::FallbackResolver;
