//! # Downstream Client
//!
//! The remote order service behind the read path. Only the trait is visible
//! to the resilience layers; the simulated implementation carries the
//! latency and failure-injection knobs used by tests and the demo. No retry
//! or caching logic belongs here.

pub mod client;
pub mod simulated;

pub use client::{DownstreamError, OrderClient};
pub use simulated::SimulatedOrderClient;
