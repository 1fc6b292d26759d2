//! # Cache Module
//!
//! Namespaced key/value caching with per-entry TTL, plus the best-effort
//! facade the resilience layers talk to. Cache unavailability must never
//! prevent fallback: the facade swallows store errors, logs them, and
//! degrades to "no value returned".

pub mod service;
pub mod store;

pub use service::CacheService;
pub use store::{CacheError, CacheStore, InMemoryCacheStore};
