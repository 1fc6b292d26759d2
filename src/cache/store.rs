//! # Cache Store
//!
//! The raw store contract and an in-memory implementation over `DashMap`
//! with lazy TTL expiry. A production deployment would put Redis behind the
//! same trait; nothing above the trait knows the difference.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors raised by a cache store implementation
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {message}")]
    Unavailable { message: String },

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Namespaced key/value store with per-entry TTL
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store a value under `namespace:key`, expiring after `ttl`
    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: Value,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Fetch a value; `None` when absent or expired
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, CacheError>;

    /// Remove a single entry
    async fn remove(&self, namespace: &str, key: &str) -> Result<(), CacheError>;

    /// Drop every entry in a namespace
    async fn clear_namespace(&self, namespace: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// In-memory cache store with lazy expiry on read
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCacheStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly expired-but-unswept) entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn full_key(namespace: &str, key: &str) -> String {
        format!("{namespace}:{key}")
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: Value,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.entries.insert(
            Self::full_key(namespace, key),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, CacheError> {
        let full_key = Self::full_key(namespace, key);
        // The read guard must drop before the expired-entry sweep below
        if let Some(entry) = self.entries.get(&full_key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove(&full_key);
        Ok(None)
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<(), CacheError> {
        self.entries.remove(&Self::full_key(namespace, key));
        Ok(())
    }

    async fn clear_namespace(&self, namespace: &str) -> Result<(), CacheError> {
        let prefix = format!("{namespace}:");
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }
}
