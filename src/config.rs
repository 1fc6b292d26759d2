//! # Configuration
//!
//! Per-subsystem configuration with environment variable overrides.
//! Defaults mirror production settings; tests and the demo binary override
//! individual fields for millisecond-scale runs.

use crate::error::{AegisError, Result};
use crate::resilience::CircuitBreakerConfig;
use std::time::Duration;

/// Top-level configuration for the resilience core
#[derive(Debug, Clone, Default)]
pub struct AegisConfig {
    pub downstream: DownstreamConfig,
    pub cache: CacheConfig,
    pub read: ReadExecutorConfig,
    pub circuit: CircuitBreakerConfig,
    pub pipeline: PipelineConfig,
    pub health: HealthConfig,
}

/// Knobs for the simulated downstream order service
#[derive(Debug, Clone)]
pub struct DownstreamConfig {
    /// Artificial latency added to every call
    pub latency: Duration,
    /// Probability in `[0.0, 1.0]` that a call fails with `Unavailable`
    pub failure_rate: f64,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(1000),
            failure_rate: 0.3,
        }
    }
}

/// TTLs for the cache namespaces
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached orders
    pub order_ttl: Duration,
    /// TTL for cached order history (fallback namespace)
    pub history_ttl: Duration,
    /// TTL for service health flags; short so staleness self-heals
    pub health_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            order_ttl: Duration::from_secs(3600),
            history_ttl: Duration::from_secs(24 * 3600),
            health_ttl: Duration::from_secs(300),
        }
    }
}

/// Settings for the resilient read executor
#[derive(Debug, Clone)]
pub struct ReadExecutorConfig {
    /// Deadline applied to each downstream attempt
    pub deadline: Duration,
    /// Attempts per guarded call, including the first
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub attempt_delay: Duration,
    /// Service name used for the cached health flag
    pub service_name: String,
}

impl Default for ReadExecutorConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(3),
            max_attempts: 3,
            attempt_delay: Duration::from_secs(1),
            service_name: "order-service".to_string(),
        }
    }
}

/// Settings for the payment retry pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Retries before an event is dead-lettered
    pub max_retries: i32,
    /// Exponential backoff base: delay = base^retry_count * unit
    pub backoff_base: u32,
    /// Backoff unit; production uses one second
    pub backoff_unit: Duration,
    /// Ingress TTL; expired deliveries divert to the dead-letter queue
    pub message_ttl: Duration,
    /// Main ingress queue names
    pub queues: Vec<String>,
    /// Dead-letter queue name
    pub dead_letter_queue: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: 2,
            backoff_unit: Duration::from_millis(1000),
            message_ttl: Duration::from_secs(60),
            queues: vec!["payments-a".to_string(), "payments-b".to_string()],
            dead_letter_queue: "payments-dlq".to_string(),
        }
    }
}

/// Settings for the periodic health monitor
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Interval between health probes
    pub interval: Duration,
    /// Service whose health flag the monitor maintains
    pub service_name: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            service_name: "order-service".to_string(),
        }
    }
}

impl AegisConfig {
    /// Build configuration from defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(rate) = std::env::var("AEGIS_DOWNSTREAM_FAILURE_RATE") {
            config.downstream.failure_rate = rate.parse().map_err(|e| {
                AegisError::configuration(format!("Invalid downstream failure rate: {e}"))
            })?;
        }

        if let Ok(latency) = std::env::var("AEGIS_DOWNSTREAM_LATENCY_MS") {
            config.downstream.latency = parse_ms(&latency, "downstream latency")?;
        }

        if let Ok(deadline) = std::env::var("AEGIS_READ_DEADLINE_MS") {
            config.read.deadline = parse_ms(&deadline, "read deadline")?;
        }

        if let Ok(attempts) = std::env::var("AEGIS_READ_MAX_ATTEMPTS") {
            config.read.max_attempts = attempts
                .parse()
                .map_err(|e| AegisError::configuration(format!("Invalid max attempts: {e}")))?;
        }

        if let Ok(retries) = std::env::var("AEGIS_PIPELINE_MAX_RETRIES") {
            config.pipeline.max_retries = retries
                .parse()
                .map_err(|e| AegisError::configuration(format!("Invalid max retries: {e}")))?;
        }

        if let Ok(unit) = std::env::var("AEGIS_BACKOFF_UNIT_MS") {
            config.pipeline.backoff_unit = parse_ms(&unit, "backoff unit")?;
        }

        if let Ok(interval) = std::env::var("AEGIS_HEALTH_INTERVAL_MS") {
            config.health.interval = parse_ms(&interval, "health interval")?;
        }

        Ok(config)
    }
}

fn parse_ms(value: &str, what: &str) -> Result<Duration> {
    let ms: u64 = value
        .parse()
        .map_err(|e| AegisError::configuration(format!("Invalid {what}: {e}")))?;
    Ok(Duration::from_millis(ms))
}
