//! # Health Monitor
//!
//! Periodic health probing for the downstream service, feeding the cached
//! health flag the manual-fallback read path gates on. The probe itself is
//! an injectable strategy: the demo uses a coin flip, production swaps in a
//! real downstream probe, tests pin the answer.

use crate::cache::CacheService;
use crate::config::HealthConfig;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Pluggable health probe
#[async_trait]
pub trait HealthCheckStrategy: Send + Sync {
    /// Probe the downstream; `true` means healthy
    async fn check(&self) -> bool;
}

/// Demo strategy: a coin flip per probe
#[derive(Debug, Default)]
pub struct RandomHealthStrategy;

#[async_trait]
impl HealthCheckStrategy for RandomHealthStrategy {
    async fn check(&self) -> bool {
        fastrand::bool()
    }
}

/// Test strategy with a pinned, switchable answer
#[derive(Debug)]
pub struct StaticHealthStrategy {
    healthy: AtomicBool,
}

impl StaticHealthStrategy {
    /// Create a strategy pinned to the given answer
    pub fn new(healthy: bool) -> Self {
        Self {
            healthy: AtomicBool::new(healthy),
        }
    }

    /// Switch the pinned answer
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl HealthCheckStrategy for StaticHealthStrategy {
    async fn check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

/// Interval task maintaining the cached service health flag
pub struct HealthMonitor {
    cache: Arc<CacheService>,
    strategy: Arc<dyn HealthCheckStrategy>,
    config: HealthConfig,
}

impl HealthMonitor {
    /// Create a monitor over the shared cache and strategy
    pub fn new(
        cache: Arc<CacheService>,
        strategy: Arc<dyn HealthCheckStrategy>,
        config: HealthConfig,
    ) -> Self {
        Self {
            cache,
            strategy,
            config,
        }
    }

    /// Spawn the monitoring task; it probes immediately, then on the
    /// configured interval, stopping when `shutdown` fires.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                service_name = %self.config.service_name,
                interval_ms = self.config.interval.as_millis() as u64,
                "Health monitor started"
            );
            let mut interval = tokio::time::interval(self.config.interval);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        info!(service_name = %self.config.service_name, "Health monitor stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        let healthy = self.strategy.check().await;
                        self.cache
                            .set_service_health(&self.config.service_name, healthy)
                            .await;
                        if healthy {
                            debug!(service_name = %self.config.service_name, "Health probe passed");
                        } else {
                            warn!(service_name = %self.config.service_name, "External service is unhealthy");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_monitor_writes_health_flag() {
        let cache = Arc::new(CacheService::in_memory(CacheConfig::default()));
        let strategy = Arc::new(StaticHealthStrategy::new(true));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let monitor = HealthMonitor::new(
            cache.clone(),
            strategy.clone(),
            HealthConfig {
                interval: Duration::from_millis(10),
                service_name: "order-service".to_string(),
            },
        );
        let handle = monitor.spawn(shutdown_rx);

        sleep(Duration::from_millis(30)).await;
        assert!(cache.is_service_healthy("order-service").await);

        // Flip the probe; the next tick writes DOWN
        strategy.set_healthy(false);
        sleep(Duration::from_millis(30)).await;
        assert!(!cache.is_service_healthy("order-service").await);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_monitor_stops_on_shutdown() {
        let cache = Arc::new(CacheService::in_memory(CacheConfig::default()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let monitor = HealthMonitor::new(
            cache,
            Arc::new(StaticHealthStrategy::new(true)),
            HealthConfig {
                interval: Duration::from_millis(10),
                service_name: "order-service".to_string(),
            },
        );
        let handle = monitor.spawn(shutdown_rx);

        shutdown_tx.send(true).unwrap();
        // The task exits promptly once the signal lands
        tokio::time::timeout(Duration::from_millis(200), handle)
            .await
            .expect("monitor did not stop")
            .unwrap();
    }
}
