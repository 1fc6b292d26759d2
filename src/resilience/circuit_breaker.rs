//! # Circuit Breaker Implementation
//!
//! Fault isolation for the downstream order service. Follows the classic
//! three-state pattern: Closed (normal operation), Open (failing fast), and
//! HalfOpen (testing recovery). Opening is driven by the failure ratio over
//! a rolling window of recent call outcomes rather than a consecutive-error
//! count, so a burst of mixed results is judged proportionally.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - limited calls allowed to probe downstream health
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open, // Default to safest state
        }
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, rejecting all calls
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation failed and was recorded toward the window
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

/// Configuration parameters for a circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of recent call outcomes kept in the rolling window
    pub window_size: usize,
    /// Minimum outcomes in the window before the ratio is evaluated
    pub min_calls: usize,
    /// Failure ratio in `[0.0, 1.0]` at which the circuit opens
    pub failure_ratio: f64,
    /// How long the circuit stays open before probing recovery
    pub cooldown: Duration,
    /// Trial successes required in HalfOpen before closing
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            min_calls: 5,
            failure_ratio: 0.5,
            cooldown: Duration::from_secs(30),
            success_threshold: 1,
        }
    }
}

/// Rolling window of call outcomes (`true` = success)
#[derive(Debug)]
struct RollingWindow {
    outcomes: VecDeque<bool>,
    capacity: usize,
    failures: usize,
}

impl RollingWindow {
    fn new(capacity: usize) -> Self {
        Self {
            outcomes: VecDeque::with_capacity(capacity),
            capacity,
            failures: 0,
        }
    }

    fn record(&mut self, success: bool) {
        if self.outcomes.len() == self.capacity {
            if let Some(evicted) = self.outcomes.pop_front() {
                if !evicted {
                    self.failures -= 1;
                }
            }
        }
        self.outcomes.push_back(success);
        if !success {
            self.failures += 1;
        }
    }

    fn len(&self) -> usize {
        self.outcomes.len()
    }

    fn failure_ratio(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.failures as f64 / self.outcomes.len() as f64
        }
    }

    fn reset(&mut self) {
        self.outcomes.clear();
        self.failures = 0;
    }
}

/// Mutable breaker internals held under one mutex (single mutation point)
#[derive(Debug)]
struct BreakerInner {
    window: RollingWindow,
    half_open_calls: u32,
    half_open_successes: u32,
    total_calls: u64,
    total_failures: u64,
}

/// Point-in-time snapshot of breaker state for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub window_calls: usize,
    pub window_failure_ratio: f64,
    pub total_calls: u64,
    pub total_failures: u64,
}

/// Core circuit breaker with atomic state management
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging and metrics
    name: String,

    /// Current circuit state (atomic for thread safety)
    state: AtomicU8,

    /// Configuration parameters
    config: CircuitBreakerConfig,

    /// Rolling window and counters protected by mutex
    inner: Arc<Mutex<BreakerInner>>,

    /// Time when circuit was opened (for cool-down calculations)
    opened_at: Arc<Mutex<Option<Instant>>>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: String, config: CircuitBreakerConfig) -> Self {
        info!(
            component = %name,
            window_size = config.window_size,
            failure_ratio = config.failure_ratio,
            cooldown_ms = config.cooldown.as_millis() as u64,
            success_threshold = config.success_threshold,
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            inner: Arc::new(Mutex::new(BreakerInner {
                window: RollingWindow::new(config.window_size),
                half_open_calls: 0,
                half_open_successes: 0,
                total_calls: 0,
                total_failures: 0,
            })),
            config,
            opened_at: Arc::new(Mutex::new(None)),
        }
    }

    /// Get current circuit state
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Execute an operation with circuit breaker protection
    pub async fn call<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.admit_call().await {
            return Err(CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
            });
        }

        let start_time = Instant::now();
        let result = operation().await;
        let duration = start_time.elapsed();

        match &result {
            Ok(_) => self.record_success(duration).await,
            Err(_) => self.record_failure(duration).await,
        }

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Decide whether a call may proceed, transitioning Open → HalfOpen when
    /// the cool-down has elapsed. Trial admissions are counted under the
    /// inner lock so that HalfOpen admits exactly `success_threshold` probes
    /// even under concurrent callers.
    async fn admit_call(&self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let opened_at = self.opened_at.lock().await;
                // Re-check under the lock: a concurrent caller may have
                // already moved the circuit to half-open
                if self.state() == CircuitState::HalfOpen {
                    drop(opened_at);
                    return self.admit_trial().await;
                }
                match *opened_at {
                    Some(opened_time) if opened_time.elapsed() >= self.config.cooldown => {
                        drop(opened_at);
                        self.transition_to_half_open().await;
                        self.admit_trial().await
                    }
                    Some(_) => false,
                    None => {
                        // Open with no timestamp should not happen; admit the call
                        warn!(component = %self.name, "Circuit open but no timestamp recorded");
                        true
                    }
                }
            }
            CircuitState::HalfOpen => self.admit_trial().await,
        }
    }

    /// Claim one of the half-open trial slots
    async fn admit_trial(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.half_open_calls < self.config.success_threshold {
            inner.half_open_calls += 1;
            true
        } else {
            false
        }
    }

    /// Record a successful operation
    async fn record_success(&self, duration: Duration) {
        let mut inner = self.inner.lock().await;
        inner.total_calls += 1;
        inner.window.record(true);

        debug!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            "🟢 Operation succeeded"
        );

        if self.state() == CircuitState::HalfOpen {
            inner.half_open_successes += 1;
            if inner.half_open_successes >= self.config.success_threshold {
                drop(inner);
                self.transition_to_closed().await;
            }
        }
    }

    /// Record a failed operation
    async fn record_failure(&self, duration: Duration) {
        let mut inner = self.inner.lock().await;
        inner.total_calls += 1;
        inner.total_failures += 1;
        inner.window.record(false);

        error!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            "🔴 Operation failed"
        );

        match self.state() {
            CircuitState::Closed => {
                if inner.window.len() >= self.config.min_calls
                    && inner.window.failure_ratio() >= self.config.failure_ratio
                {
                    drop(inner);
                    self.transition_to_open().await;
                }
            }
            CircuitState::HalfOpen => {
                // Any failure during a trial immediately reopens the circuit
                drop(inner);
                self.transition_to_open().await;
            }
            CircuitState::Open => {}
        }
    }

    /// Transition to closed state (normal operation)
    async fn transition_to_closed(&self) {
        self.state.store(CircuitState::Closed as u8, Ordering::Release);

        // Lock order matches transition_to_open: opened_at, then inner
        let mut opened_at = self.opened_at.lock().await;
        *opened_at = None;
        drop(opened_at);

        let mut inner = self.inner.lock().await;
        inner.window.reset();
        inner.half_open_calls = 0;
        inner.half_open_successes = 0;

        info!(
            component = %self.name,
            total_calls = inner.total_calls,
            "🟢 Circuit breaker closed (recovered)"
        );
    }

    /// Transition to open state (failing fast)
    async fn transition_to_open(&self) {
        self.state.store(CircuitState::Open as u8, Ordering::Release);

        let mut opened_at = self.opened_at.lock().await;
        *opened_at = Some(Instant::now());

        let mut inner = self.inner.lock().await;
        inner.half_open_calls = 0;
        inner.half_open_successes = 0;

        error!(
            component = %self.name,
            window_failure_ratio = inner.window.failure_ratio(),
            cooldown_ms = self.config.cooldown.as_millis() as u64,
            "🔴 Circuit breaker opened (failing fast)"
        );
    }

    /// Transition to half-open state (testing recovery)
    async fn transition_to_half_open(&self) {
        self.state.store(CircuitState::HalfOpen as u8, Ordering::Release);

        let mut inner = self.inner.lock().await;
        inner.half_open_calls = 0;
        inner.half_open_successes = 0;

        info!(
            component = %self.name,
            success_threshold = self.config.success_threshold,
            "🟡 Circuit breaker half-open (testing recovery)"
        );
    }

    /// Force circuit to open state (emergency stop)
    pub async fn force_open(&self) {
        warn!(component = %self.name, "🚨 Circuit breaker forced open");
        self.transition_to_open().await;
    }

    /// Force circuit to closed state (emergency recovery)
    pub async fn force_closed(&self) {
        warn!(component = %self.name, "🚨 Circuit breaker forced closed");
        self.transition_to_closed().await;
    }

    /// Get a metrics snapshot for monitoring
    pub async fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock().await;
        CircuitBreakerMetrics {
            state: self.state(),
            window_calls: inner.window.len(),
            window_failure_ratio: inner.window.failure_ratio(),
            total_calls: inner.total_calls,
            total_failures: inner.total_failures,
        }
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn config(window_size: usize, min_calls: usize, cooldown: Duration) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            window_size,
            min_calls,
            failure_ratio: 0.5,
            cooldown,
            success_threshold: 1,
        }
    }

    #[tokio::test]
    async fn test_normal_operation() {
        let circuit = CircuitBreaker::new(
            "test".to_string(),
            config(4, 2, Duration::from_millis(100)),
        );

        assert_eq!(circuit.state(), CircuitState::Closed);

        let result = circuit.call(|| async { Ok::<_, String>("success") }).await;
        assert!(result.is_ok());

        let metrics = circuit.metrics().await;
        assert_eq!(metrics.total_calls, 1);
        assert_eq!(metrics.total_failures, 0);
        assert_eq!(metrics.window_failure_ratio, 0.0);
    }

    #[tokio::test]
    async fn test_opens_on_failure_ratio() {
        let circuit = CircuitBreaker::new(
            "test".to_string(),
            config(4, 2, Duration::from_millis(100)),
        );

        // One failure: below min_calls, circuit stays closed
        let _ = circuit.call(|| async { Err::<String, _>("error") }).await;
        assert_eq!(circuit.state(), CircuitState::Closed);

        // Second failure: window ratio 1.0 >= 0.5 with min_calls met
        let _ = circuit.call(|| async { Err::<String, _>("error") }).await;
        assert_eq!(circuit.state(), CircuitState::Open);

        // Next call fails fast without executing
        let result = circuit
            .call(|| async { Ok::<_, String>("should not execute") })
            .await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen { .. })));
    }

    #[tokio::test]
    async fn test_mixed_outcomes_below_ratio_stay_closed() {
        let circuit = CircuitBreaker::new(
            "test".to_string(),
            CircuitBreakerConfig {
                window_size: 10,
                min_calls: 4,
                failure_ratio: 0.6,
                cooldown: Duration::from_millis(100),
                success_threshold: 1,
            },
        );

        // Two failures out of four is a 0.5 ratio, below the 0.6 threshold
        let _ = circuit.call(|| async { Err::<String, _>("error") }).await;
        let _ = circuit.call(|| async { Ok::<_, String>("ok") }).await;
        let _ = circuit.call(|| async { Err::<String, _>("error") }).await;
        let _ = circuit.call(|| async { Ok::<_, String>("ok") }).await;

        assert_eq!(circuit.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_recovery_through_half_open() {
        let circuit = CircuitBreaker::new(
            "test".to_string(),
            config(2, 1, Duration::from_millis(50)),
        );

        let _ = circuit.call(|| async { Err::<String, _>("error") }).await;
        assert_eq!(circuit.state(), CircuitState::Open);

        sleep(Duration::from_millis(60)).await;

        // Trial call transitions to half-open, succeeds, and closes the circuit
        let result = circuit.call(|| async { Ok::<_, String>("success") }).await;
        assert!(result.is_ok());
        assert_eq!(circuit.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_trial_failure_reopens() {
        let circuit = CircuitBreaker::new(
            "test".to_string(),
            config(2, 1, Duration::from_millis(50)),
        );

        let _ = circuit.call(|| async { Err::<String, _>("error") }).await;
        assert_eq!(circuit.state(), CircuitState::Open);

        sleep(Duration::from_millis(60)).await;

        let _ = circuit.call(|| async { Err::<String, _>("still down") }).await;
        assert_eq!(circuit.state(), CircuitState::Open);

        // Back in cool-down: fail fast again
        let result = circuit.call(|| async { Ok::<_, String>("nope") }).await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen { .. })));
    }

    #[tokio::test]
    async fn test_force_operations() {
        let circuit = CircuitBreaker::new(
            "test".to_string(),
            config(4, 2, Duration::from_secs(1)),
        );

        circuit.force_open().await;
        assert_eq!(circuit.state(), CircuitState::Open);

        circuit.force_closed().await;
        assert_eq!(circuit.state(), CircuitState::Closed);
    }

    #[test]
    fn test_rolling_window_eviction() {
        let mut window = RollingWindow::new(3);
        window.record(false);
        window.record(false);
        window.record(true);
        assert_eq!(window.len(), 3);
        assert!((window.failure_ratio() - 2.0 / 3.0).abs() < f64::EPSILON);

        // Oldest failure evicted; ratio drops
        window.record(true);
        assert_eq!(window.len(), 3);
        assert!((window.failure_ratio() - 1.0 / 3.0).abs() < f64::EPSILON);
    }
}
