//! # Delay Scheduler
//!
//! Runs actions after a delay, with cooperative cancellation. Scheduled
//! retries must not survive shutdown: a cancelled action never runs, so a
//! stopping process cannot resurrect events into a dead queue. Ordering
//! across independently scheduled actions is not guaranteed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Spawns delayed actions that are cancelled when `shutdown` is called
#[derive(Debug, Clone)]
pub struct DelayScheduler {
    shutdown_tx: Arc<watch::Sender<bool>>,
    pending: Arc<AtomicUsize>,
}

impl DelayScheduler {
    /// Create a scheduler with its own shutdown signal
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Schedule `action` to run after `delay`. Returns `false` when the
    /// scheduler is already shut down and nothing was scheduled.
    pub fn schedule<F>(&self, delay: Duration, action: F) -> bool
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if *self.shutdown_tx.borrow() {
            debug!("Scheduler is shut down, dropping action");
            return false;
        }

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let pending = self.pending.clone();
        pending.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    action.await;
                }
                _ = shutdown_rx.changed() => {
                    debug!(delay_ms = delay.as_millis() as u64, "Scheduled action cancelled by shutdown");
                }
            }
            pending.fetch_sub(1, Ordering::SeqCst);
        });

        true
    }

    /// Number of actions still waiting on their delay
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Cancel all pending actions and refuse new ones
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Default for DelayScheduler {
    fn default() -> Self {
        Self::new()
    }
}
