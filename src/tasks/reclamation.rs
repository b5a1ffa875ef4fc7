//! Reclamation Task
//!
//! Background task that periodically sweeps expired items, enforces
//! namespace size limits and persists the cache.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::CacheManager;

// == Sweep Report ==
/// Outcome of one reclamation sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    /// Items removed because their TTL passed
    pub expired: usize,
    /// Items removed to satisfy `max_items`
    pub evicted: usize,
    /// Namespaces written to disk (persistent mode only)
    pub persisted_namespaces: usize,
    pub duration: Duration,
}

// == Reclamation Handle ==
/// Owns the running task and its stop channel.
#[derive(Debug)]
pub struct ReclamationHandle {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ReclamationHandle {
    /// Signals the task to stop and waits for it to exit.
    pub async fn stop(self) {
        if self.stop_tx.send(true).is_err() {
            debug!("Reclamation task already exited before stop");
        }
        if let Err(err) = self.handle.await {
            warn!(error = %err, "Reclamation task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawns the background sweep loop for `cache`.
///
/// The task sleeps `interval` between sweeps and exits when stopped through
/// the returned handle, when the cache is disabled, or once every
/// `CacheManager` clone has been dropped. A panicking sweep is logged and
/// the loop carries on.
///
/// # Example
/// ```ignore
/// let handle = spawn_reclamation_task(&cache, Duration::from_secs(60));
/// // Later, during shutdown:
/// handle.stop().await;
/// ```
pub fn spawn_reclamation_task(cache: &CacheManager, interval: Duration) -> ReclamationHandle {
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let weak = cache.downgrade();

    let handle = tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs_f64(),
            "Starting cache reclamation task"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = stop_rx.changed() => break,
            }

            let Some(cache) = CacheManager::from_weak(&weak) else {
                break;
            };
            if !cache.is_enabled() {
                break;
            }

            // Run on its own task so a panic stays inside this sweep
            match tokio::spawn(async move { cache.reclaim().await }).await {
                Ok(report) if report.expired + report.evicted > 0 => {
                    info!(
                        expired = report.expired,
                        evicted = report.evicted,
                        duration_ms = report.duration.as_millis() as u64,
                        "Reclamation sweep removed items"
                    );
                }
                Ok(report) => {
                    debug!(
                        duration_ms = report.duration.as_millis() as u64,
                        "Reclamation sweep found nothing to remove"
                    );
                }
                Err(err) => {
                    error!(error = %err, "Reclamation sweep failed");
                }
            }
        }

        info!("Cache reclamation task stopped");
    });

    ReclamationHandle { stop_tx, handle }
}
