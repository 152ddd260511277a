//! Periodic snapshot scheduler.

use crate::manager::{BackupManager, SnapshotOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Spawn the background task that runs a snapshot cycle on a fixed
/// interval until `shutdown` is cancelled.
///
/// A tick that fires while a cycle is still in flight is skipped by the
/// manager's run guard, never queued. Per-cycle failures are logged and
/// absorbed; nothing here can kill the loop. Cancellation is checked at
/// each wake-up and does not force-cancel an in-flight upload.
pub fn spawn(
    manager: Arc<BackupManager>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; consume it so the first
        // snapshot happens one full interval after startup.
        ticker.tick().await;

        tracing::info!(interval_secs = interval.as_secs(), "snapshot scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("snapshot scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match manager.snapshot_now().await {
                        Ok(SnapshotOutcome::Uploaded { seq, size }) => {
                            tracing::debug!(seq, size, "periodic snapshot complete");
                        }
                        Ok(SnapshotOutcome::SkippedMissingFile)
                        | Ok(SnapshotOutcome::SkippedAlreadyRunning) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "snapshot cycle failed, will retry on next tick");
                        }
                    }
                }
            }
        }
    })
}
