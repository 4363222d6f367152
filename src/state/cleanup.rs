use crate::storage::{ArtifactTier, TierKind};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Periodically deletes artifacts older than a TTL from one storage tier.
///
/// Clones share the "sweep in progress" flag, so a sweep started while
/// another one for the same tier is still running is skipped.
#[derive(Clone)]
pub struct RetentionSweeper {
    tier: Arc<dyn ArtifactTier>,
    ttl: Duration,
    interval: Duration,
    in_progress: Arc<AtomicBool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    Swept(SweepReport),
    /// A previous sweep of this tier had not finished.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub tier: TierKind,
    pub examined: usize,
    pub deleted: usize,
    pub failed: usize,
    pub listing_error: Option<String>,
}

impl SweepReport {
    fn new(tier: TierKind) -> Self {
        Self {
            tier,
            examined: 0,
            deleted: 0,
            failed: 0,
            listing_error: None,
        }
    }
}

struct SweepGuard(Arc<AtomicBool>);

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RetentionSweeper {
    pub fn new(tier: Arc<dyn ArtifactTier>, ttl: Duration, interval: Duration) -> Self {
        Self {
            tier,
            ttl,
            interval,
            in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn tier(&self) -> TierKind {
        self.tier.kind()
    }

    pub async fn sweep(&self) -> SweepOutcome {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepOutcome {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!(tier = %self.tier.kind(), "Previous sweep still running, skipping");
            return SweepOutcome::Skipped;
        }
        let _guard = SweepGuard(Arc::clone(&self.in_progress));

        let mut report = SweepReport::new(self.tier.kind());

        let objects = match self.tier.list().await {
            Ok(objects) => objects,
            Err(e) => {
                warn!(tier = %report.tier, error = %e, "Failed to list artifacts");
                report.listing_error = Some(e.to_string());
                return SweepOutcome::Swept(report);
            }
        };

        report.examined = objects.len();

        for object in objects.iter().filter(|o| o.is_expired(self.ttl, now)) {
            match self.tier.delete(&object.key).await {
                Ok(()) => {
                    report.deleted += 1;
                    info!(tier = %report.tier, key = %object.key, "Deleted expired artifact");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(tier = %report.tier, key = %object.key, error = %e, "Failed to delete expired artifact");
                }
            }
        }

        info!(
            tier = %report.tier,
            examined = report.examined,
            deleted = report.deleted,
            failed = report.failed,
            "Retention sweep completed"
        );

        SweepOutcome::Swept(report)
    }

    /// Runs the sweep on its own timer until the returned handle is stopped.
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let tier = self.tier.kind();

        let task = tokio::spawn(async move {
            let mut timer = interval(self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        self.sweep().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!(tier = %self.tier.kind(), "Retention sweeper stopped");
        });

        info!(tier = %tier, "Retention sweeper started");

        SweeperHandle { shutdown_tx, task }
    }
}

pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the loop and waits for an in-flight sweep to finish.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Retention sweeper task ended abnormally");
        }
    }
}
