//! Periodic rollout checking for the managed strategy.
//!
//! # States
//! ```text
//! Idle → (tick) → Checking → VersionTracker::resolve
//!     unchanged            → Idle
//!     changed              → Updating → fetch, build, commit
//!         success          → store new version → Idle
//!         failure          → log, keep version and snapshot → Idle
//!     resolve failure      → log → Idle
//! ```
//!
//! # Design Decisions
//! - The loop is the only writer after bootstrap; ticks never overlap
//! - Shutdown is checked at tick boundaries, never in the middle of an update
//! - Errors never end the loop

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::ChangeDetection;
use crate::manager::updater::SnapshotUpdater;
use crate::manager::version::{ConfigVersion, VersionTracker};
use crate::observability::metrics;

/// What a single rollout check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The resolved version matches the stored one.
    Unchanged,
    /// A new snapshot was committed for this version.
    Updated(ConfigVersion),
    /// The rollout lookup failed.
    ResolveFailed,
    /// A change was detected but the update failed; the stored version is kept.
    UpdateFailed(ConfigVersion),
}

impl TickOutcome {
    fn label(&self) -> &'static str {
        match self {
            TickOutcome::Unchanged => "unchanged",
            TickOutcome::Updated(_) => "updated",
            TickOutcome::ResolveFailed => "resolve_failed",
            TickOutcome::UpdateFailed(_) => "update_failed",
        }
    }
}

/// Background task polling the version tracker and republishing snapshots.
pub struct RefreshLoop {
    service_name: String,
    interval: Duration,
    change_detection: ChangeDetection,
    tracker: Arc<dyn VersionTracker>,
    updater: SnapshotUpdater,
    current: Arc<ArcSwap<ConfigVersion>>,
}

impl RefreshLoop {
    pub fn new(
        service_name: String,
        interval: Duration,
        change_detection: ChangeDetection,
        tracker: Arc<dyn VersionTracker>,
        updater: SnapshotUpdater,
        current: Arc<ArcSwap<ConfigVersion>>,
    ) -> Self {
        Self {
            service_name,
            interval,
            change_detection,
            tracker,
            updater,
            current,
        }
    }

    /// Run one rollout check.
    pub async fn check_once(&self) -> TickOutcome {
        tracing::debug!(service = %self.service_name, "Checking for new rollouts");
        let current = self.current.load_full();

        let outcome = match self
            .tracker
            .resolve(&self.service_name, &current.rollout_id, &current.config_id)
            .await
        {
            Err(e) => {
                tracing::error!(service = %self.service_name, error = %e, "Error occurred when checking new rollouts");
                TickOutcome::ResolveFailed
            }
            Ok(resolved) if !self.change_detection.is_change(&current, &resolved) => {
                TickOutcome::Unchanged
            }
            Ok(resolved) => {
                tracing::info!(
                    service = %self.service_name,
                    from = %current,
                    to = %resolved,
                    "New rollout detected"
                );
                match self.updater.update(&resolved.config_id).await {
                    Ok(()) => {
                        self.current.store(Arc::new(resolved.clone()));
                        TickOutcome::Updated(resolved)
                    }
                    Err(e) => {
                        tracing::error!(
                            service = %self.service_name,
                            config_id = %resolved.config_id,
                            kind = e.kind(),
                            error = %e,
                            "Failed to apply new rollout, keeping current configuration"
                        );
                        TickOutcome::UpdateFailed(resolved)
                    }
                }
            }
        };

        metrics::record_rollout_check(outcome.label());
        outcome
    }

    /// Check for rollouts every interval until shutdown is signalled.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            service = %self.service_name,
            interval_secs = self.interval.as_secs(),
            "Start checking new rollouts"
        );

        // Bootstrap rejects a zero interval; never hand one to the timer.
        let period = self.interval.max(Duration::from_millis(1));
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!(service = %self.service_name, "Rollout checker received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.check_once().await;
                }
            }
        }
    }
}
