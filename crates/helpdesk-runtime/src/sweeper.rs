//! Lifecycle Sweeper.
//!
//! A recurring task, independent of live connections, that force-resolves
//! stale cases and purges old chat messages. Each cycle resolves first and
//! prunes second, so a stale case's transcript is still there when its
//! synthetic analysis is written.
//!
//! Auto-resolution never calls the analysis service. The synthetic result
//! records the message count and a fixed sentiment heuristic from
//! [`helpdesk_core::constants`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use helpdesk_core::constants::{
    AUTO_RESOLVED_CLASSIFICATION, STALENESS_THRESHOLD, SWEEP_INTERVAL, auto_resolved_sentiment,
    auto_resolved_summary,
};
use helpdesk_core::{CaseError, CaseStatus, ResolutionAnalysis};
use helpdesk_settings::LifecycleSettings;
use helpdesk_store::{CaseStore, StaleCase};
use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::lifecycle::CaseLifecycle;

/// Sweeper timing.
#[derive(Clone, Copy, Debug)]
pub struct SweeperConfig {
    /// Time between cycles.
    pub interval: Duration,
    /// Age after which unresolved cases resolve and messages are deleted.
    pub staleness: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: SWEEP_INTERVAL,
            staleness: STALENESS_THRESHOLD,
        }
    }
}

impl From<&LifecycleSettings> for SweeperConfig {
    fn from(settings: &LifecycleSettings) -> Self {
        Self {
            interval: settings.sweep_interval(),
            staleness: settings.staleness_threshold(),
        }
    }
}

/// What one cycle did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Stale cases found.
    pub stale: usize,
    /// Cases moved to RESOLVED.
    pub resolved: usize,
    /// Cases skipped because of an error.
    pub failed: usize,
    /// Messages deleted by retention.
    pub messages_deleted: u64,
}

/// The periodic maintenance task.
pub struct LifecycleSweeper {
    lifecycle: Arc<CaseLifecycle>,
    config: SweeperConfig,
}

/// The result the sweeper writes for a case it force-resolves.
pub fn synthetic_analysis(message_count: usize) -> ResolutionAnalysis {
    ResolutionAnalysis {
        classification: AUTO_RESOLVED_CLASSIFICATION.to_string(),
        summary: auto_resolved_summary(message_count),
        sentiment: auto_resolved_sentiment(message_count),
    }
}

impl LifecycleSweeper {
    /// Create a sweeper that resolves through `lifecycle`.
    pub fn new(lifecycle: Arc<CaseLifecycle>, config: SweeperConfig) -> Self {
        Self { lifecycle, config }
    }

    fn store(&self) -> &Arc<dyn CaseStore> {
        self.lifecycle.store()
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let staleness = chrono::Duration::from_std(self.config.staleness)
            .unwrap_or_else(|_| chrono::Duration::days(1));
        now - staleness
    }

    /// Run one cycle as of the current time.
    pub async fn run_cycle(&self) -> Result<SweepReport, CaseError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle as of `now`.
    ///
    /// Per-case failures are logged and counted; the rest of the batch and
    /// the retention step still run. Only a failure to list stale cases or
    /// to delete messages fails the cycle.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<SweepReport, CaseError> {
        let cutoff = self.cutoff(now);
        let mut report = SweepReport::default();

        let stale = self
            .store()
            .find_stale_cases(CaseStatus::UNRESOLVED, cutoff)
            .await?;
        report.stale = stale.len();

        for entry in stale {
            let case_id = entry.case.id;
            match self.auto_resolve(entry).await {
                Ok(()) => report.resolved += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(case_id, error = %e, "auto-resolve failed, skipping case");
                }
            }
        }

        report.messages_deleted = self.store().delete_messages_older_than(cutoff).await?;

        counter!("sweep_cases_resolved_total").increment(report.resolved as u64);
        counter!("sweep_messages_deleted_total").increment(report.messages_deleted);
        Ok(report)
    }

    async fn auto_resolve(&self, entry: StaleCase) -> Result<(), CaseError> {
        if entry.result.is_none() {
            let analysis = synthetic_analysis(entry.messages.len());
            let _ = self
                .store()
                .create_analysis_result(entry.case.id, analysis)
                .await?;
        }
        let _ = self.lifecycle.resolve_by_system(entry.case.id).await?;
        Ok(())
    }

    /// Run a cycle now and then every interval until `cancel` fires. A
    /// failed cycle is logged; the schedule continues.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = self.config.interval.as_secs(),
            staleness_secs = self.config.staleness.as_secs(),
            "lifecycle sweeper started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    counter!("sweep_runs_total").increment(1);
                    match self.run_cycle().await {
                        Ok(report) => info!(
                            stale = report.stale,
                            resolved = report.resolved,
                            failed = report.failed,
                            messages_deleted = report.messages_deleted,
                            "sweep complete"
                        ),
                        Err(e) => error!(error = %e, "sweep cycle failed"),
                    }
                }
                () = cancel.cancelled() => {
                    info!("lifecycle sweeper stopped");
                    return;
                }
            }
        }
    }

    /// Spawn [`run`](Self::run) on the runtime.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
