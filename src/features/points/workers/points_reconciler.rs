use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::core::config::LedgerConfig;
use crate::features::points::models::{LedgerOutcome, PendingAward};
use crate::features::points::services::{LedgerError, PointsLedger};

/// Counts from one reconciliation pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub applied: usize,
    pub already_applied: usize,
    pub failed: usize,
}

/// Background worker that finishes awards the submission path could not apply
pub struct PointsReconciler {
    ledger: Arc<dyn PointsLedger>,
    config: LedgerConfig,
}

impl PointsReconciler {
    pub fn new(ledger: Arc<dyn PointsLedger>, config: LedgerConfig) -> Self {
        Self { ledger, config }
    }

    /// Run the reconciler in a background loop
    pub async fn run(&self) {
        tracing::info!(
            "Starting points reconciler (every {:?}, batch {})",
            self.config.reconcile_interval,
            self.config.reconcile_batch_size
        );

        // interval() panics on a zero period
        let mut ticker = interval(self.config.reconcile_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.run_once().await {
                Ok(summary) if summary.applied + summary.failed > 0 => {
                    tracing::info!(
                        "Points reconciliation pass: {} applied, {} already applied, {} failed",
                        summary.applied,
                        summary.already_applied,
                        summary.failed
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Points reconciliation pass failed: {}", e),
            }
        }
    }

    /// Apply one batch of outstanding awards
    pub async fn run_once(&self) -> Result<ReconcileSummary, LedgerError> {
        let pending = self
            .ledger
            .pending_awards(self.config.reconcile_batch_size)
            .await?;

        if pending.is_empty() {
            return Ok(ReconcileSummary::default());
        }

        tracing::debug!("Reconciling {} pending awards", pending.len());

        let summary = stream::iter(pending)
            .map(|award| async move {
                let result = self.ledger.apply_award(&award).await;
                (award, result)
            })
            .buffer_unordered(self.config.reconcile_concurrency)
            .fold(
                ReconcileSummary::default(),
                |mut summary, (award, result)| async move {
                    Self::record(&mut summary, &award, result);
                    summary
                },
            )
            .await;

        Ok(summary)
    }

    fn record(
        summary: &mut ReconcileSummary,
        award: &PendingAward,
        result: Result<LedgerOutcome, LedgerError>,
    ) {
        match result {
            Ok(outcome) if outcome.was_applied() => {
                summary.applied += 1;
                tracing::info!(
                    "Applied pending award of {} points from report {} to user {} (total {})",
                    award.points_awarded,
                    award.report_id,
                    award.user_id,
                    outcome.total()
                );
            }
            Ok(_) => summary.already_applied += 1,
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(
                    "Could not apply award for report {} (user {}): {}",
                    award.report_id,
                    award.user_id,
                    e
                );
            }
        }
    }
}
