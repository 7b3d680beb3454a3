use std::sync::Arc;
use tokio::time::sleep;

use crate::core::config::LedgerConfig;
use crate::core::error::{AppError, Result};
use crate::features::classification::{ClassificationResult, ClassifierGateway};
use crate::features::points::models::PendingAward;
use crate::features::points::{PointAward, PointsLedger};
use crate::features::reports::models::{NewReport, Report, SubmissionRequest};
use crate::features::reports::services::{ReportAssembler, ReportStore};
use crate::modules::storage::ImageStore;

/// Composed result of one submission
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub report: Report,
    pub classification: ClassificationResult,
    pub points_awarded: PointAward,
    /// Owner's total after the award, `None` while the award is pending
    pub points_total: Option<i64>,
}

/// Runs the submission pipeline: validate, store the image, classify, score,
/// persist the report and apply the award.
pub struct SubmissionService {
    images: Arc<dyn ImageStore>,
    classifier: Arc<ClassifierGateway>,
    reports: Arc<dyn ReportStore>,
    ledger: Arc<dyn PointsLedger>,
    config: LedgerConfig,
}

impl SubmissionService {
    pub fn new(
        images: Arc<dyn ImageStore>,
        classifier: Arc<ClassifierGateway>,
        reports: Arc<dyn ReportStore>,
        ledger: Arc<dyn PointsLedger>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            images,
            classifier,
            reports,
            ledger,
            config,
        }
    }

    /// Run `submit` on its own task so a dropped caller cannot abandon a
    /// submission half way
    pub async fn submit_detached(
        self: &Arc<Self>,
        request: SubmissionRequest,
    ) -> Result<SubmissionOutcome> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.submit(request).await })
            .await
            .map_err(|e| AppError::Internal(format!("Submission task failed: {}", e)))?
    }

    pub async fn submit(&self, request: SubmissionRequest) -> Result<SubmissionOutcome> {
        let request = tokio::task::spawn_blocking(move || {
            let mut request = request;
            request.check().map(|()| request)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Image validation task failed: {}", e)))??;

        let image = &request.image;
        let stored = self
            .images
            .store(
                &request.user_id,
                &image.file_name,
                &image.content_type,
                &image.bytes,
            )
            .await?;

        let classification = self
            .classifier
            .classify(&image.bytes, &image.content_type)
            .await;
        if let Some(reason) = &classification.failure_reason {
            tracing::warn!(
                "Classification degraded to unknown for {} after {} attempts: {}",
                stored.key,
                classification.attempts,
                reason
            );
        }

        let points_awarded = match PointAward::from_label_text(classification.label.as_str()) {
            Ok(award) => award,
            Err(e) => {
                self.discard_image(&stored.key).await;
                return Err(e.into());
            }
        };

        let new_report =
            match ReportAssembler::assemble(&request, &classification, points_awarded, &stored) {
                Ok(report) => report,
                Err(e) => {
                    self.discard_image(&stored.key).await;
                    return Err(e);
                }
            };

        let mut report = match self.reports.create(&new_report).await {
            Ok(report) => report,
            Err(e) => self.settle_failed_create(&new_report, &stored.key, e).await?,
        };

        let award = PendingAward {
            report_id: report.id,
            user_id: report.user_id.clone(),
            points_awarded: report.points_awarded,
        };
        let points_total = self.apply_award_inline(&award).await;
        report.points_applied = points_total.is_some();

        Ok(SubmissionOutcome {
            report,
            classification,
            points_awarded,
            points_total,
        })
    }

    /// Apply the award with a short retry; leaves it to the reconciler on failure
    async fn apply_award_inline(&self, award: &PendingAward) -> Option<i64> {
        let attempts = self.config.inline_attempts.max(1);

        for attempt in 1..=attempts {
            match self.ledger.apply_award(award).await {
                Ok(outcome) => return Some(outcome.total()),
                Err(e) => {
                    tracing::warn!(
                        "Applying award for report {} failed (attempt {}/{}): {}",
                        award.report_id,
                        attempt,
                        attempts,
                        e
                    );
                    if attempt < attempts {
                        sleep(self.config.inline_backoff * attempt).await;
                    }
                }
            }
        }

        tracing::warn!(
            "Award of {} points for report {} left pending for reconciliation",
            award.points_awarded,
            award.report_id
        );
        None
    }

    /// A database error from `create` may arrive after the commit landed, so
    /// the image is only deleted once the report is known to be absent.
    async fn settle_failed_create(
        &self,
        new_report: &NewReport,
        image_key: &str,
        err: AppError,
    ) -> Result<Report> {
        let db = match err {
            AppError::Database(db) => db,
            other => {
                self.discard_image(image_key).await;
                return Err(other);
            }
        };

        match self.reports.get_by_id(new_report.id).await {
            Ok(report) => {
                tracing::warn!(
                    "Report {} was committed although saving it reported: {}",
                    report.id,
                    db
                );
                Ok(report)
            }
            Err(AppError::NotFound(_)) => {
                self.discard_image(image_key).await;
                Err(AppError::Storage(format!("Report could not be saved: {}", db)))
            }
            Err(lookup) => {
                tracing::warn!(
                    "Keeping image {} since report {} may have been saved ({}; lookup: {})",
                    image_key,
                    new_report.id,
                    db,
                    lookup
                );
                Err(AppError::Storage(format!("Report could not be saved: {}", db)))
            }
        }
    }

    async fn discard_image(&self, key: &str) {
        if let Err(e) = self.images.delete(key).await {
            tracing::warn!("Could not delete orphaned image {}: {}", key, e);
        }
    }
}
