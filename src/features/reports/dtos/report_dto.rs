use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::features::classification::models::WasteLabel;
use crate::features::reports::models::{Report, ReportStatus};
use crate::features::reports::services::SubmissionOutcome;

/// Response DTO for report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportResponseDto {
    pub id: Uuid,
    pub user_id: String,
    pub username: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub image_url: String,
    pub waste_label: WasteLabel,
    pub annotation: Option<String>,
    pub points_awarded: i32,
    pub status: ReportStatus,
    pub votes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Report> for ReportResponseDto {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            username: r.username,
            title: r.title,
            description: r.description,
            location: r.location,
            category: r.category,
            image_url: r.image_url,
            waste_label: r.waste_label,
            annotation: r.annotation,
            points_awarded: r.points_awarded,
            status: r.status,
            votes: r.votes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Classification detail returned with a new report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassificationDto {
    pub label: WasteLabel,
    pub annotation: Option<String>,
    pub points: u32,
    /// True when the classifier could not be reached and the label fell back to `unknown`
    pub degraded: bool,
}

/// Response for a submitted report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitReportResponseDto {
    pub report: ReportResponseDto,
    pub classification: ClassificationDto,
    /// Submitter's points total, absent while the award is still being applied
    pub points_total: Option<i64>,
    pub points_pending: bool,
}

impl From<SubmissionOutcome> for SubmitReportResponseDto {
    fn from(outcome: SubmissionOutcome) -> Self {
        let classification = ClassificationDto {
            label: outcome.classification.label,
            annotation: outcome.classification.annotation.clone(),
            points: outcome.points_awarded.value(),
            degraded: outcome.classification.is_degraded(),
        };

        Self {
            points_pending: outcome.points_total.is_none(),
            points_total: outcome.points_total,
            report: outcome.report.into(),
            classification,
        }
    }
}

/// Multipart form for report submission (documentation only)
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct SubmitReportDto {
    /// Photo of the waste (jpeg, png or webp, up to 10 MB)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: String,
    #[schema(example = "Plastic bottles dumped by the river")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "Jl. Kaliurang km 5, Sleman")]
    pub location: String,
    #[schema(example = "riverbank")]
    pub category: Option<String>,
}

/// DTO for moderation status updates
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateReportStatusDto {
    pub status: ReportStatus,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListReportsQuery {
    /// Only reports in this status
    pub status: Option<ReportStatus>,
}
