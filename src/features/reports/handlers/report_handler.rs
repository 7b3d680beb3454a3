use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::debug;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::guards::RequireModerator;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::reports::dtos::{
    ListReportsQuery, ReportResponseDto, SubmitReportDto, SubmitReportResponseDto,
    UpdateReportStatusDto,
};
use crate::features::reports::models::{ImageUpload, SubmissionRequest};
use crate::features::reports::services::{ReportStore, SubmissionService};
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// State for report handlers
#[derive(Clone)]
pub struct ReportState {
    pub submissions: Arc<SubmissionService>,
    pub reports: Arc<dyn ReportStore>,
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read {} field: {}", name, e)))
}

/// Submit a waste report
///
/// Accepts multipart/form-data with:
/// - `image`: photo of the waste (required)
/// - `title`, `location` (required)
/// - `description`, `category` (optional)
#[utoipa::path(
    post,
    path = "/api/reports",
    tag = "reports",
    request_body(
        content = SubmitReportDto,
        content_type = "multipart/form-data",
        description = "Report photo with title, description, location and category",
    ),
    responses(
        (status = 201, description = "Report created and classified", body = ApiResponse<SubmitReportResponseDto>),
        (status = 400, description = "Invalid image or missing fields"),
        (status = 401, description = "Authentication required"),
        (status = 413, description = "Image too large"),
        (status = 503, description = "Report could not be stored")
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_report(
    user: AuthenticatedUser,
    State(state): State<ReportState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<SubmitReportResponseDto>>)> {
    let mut image: Option<ImageUpload> = None;
    let mut title = String::new();
    let mut description = String::new();
    let mut location = String::new();
    let mut category = String::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "image" => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    debug!("Failed to read image bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read image data: {}", e))
                })?;

                image = Some(ImageUpload {
                    bytes: bytes.to_vec(),
                    content_type,
                    file_name,
                });
            }
            "title" => title = read_text(field, "title").await?,
            "description" => description = read_text(field, "description").await?,
            "location" => location = read_text(field, "location").await?,
            "category" => category = read_text(field, "category").await?,
            _ => debug!("Ignoring unknown field: {}", field_name),
        }
    }

    let image = image.ok_or_else(|| AppError::Validation("Image is required".to_string()))?;

    let request = SubmissionRequest {
        user_id: user.sub,
        username: user.username,
        title,
        description,
        location,
        category,
        image,
    };

    let outcome = state.submissions.submit_detached(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(outcome.into()),
            Some("Report submitted".to_string()),
            None,
        )),
    ))
}

/// List the authenticated user's reports, newest first
#[utoipa::path(
    get,
    path = "/api/reports/me",
    params(PaginationQuery),
    responses(
        (status = 200, description = "User's reports", body = ApiResponse<Vec<ReportResponseDto>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn list_my_reports(
    user: AuthenticatedUser,
    State(state): State<ReportState>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<ReportResponseDto>>>> {
    let (reports, total) = state
        .reports
        .list_by_user(&user.sub, page.limit(), page.offset())
        .await?;
    let dtos: Vec<ReportResponseDto> = reports.into_iter().map(|r| r.into()).collect();
    Ok(Json(ApiResponse::success(
        Some(dtos),
        None,
        Some(Meta { total }),
    )))
}

/// List all reports, optionally by status, newest first
#[utoipa::path(
    get,
    path = "/api/reports",
    params(ListReportsQuery, PaginationQuery),
    responses(
        (status = 200, description = "Reports", body = ApiResponse<Vec<ReportResponseDto>>),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn list_reports(
    State(state): State<ReportState>,
    Query(filter): Query<ListReportsQuery>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<ReportResponseDto>>>> {
    let (reports, total) = state
        .reports
        .list(filter.status, page.limit(), page.offset())
        .await?;
    let dtos: Vec<ReportResponseDto> = reports.into_iter().map(|r| r.into()).collect();
    Ok(Json(ApiResponse::success(
        Some(dtos),
        None,
        Some(Meta { total }),
    )))
}

/// Get report by ID
#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Report found", body = ApiResponse<ReportResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Report not found")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn get_report(
    State(state): State<ReportState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReportResponseDto>>> {
    let report = state.reports.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(Some(report.into()), None, None)))
}

/// Update report status (moderator only)
#[utoipa::path(
    patch,
    path = "/api/reports/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    request_body = UpdateReportStatusDto,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<ReportResponseDto>),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Moderator access required"),
        (status = 404, description = "Report not found"),
        (status = 409, description = "Transition not allowed")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn update_report_status(
    RequireModerator(moderator): RequireModerator,
    State(state): State<ReportState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateReportStatusDto>,
) -> Result<Json<ApiResponse<ReportResponseDto>>> {
    let report = state.reports.change_status(id, dto.status).await?;
    tracing::info!(
        "Moderator {} set report {} to {}",
        moderator.sub,
        id,
        report.status
    );
    Ok(Json(ApiResponse::success(Some(report.into()), None, None)))
}

/// Upvote a report
#[utoipa::path(
    post,
    path = "/api/reports/{id}/upvote",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Vote recorded", body = ApiResponse<ReportResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Report not found")
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
pub async fn upvote_report(
    State(state): State<ReportState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReportResponseDto>>> {
    let report = state.reports.upvote(id).await?;
    Ok(Json(ApiResponse::success(Some(report.into()), None, None)))
}
