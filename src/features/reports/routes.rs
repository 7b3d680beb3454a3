use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::features::reports::handlers::{self, ReportState};
use crate::features::reports::services::{ReportStore, SubmissionService};
use crate::shared::constants::MAX_IMAGE_SIZE;

/// Create routes for the reports feature
///
/// All routes require the auth middleware applied by the caller
pub fn routes(submissions: Arc<SubmissionService>, reports: Arc<dyn ReportStore>) -> Router {
    let state = ReportState {
        submissions,
        reports,
    };

    Router::new()
        .route(
            "/api/reports",
            // Image plus headroom for the text fields and multipart framing
            post(handlers::submit_report)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + 1024 * 1024))
                .get(handlers::list_reports),
        )
        .route("/api/reports/me", get(handlers::list_my_reports))
        .route("/api/reports/{id}", get(handlers::get_report))
        .route(
            "/api/reports/{id}/status",
            patch(handlers::update_report_status),
        )
        .route("/api/reports/{id}/upvote", post(handlers::upvote_report))
        .with_state(state)
}
