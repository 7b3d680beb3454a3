use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::points::handlers::{self, PointsState};
use crate::features::points::services::PointsLedger;

/// Create routes for the points feature
///
/// All routes require the auth middleware applied by the caller
pub fn routes(ledger: Arc<dyn PointsLedger>) -> Router {
    let state = PointsState { ledger };

    Router::new()
        .route("/api/points/me", get(handlers::get_my_points))
        .route("/api/points/leaderboard", get(handlers::get_leaderboard))
        .route(
            "/api/admin/points/{user_id}/reconcile",
            post(handlers::reconcile_user_points),
        )
        .with_state(state)
}
