use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::core::error::Result;
use crate::features::auth::guards::RequireAdmin;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::points::dtos::{LeaderboardEntryDto, LeaderboardQuery, PointsTotalDto};
use crate::features::points::services::PointsLedger;
use crate::shared::types::ApiResponse;

/// State for points handlers
#[derive(Clone)]
pub struct PointsState {
    pub ledger: Arc<dyn PointsLedger>,
}

/// Get the authenticated user's points total
#[utoipa::path(
    get,
    path = "/api/points/me",
    responses(
        (status = 200, description = "Current points total", body = ApiResponse<PointsTotalDto>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "points"
)]
pub async fn get_my_points(
    user: AuthenticatedUser,
    State(state): State<PointsState>,
) -> Result<Json<ApiResponse<PointsTotalDto>>> {
    let points_total = state.ledger.points_total(&user.sub).await?;
    let dto = PointsTotalDto {
        user_id: user.sub,
        points_total,
    };
    Ok(Json(ApiResponse::success(Some(dto), None, None)))
}

/// Top users by points
#[utoipa::path(
    get,
    path = "/api/points/leaderboard",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Leaderboard", body = ApiResponse<Vec<LeaderboardEntryDto>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "points"
)]
pub async fn get_leaderboard(
    State(state): State<PointsState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<ApiResponse<Vec<LeaderboardEntryDto>>>> {
    let entries = state.ledger.leaderboard(query.limit()).await?;
    Ok(Json(ApiResponse::success(
        Some(LeaderboardEntryDto::ranked(entries)),
        None,
        None,
    )))
}

/// Rebuild a user's total from their reports (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/points/{user_id}/reconcile",
    params(
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Total reconciled", body = ApiResponse<PointsTotalDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "points"
)]
pub async fn reconcile_user_points(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<PointsState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<PointsTotalDto>>> {
    let points_total = state.ledger.reconcile(&user_id).await?;
    tracing::info!("Admin {} reconciled points for user {}", admin.sub, user_id);

    let dto = PointsTotalDto {
        user_id,
        points_total,
    };
    Ok(Json(ApiResponse::success(
        Some(dto),
        Some("Points reconciled".to_string()),
        None,
    )))
}
