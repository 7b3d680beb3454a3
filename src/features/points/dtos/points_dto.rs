use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::features::points::models::LeaderboardEntry;
use crate::shared::constants::{DEFAULT_LEADERBOARD_SIZE, MAX_LEADERBOARD_SIZE};

/// Caller's running points total
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PointsTotalDto {
    pub user_id: String,
    pub points_total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntryDto {
    /// 1-based position
    pub rank: usize,
    pub user_id: String,
    pub username: String,
    pub points_total: i64,
}

impl LeaderboardEntryDto {
    pub fn ranked(entries: Vec<LeaderboardEntry>) -> Vec<Self> {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, e)| Self {
                rank: i + 1,
                user_id: e.user_id,
                username: e.username,
                points_total: e.points_total,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct LeaderboardQuery {
    /// Number of users to return (default: 10, max: 100)
    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<i64>,
}

impl LeaderboardQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
            .clamp(1, MAX_LEADERBOARD_SIZE)
    }
}
