use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::features::points::models::{LeaderboardEntry, LedgerOutcome, PendingAward};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("User {0} has no points row")]
    UserMissing(String),

    #[error("Report {0} does not belong to the user or does not exist")]
    ReportMissing(Uuid),

    #[error("Points total for user {user_id} would be negative ({total})")]
    NegativeTotal { user_id: String, total: i64 },

    #[error("Points ledger unavailable: {0}")]
    Unavailable(String),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Database(e) => AppError::Database(e),
            LedgerError::UserMissing(user_id) => {
                AppError::NotFound(format!("User {} not found", user_id))
            }
            LedgerError::ReportMissing(id) => AppError::NotFound(format!("Report {} not found", id)),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Per-user running points totals.
///
/// Every write keeps the total non-negative and equal to the sum of the
/// user's applied awards.
#[async_trait]
pub trait PointsLedger: Send + Sync {
    /// Add one report's award to its owner's total, at most once per report
    async fn apply_award(&self, award: &PendingAward) -> Result<LedgerOutcome, LedgerError>;

    /// Apply every outstanding award of the user and reset the total to the
    /// sum of their reports
    async fn reconcile(&self, user_id: &str) -> Result<i64, LedgerError>;

    async fn pending_awards(&self, limit: i64) -> Result<Vec<PendingAward>, LedgerError>;

    /// Current total, zero for users without reports
    async fn points_total(&self, user_id: &str) -> Result<i64, LedgerError>;

    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, LedgerError>;
}

pub struct PgPointsLedger {
    pool: PgPool,
}

impl PgPointsLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock the user's row for the rest of the transaction.
    ///
    /// Report creation, award application and reconciliation all take this
    /// lock first, so writes for one user are serialized.
    async fn lock_user(
        tx: &mut Transaction<'_, Postgres>,
        user_id: &str,
    ) -> Result<i64, LedgerError> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT points_total FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut **tx)
                .await?;

        let total = total.ok_or_else(|| LedgerError::UserMissing(user_id.to_string()))?;
        Self::ensure_non_negative(user_id, total)
    }

    fn ensure_non_negative(user_id: &str, total: i64) -> Result<i64, LedgerError> {
        if total < 0 {
            return Err(LedgerError::NegativeTotal {
                user_id: user_id.to_string(),
                total,
            });
        }
        Ok(total)
    }
}

#[async_trait]
impl PointsLedger for PgPointsLedger {
    async fn apply_award(&self, award: &PendingAward) -> Result<LedgerOutcome, LedgerError> {
        if award.points_awarded < 0 {
            return Err(LedgerError::NegativeTotal {
                user_id: award.user_id.clone(),
                total: award.points_awarded as i64,
            });
        }

        let mut tx = self.pool.begin().await?;
        let current = Self::lock_user(&mut tx, &award.user_id).await?;

        let flipped: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE reports
            SET points_applied = TRUE
            WHERE id = $1 AND user_id = $2 AND points_applied = FALSE
            RETURNING points_awarded
            "#,
        )
        .bind(award.report_id)
        .bind(&award.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(points) = flipped else {
            let exists: Option<bool> =
                sqlx::query_scalar("SELECT points_applied FROM reports WHERE id = $1 AND user_id = $2")
                    .bind(award.report_id)
                    .bind(&award.user_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return match exists {
                Some(_) => Ok(LedgerOutcome::AlreadyApplied { total: current }),
                None => Err(LedgerError::ReportMissing(award.report_id)),
            };
        };

        let new_total: i64 = sqlx::query_scalar(
            r#"
            UPDATE users
            SET points_total = points_total + $2, updated_at = NOW()
            WHERE id = $1 AND points_total >= 0
            RETURNING points_total
            "#,
        )
        .bind(&award.user_id)
        .bind(points as i64)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LedgerError::UserMissing(award.user_id.clone()))?;

        // Rolls back on drop if the check fails
        Self::ensure_non_negative(&award.user_id, new_total)?;
        tx.commit().await?;

        tracing::debug!(
            "Applied {} points from report {} to user {} (total {})",
            points,
            award.report_id,
            award.user_id,
            new_total
        );

        Ok(LedgerOutcome::Applied { new_total })
    }

    async fn reconcile(&self, user_id: &str) -> Result<i64, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let before = Self::lock_user(&mut tx, user_id).await?;

        let flagged = sqlx::query(
            "UPDATE reports SET points_applied = TRUE WHERE user_id = $1 AND points_applied = FALSE",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let total: i64 = sqlx::query_scalar(
            r#"
            UPDATE users
            SET points_total = (
                    SELECT COALESCE(SUM(points_awarded), 0)::BIGINT
                    FROM reports
                    WHERE user_id = $1
                ),
                updated_at = NOW()
            WHERE id = $1
            RETURNING points_total
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        Self::ensure_non_negative(user_id, total)?;
        tx.commit().await?;

        if total != before || flagged > 0 {
            tracing::info!(
                "Reconciled points for user {}: {} -> {} ({} awards newly applied)",
                user_id,
                before,
                total,
                flagged
            );
        }

        Ok(total)
    }

    async fn pending_awards(&self, limit: i64) -> Result<Vec<PendingAward>, LedgerError> {
        let awards = sqlx::query_as::<_, PendingAward>(
            r#"
            SELECT id AS report_id, user_id, points_awarded
            FROM reports
            WHERE points_applied = FALSE
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(awards)
    }

    async fn points_total(&self, user_id: &str) -> Result<i64, LedgerError> {
        let total: Option<i64> = sqlx::query_scalar("SELECT points_total FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(total.unwrap_or(0))
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT id AS user_id, username, points_total
            FROM users
            ORDER BY points_total DESC, username ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
