use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::reports::models::{NewReport, Report, ReportStatus};

const REPORT_COLUMNS: &str = r#"
    id, user_id, username, title, description, location, category,
    image_key, image_url, image_sha256, waste_label, annotation, classifier_raw,
    points_awarded, points_applied, status, votes, created_at, updated_at
"#;

/// Report persistence
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Insert the report, creating or refreshing the owner's user row in the
    /// same transaction
    async fn create(&self, report: &NewReport) -> Result<Report>;

    async fn get_by_id(&self, id: Uuid) -> Result<Report>;

    /// Newest first, with the total count
    async fn list_by_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Report>, i64)>;

    /// Newest first, optionally filtered by status, with the total count
    async fn list(
        &self,
        status: Option<ReportStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Report>, i64)>;

    /// Set `next` only if the report is still in `expected`.
    ///
    /// Returns `None` when the status changed underneath.
    async fn set_status(
        &self,
        id: Uuid,
        expected: ReportStatus,
        next: ReportStatus,
    ) -> Result<Option<Report>>;

    async fn upvote(&self, id: Uuid) -> Result<Report>;

    /// Move a report along its lifecycle, rejecting invalid transitions
    async fn change_status(&self, id: Uuid, next: ReportStatus) -> Result<Report> {
        let current = self.get_by_id(id).await?;

        if !current.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Cannot move report from {} to {}",
                current.status, next
            )));
        }

        self.set_status(id, current.status, next)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!("Report {} was modified concurrently", id))
            })
    }
}

pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn create(&self, report: &NewReport) -> Result<Report> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, username)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username, updated_at = NOW()
            "#,
        )
        .bind(&report.user_id)
        .bind(&report.username)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert user {}: {:?}", report.user_id, e);
            AppError::Database(e)
        })?;

        let sql = format!(
            r#"
            INSERT INTO reports (
                id, user_id, username, title, description, location, category,
                image_key, image_url, image_sha256, waste_label, annotation, classifier_raw,
                points_awarded, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {REPORT_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, Report>(&sql)
            .bind(report.id)
            .bind(&report.user_id)
            .bind(&report.username)
            .bind(&report.title)
            .bind(&report.description)
            .bind(&report.location)
            .bind(&report.category)
            .bind(&report.image_key)
            .bind(&report.image_url)
            .bind(&report.image_sha256)
            .bind(report.waste_label)
            .bind(&report.annotation)
            .bind(&report.classifier_raw)
            .bind(report.points_awarded)
            .bind(report.status)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert report {}: {:?}", report.id, e);
                AppError::Database(e)
            })?;

        tx.commit().await?;

        tracing::info!(
            "Report created: {} by {} ({}, {} points)",
            created.id,
            created.user_id,
            created.waste_label,
            created.points_awarded
        );
        Ok(created)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Report> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1");

        sqlx::query_as::<_, Report>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Report>, i64)> {
        let sql = format!(
            r#"
            SELECT {REPORT_COLUMNS}
            FROM reports
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        );

        let reports = sqlx::query_as::<_, Report>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((reports, total))
    }

    async fn list(
        &self,
        status: Option<ReportStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Report>, i64)> {
        let sql = format!(
            r#"
            SELECT {REPORT_COLUMNS}
            FROM reports
            WHERE ($1::report_status IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        );

        let reports = sqlx::query_as::<_, Report>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reports WHERE ($1::report_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((reports, total))
    }

    async fn set_status(
        &self,
        id: Uuid,
        expected: ReportStatus,
        next: ReportStatus,
    ) -> Result<Option<Report>> {
        let sql = format!(
            r#"
            UPDATE reports
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {REPORT_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, Report>(&sql)
            .bind(id)
            .bind(expected)
            .bind(next)
            .fetch_optional(&self.pool)
            .await?;

        if updated.is_some() {
            tracing::info!("Report {} status changed {} -> {}", id, expected, next);
        }
        Ok(updated)
    }

    async fn upvote(&self, id: Uuid) -> Result<Report> {
        let sql = format!(
            r#"
            UPDATE reports
            SET votes = votes + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING {REPORT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Report>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))
    }
}
