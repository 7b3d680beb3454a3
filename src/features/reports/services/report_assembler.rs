use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::classification::models::ClassificationResult;
use crate::features::points::PointAward;
use crate::features::reports::models::{NewReport, ReportStatus, SubmissionRequest};
use crate::modules::storage::StoredImage;
use crate::shared::constants::DEFAULT_CATEGORY;

/// Builds persist-ready reports. New reports always start `pending`.
pub struct ReportAssembler;

impl ReportAssembler {
    pub fn assemble(
        request: &SubmissionRequest,
        classification: &ClassificationResult,
        award: PointAward,
        image: &StoredImage,
    ) -> Result<NewReport> {
        let user_id = Self::required("user id", &request.user_id)?;
        let title = Self::required("title", &request.title)?;
        let location = Self::required("location", &request.location)?;
        let image_key = Self::required("stored image reference", &image.key)?;

        let username = match request.username.trim() {
            "" => user_id.clone(),
            name => name.to_string(),
        };
        let category = match request.category.trim() {
            "" => DEFAULT_CATEGORY.to_string(),
            c => c.to_lowercase(),
        };

        Ok(NewReport {
            id: Uuid::now_v7(),
            user_id,
            username,
            title,
            description: request.description.trim().to_string(),
            location,
            category,
            image_key,
            image_url: image.url.clone(),
            image_sha256: image.sha256.clone(),
            waste_label: classification.label,
            annotation: classification.annotation.clone(),
            classifier_raw: classification.raw_text.clone(),
            points_awarded: award.as_i32(),
            status: ReportStatus::Pending,
        })
    }

    fn required(field: &str, value: &str) -> Result<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(format!("{} is required", field)));
        }
        Ok(trimmed.to_string())
    }
}
