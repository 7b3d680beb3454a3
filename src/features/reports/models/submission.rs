use image::ImageReader;
use std::io::Cursor;
use validator::{Validate, ValidationError};

use crate::core::error::{AppError, Result};
use crate::shared::constants::{is_image_type_allowed, MAX_IMAGE_SIZE};

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

fn valid_category(value: &str) -> std::result::Result<(), ValidationError> {
    let ok = value
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == ' ');
    if !ok {
        return Err(ValidationError::new("category")
            .with_message("may only contain letters, digits, spaces, '-' and '_'".into()));
    }
    Ok(())
}

/// Raw uploaded image as received from the client
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

impl ImageUpload {
    /// Declared type allowed, size bounded and bytes fully decodable.
    ///
    /// Returns the MIME type sniffed from the bytes. Decoding is CPU bound,
    /// so async callers run this on a blocking thread.
    pub fn validate_image(&self) -> Result<&'static str> {
        if !is_image_type_allowed(&self.content_type) {
            return Err(AppError::Validation(format!(
                "Unsupported image type '{}'",
                self.content_type
            )));
        }
        if self.bytes.is_empty() {
            return Err(AppError::Validation("Image is empty".to_string()));
        }
        if self.bytes.len() > MAX_IMAGE_SIZE {
            return Err(AppError::Validation(format!(
                "Image exceeds the maximum size of {} MB",
                MAX_IMAGE_SIZE / (1024 * 1024)
            )));
        }

        let reader = ImageReader::new(Cursor::new(&self.bytes))
            .with_guessed_format()
            .map_err(|e| AppError::Validation(format!("Image could not be read: {}", e)))?;

        let sniffed = reader
            .format()
            .map(|f| f.to_mime_type())
            .filter(|mime| is_image_type_allowed(mime))
            .ok_or_else(|| AppError::Validation("Image format not recognized".to_string()))?;

        // Header-only reads accept truncated files
        let decoded = reader
            .decode()
            .map_err(|e| AppError::Validation(format!("Image could not be decoded: {}", e)))?;
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(AppError::Validation("Image has no pixels".to_string()));
        }

        Ok(sniffed)
    }
}

/// Everything needed to submit one waste report
#[derive(Debug, Clone, Validate)]
pub struct SubmissionRequest {
    #[validate(custom(function = "not_blank"), length(max = 128))]
    pub user_id: String,

    #[validate(length(max = 128))]
    pub username: String,

    #[validate(
        custom(function = "not_blank"),
        length(max = 200, message = "Title must not exceed 200 characters")
    )]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must not exceed 5000 characters"))]
    pub description: String,

    #[validate(
        custom(function = "not_blank"),
        length(max = 500, message = "Location must not exceed 500 characters")
    )]
    pub location: String,

    #[validate(
        custom(function = "valid_category"),
        length(max = 64, message = "Category must not exceed 64 characters")
    )]
    pub category: String,

    pub image: ImageUpload,
}

impl SubmissionRequest {
    /// Shape checks run before any storage or classifier call.
    ///
    /// The image's content type is replaced by the one sniffed from its bytes.
    pub fn check(&mut self) -> Result<()> {
        self.validate()?;

        let sniffed = self.image.validate_image()?;
        if sniffed != self.image.content_type {
            tracing::info!(
                "Upload {} declared {} but contains {}; storing as {}",
                self.image.file_name,
                self.image.content_type,
                sniffed,
                sniffed
            );
            self.image.content_type = sniffed.to_string();
        }

        Ok(())
    }
}
