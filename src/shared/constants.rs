/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Moderator role - can move reports through the status lifecycle
pub const ROLE_MODERATOR: &str = "moderator";

/// Admin role - moderator rights plus points reconciliation
pub const ROLE_ADMIN: &str = "admin";

// =============================================================================
// SUBMISSIONS
// =============================================================================

/// Image MIME types accepted for report submissions
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Maximum image size in bytes (10MB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Category used when the submitter leaves the tag empty
pub const DEFAULT_CATEGORY: &str = "general";

/// Leaderboard size limits
pub const DEFAULT_LEADERBOARD_SIZE: i64 = 10;
pub const MAX_LEADERBOARD_SIZE: i64 = 100;

/// Check if a MIME type is accepted for report images
pub fn is_image_type_allowed(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&content_type)
}

/// Get file extension from an image content type
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}
