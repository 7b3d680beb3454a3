use async_trait::async_trait;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::error::AppError;
use crate::shared::constants::extension_for_content_type;

/// Longest filename stem kept in an object key
const MAX_STEM_LEN: usize = 48;

/// Reference to a durably stored image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub key: String,
    pub url: String,
    /// Hex SHA-256 of the stored bytes
    pub sha256: String,
}

/// Durable storage for uploaded report images
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store the bytes under a freshly generated key.
    ///
    /// Keys are unique even for identical filenames uploaded concurrently.
    async fn store(
        &self,
        owner: &str,
        suggested_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredImage, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Build `{prefix}/{owner}/{uuid-v7}-{stem}.{ext}`.
///
/// Owner and stem are reduced to `[a-z0-9_-]`; the UUID makes the key unique.
pub fn generate_object_key(
    prefix: &str,
    owner: &str,
    suggested_name: &str,
    content_type: &str,
) -> String {
    let stem = suggested_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(suggested_name);
    let stem = sanitize_segment(stem, MAX_STEM_LEN);
    let owner = sanitize_segment(owner, 64);
    let ext = extension_for_content_type(content_type).unwrap_or("bin");

    let owner = if owner.is_empty() { "anonymous".to_string() } else { owner };
    let name = if stem.is_empty() {
        format!("{}.{}", Uuid::now_v7(), ext)
    } else {
        format!("{}-{}.{}", Uuid::now_v7(), stem, ext)
    };

    format!("{}/{}/{}", prefix.trim_matches('/'), owner, name)
}

fn sanitize_segment(raw: &str, max_len: usize) -> String {
    raw.chars()
        .map(|c| c.to_ascii_lowercase())
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(max_len)
        .collect()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_layout() {
        let key = generate_object_key("reports/", "User 42", "My Bottle.PNG", "image/png");
        assert!(key.starts_with("reports/user-42/"));
        assert!(key.ends_with("-my-bottle.png"));
    }

    #[test]
    fn test_key_strips_path_traversal() {
        let key = generate_object_key("reports", "../../etc", "../passwd.jpg", "image/jpeg");
        assert!(!key.contains(".."));
        assert_eq!(key.matches('/').count(), 2);
    }

    #[test]
    fn test_identical_names_get_distinct_keys() {
        let keys: HashSet<String> = (0..500)
            .map(|_| generate_object_key("reports", "alice", "photo.jpg", "image/jpeg"))
            .collect();
        assert_eq!(keys.len(), 500);
    }

    #[test]
    fn test_unnamed_upload() {
        let key = generate_object_key("reports", "", "", "image/webp");
        assert!(key.starts_with("reports/anonymous/"));
        assert!(key.ends_with(".webp"));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
