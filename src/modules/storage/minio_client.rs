//! MinIO/S3-compatible image store
//!
//! Uses rust-s3 for lightweight S3 operations.

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};

use super::image_store::{generate_object_key, sha256_hex, ImageStore, StoredImage};
use crate::core::config::MinIOConfig;
use crate::core::error::AppError;

pub struct MinIOImageStore {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    public_endpoint: String,
    image_prefix: String,
}

impl MinIOImageStore {
    /// Create the store and make sure the bucket exists
    pub async fn new(config: MinIOConfig) -> Result<Self, AppError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| AppError::Internal(format!("Failed to create MinIO bucket: {}", e)))?;

        // http://endpoint/bucket rather than http://bucket.endpoint
        bucket.set_path_style();

        let store = Self {
            bucket,
            region,
            credentials,
            public_endpoint: config.public_endpoint.trim_end_matches('/').to_string(),
            image_prefix: config.image_prefix,
        };

        store.ensure_bucket_exists().await;

        info!(
            "MinIO image store initialized for endpoint: {}, bucket: {}, prefix: {}",
            config.endpoint,
            store.bucket.name(),
            store.image_prefix
        );

        Ok(store)
    }

    /// Create the bucket unless it already exists
    async fn ensure_bucket_exists(&self) {
        let created = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match created {
            Ok(_) => info!("Bucket '{}' created", self.bucket.name()),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
            }
        }
    }

    /// Public URL of an object
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_endpoint, self.bucket.name(), key)
    }
}

#[async_trait]
impl ImageStore for MinIOImageStore {
    async fn store(
        &self,
        owner: &str,
        suggested_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredImage, AppError> {
        let key = generate_object_key(&self.image_prefix, owner, suggested_name, content_type);

        let response = self
            .bucket
            .put_object_with_content_type(&key, bytes, content_type)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload image '{}': {}", key, e)))?;

        if !(200..300).contains(&response.status_code()) {
            return Err(AppError::Storage(format!(
                "Upload of '{}' returned HTTP {}",
                key,
                response.status_code()
            )));
        }

        debug!("Stored image '{}' ({} bytes)", key, bytes.len());

        Ok(StoredImage {
            url: self.url_for(&key),
            sha256: sha256_hex(bytes),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.bucket
            .delete_object(key)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete image '{}': {}", key, e)))?;

        debug!("Deleted image '{}'", key);
        Ok(())
    }
}
