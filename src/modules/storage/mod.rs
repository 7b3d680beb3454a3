//! Storage module for report images
//!
//! The [`ImageStore`] trait is what the submission pipeline depends on;
//! [`MinIOImageStore`] backs it with a MinIO/S3-compatible bucket.

mod image_store;
mod minio_client;

pub use image_store::{generate_object_key, sha256_hex, ImageStore, StoredImage};
pub use minio_client::MinIOImageStore;
