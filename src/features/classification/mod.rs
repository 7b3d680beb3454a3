//! Classifier gateway.
//!
//! Wraps the external image-classification service: re-encodes the upload,
//! calls the service with timeout and retry, and maps its free-text reply onto
//! the closed [`WasteLabel`] set. Failures degrade to `unknown` instead of
//! erroring.

pub mod clients;
pub mod models;
pub mod services;

pub use clients::{ClassifierCallError, OpenAiVisionClient, VisionClient};
pub use models::{ClassificationResult, WasteLabel};
pub use services::ClassifierGateway;
