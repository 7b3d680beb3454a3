use base64::prelude::*;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use lazy_static::lazy_static;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout};

use crate::core::config::ClassifierConfig;
use crate::features::classification::clients::{ClassifierCallError, VisionClient};
use crate::features::classification::models::{ClassificationResult, WasteLabel};
use crate::shared::llm::{parse_with_fallback, LlmResponse};

lazy_static! {
    static ref LABEL_WORD_RE: Regex =
        Regex::new(r"\b(plastic|biodegradable|other|unknown)\b").unwrap();
}

/// Longest edge sent to the classifier; larger uploads are downscaled
const MAX_TRANSPORT_EDGE: u32 = 1024;

/// Every upload is re-encoded to this format before transport
const TRANSPORT_MIME_TYPE: &str = "image/jpeg";

fn default_true() -> bool {
    true
}

/// Structured reply requested from the classifier
#[derive(Debug, Clone, Deserialize, Default, JsonSchema)]
#[schemars(title = "WasteClassification")]
pub struct ClassifierReply {
    #[schemars(description = "One of: plastic, biodegradable, other, unknown")]
    pub label: String,

    #[serde(default = "default_true")]
    #[schemars(skip)]
    pub is_parsed: bool,

    #[serde(default)]
    #[schemars(skip)]
    pub parse_error: Option<String>,
}

impl LlmResponse for ClassifierReply {
    fn mark_as_fallback(&mut self, error_message: String) {
        self.is_parsed = false;
        self.parse_error = Some(error_message);
    }

    fn is_success(&self) -> bool {
        self.is_parsed
    }
}

/// Gateway to the external image classifier
pub struct ClassifierGateway {
    client: Arc<dyn VisionClient>,
    config: ClassifierConfig,
    instruction: String,
}

impl ClassifierGateway {
    pub fn new(client: Arc<dyn VisionClient>, config: ClassifierConfig) -> Self {
        let instruction = format!(
            "You sort photographed waste for a municipal recycling program. \
             Look at the main waste item in the photo and classify it as exactly one of: \
             plastic, biodegradable, other. If the photo shows no waste or you cannot tell, \
             answer unknown. Reply only with JSON matching this schema:\n{}",
            ClassifierReply::json_schema_string()
        );

        Self {
            client,
            config,
            instruction,
        }
    }

    /// Classify an uploaded image.
    ///
    /// Never fails: when the image cannot be encoded or every attempt fails,
    /// the result is `unknown` with `failure_reason` set.
    pub async fn classify(&self, image: &[u8], mime_type: &str) -> ClassificationResult {
        let encoded = match Self::encode_for_transport(image.to_vec(), mime_type.to_string()).await
        {
            Ok(encoded) => encoded,
            Err(reason) => return ClassificationResult::degraded(reason, 0),
        };

        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let remaining = self.config.max_total_wait.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return ClassificationResult::degraded(
                    "classifier wait budget exhausted",
                    attempt - 1,
                );
            }
            let attempt_timeout = self.config.request_timeout.min(remaining);

            let outcome = timeout(
                attempt_timeout,
                self.client
                    .describe(&encoded, TRANSPORT_MIME_TYPE, &self.instruction),
            )
            .await;

            let error = match outcome {
                Ok(Ok(text)) => {
                    let label = Self::parse_label(&text);
                    tracing::debug!(attempt, label = %label, "Classifier replied");
                    return ClassificationResult::from_label(label, text, attempt);
                }
                Ok(Err(e)) => e,
                Err(_) => ClassifierCallError::Timeout(attempt_timeout),
            };

            tracing::warn!(attempt, error = %error, "Classifier attempt failed");

            if !error.is_retryable() || attempt >= self.config.max_attempts {
                return ClassificationResult::degraded(error.to_string(), attempt);
            }

            let backoff = self.config.backoff_for(attempt);
            if started.elapsed() + backoff >= self.config.max_total_wait {
                return ClassificationResult::degraded(
                    format!("{} (no time left to retry)", error),
                    attempt,
                );
            }
            sleep(backoff).await;
        }
    }

    /// Decode the upload and re-encode it as base64 JPEG.
    ///
    /// Works on a copy; the caller's bytes are left untouched.
    async fn encode_for_transport(image: Vec<u8>, mime_type: String) -> Result<String, String> {
        tokio::task::spawn_blocking(move || Self::encode_blocking(&image, &mime_type))
            .await
            .map_err(|e| format!("image encoding task failed: {}", e))?
    }

    fn encode_blocking(image: &[u8], mime_type: &str) -> Result<String, String> {
        let decoded = match ImageFormat::from_mime_type(mime_type) {
            Some(format) => image::load_from_memory_with_format(image, format)
                .or_else(|_| image::load_from_memory(image)),
            None => image::load_from_memory(image),
        }
        .map_err(|e| format!("image could not be decoded: {}", e))?;

        let resized = if decoded.width() > MAX_TRANSPORT_EDGE || decoded.height() > MAX_TRANSPORT_EDGE
        {
            decoded.resize(MAX_TRANSPORT_EDGE, MAX_TRANSPORT_EDGE, FilterType::Triangle)
        } else {
            decoded
        };

        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
        let mut jpeg = Cursor::new(Vec::new());
        rgb.write_to(&mut jpeg, ImageFormat::Jpeg)
            .map_err(|e| format!("image could not be re-encoded: {}", e))?;

        Ok(BASE64_STANDARD.encode(jpeg.into_inner()))
    }

    /// Map classifier text onto the closed label set.
    ///
    /// Structured JSON is preferred; otherwise the text must mention exactly
    /// one label word. Anything else is `unknown`.
    pub fn parse_label(text: &str) -> WasteLabel {
        let reply = parse_with_fallback::<ClassifierReply>(text);
        if reply.is_success() {
            return WasteLabel::normalize(&reply.label);
        }

        let lowered = text.to_lowercase();
        let mentioned: HashSet<WasteLabel> = LABEL_WORD_RE
            .find_iter(&lowered)
            .map(|m| WasteLabel::normalize(m.as_str()))
            .collect();

        match mentioned.into_iter().collect::<Vec<_>>().as_slice() {
            [single] => *single,
            _ => WasteLabel::Unknown,
        }
    }
}
