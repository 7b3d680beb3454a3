use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::core::config::ClassifierConfig;
use crate::core::error::AppError;

/// Failure of a single classifier call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierCallError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited by classifier")]
    RateLimited,

    #[error("classifier server error (HTTP {0})")]
    Server(u16),

    #[error("classifier rejected the request (HTTP {0})")]
    Rejected(u16),

    #[error("classifier returned no content")]
    EmptyResponse,
}

impl ClassifierCallError {
    /// Transport, timeout, rate-limit and 5xx failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClassifierCallError::Transport(_)
                | ClassifierCallError::Timeout(_)
                | ClassifierCallError::RateLimited
                | ClassifierCallError::Server(_)
        )
    }
}

/// Transport to an image-understanding model.
///
/// Receives a base64 image and an instruction, returns the model's free text.
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn describe(
        &self,
        image_base64: &str,
        mime_type: &str,
        instruction: &str,
    ) -> Result<String, ClassifierCallError>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Client for OpenAI-compatible chat completions endpoints with image input
pub struct OpenAiVisionClient {
    client: Client,
    api_url: String,
    api_key: String,
    model_name: String,
    request_timeout: Duration,
}

impl OpenAiVisionClient {
    pub fn new(config: &ClassifierConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent("WastewiseCore/1.0 (waste-report-classifier)")
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model_name: config.model_name.clone(),
            request_timeout: config.request_timeout,
        })
    }

    fn request_body(&self, image_base64: &str, mime_type: &str, instruction: &str) -> Value {
        json!({
            "model": self.model_name,
            "temperature": 0,
            "max_tokens": 60,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": instruction },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:{};base64,{}", mime_type, image_base64) }
                    }
                ]
            }]
        })
    }

    fn map_status(status: StatusCode) -> ClassifierCallError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            ClassifierCallError::RateLimited
        } else if status.is_server_error() {
            ClassifierCallError::Server(status.as_u16())
        } else {
            ClassifierCallError::Rejected(status.as_u16())
        }
    }

    fn first_content(response: ChatCompletionResponse) -> Result<String, ClassifierCallError> {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(ClassifierCallError::EmptyResponse)
    }
}

#[async_trait]
impl VisionClient for OpenAiVisionClient {
    async fn describe(
        &self,
        image_base64: &str,
        mime_type: &str,
        instruction: &str,
    ) -> Result<String, ClassifierCallError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(image_base64, mime_type, instruction))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierCallError::Timeout(self.request_timeout)
                } else {
                    ClassifierCallError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // Response body never leaves this client
            tracing::debug!("Classifier responded with HTTP {}", status);
            return Err(Self::map_status(status));
        }

        let parsed = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ClassifierCallError::Transport(format!("invalid response body: {}", e)))?;

        Self::first_content(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiVisionClient {
        let config = ClassifierConfig {
            api_url: "http://localhost:9/v1/chat/completions".to_string(),
            api_key: "test-key".to_string(),
            model_name: "vision-test".to_string(),
            request_timeout: Duration::from_secs(1),
            max_attempts: 1,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            max_total_wait: Duration::from_secs(1),
        };
        OpenAiVisionClient::new(&config).unwrap()
    }

    #[test]
    fn test_request_body_embeds_data_uri() {
        let body = client().request_body("QUJD", "image/jpeg", "classify");
        assert_eq!(body["model"], "vision-test");
        assert_eq!(body["messages"][0]["content"][0]["text"], "classify");
        assert_eq!(
            body["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,QUJD"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            OpenAiVisionClient::map_status(StatusCode::TOO_MANY_REQUESTS),
            ClassifierCallError::RateLimited
        );
        assert_eq!(
            OpenAiVisionClient::map_status(StatusCode::BAD_GATEWAY),
            ClassifierCallError::Server(502)
        );
        assert_eq!(
            OpenAiVisionClient::map_status(StatusCode::UNAUTHORIZED),
            ClassifierCallError::Rejected(401)
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ClassifierCallError::RateLimited.is_retryable());
        assert!(ClassifierCallError::Server(503).is_retryable());
        assert!(ClassifierCallError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!ClassifierCallError::Rejected(400).is_retryable());
        assert!(!ClassifierCallError::EmptyResponse.is_retryable());
    }

    #[test]
    fn test_first_content_trims_and_rejects_empty() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"  {\"label\":\"plastic\"}\n"}}]}"#,
        )
        .unwrap();
        assert_eq!(
            OpenAiVisionClient::first_content(response).unwrap(),
            "{\"label\":\"plastic\"}"
        );

        let empty: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"   "}}]}"#).unwrap();
        assert_eq!(
            OpenAiVisionClient::first_content(empty),
            Err(ClassifierCallError::EmptyResponse)
        );
    }
}
