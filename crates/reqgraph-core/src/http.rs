//! HTTP generation backend
//!
//! Posts the message sequence as JSON to an OpenAI-compatible chat
//! completions endpoint.

use crate::error::GenerationError;
use crate::generation::{GenerationRequest, GenerationService, Message};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpGenerationConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for HttpGenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            timeout_secs: 60,
        }
    }
}

/// [`GenerationService`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpGenerationService {
    client: reqwest::Client,
    config: HttpGenerationConfig,
}

impl HttpGenerationService {
    /// Build the client
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Unavailable`] if the client cannot be built.
    pub fn new(config: HttpGenerationConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Map a non-success status to the error taxonomy
fn status_error(status: StatusCode, retry_after: Option<Duration>, body: String) -> GenerationError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited { retry_after },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GenerationError::Timeout,
        s if s.is_server_error() => GenerationError::Unavailable(format!("HTTP {s}: {body}")),
        s => GenerationError::Rejected(format!("HTTP {s}: {body}")),
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    async fn invoke(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: &request.messages,
            temperature: self.config.temperature,
        };

        let mut call = self
            .client
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(&body);
        if let Some(key) = &self.config.api_key {
            call = call.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        tracing::debug!(purpose = %request.purpose, messages = request.messages.len(), "Posting generation request");
        let response = call.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else {
                GenerationError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after, text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::Unavailable("response has no choices".to_string()))
    }
}
