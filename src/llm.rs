//! OpenAI-compatible chat completion plumbing.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

use crate::config::ApiConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            format_type: "json_object".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub response_format: ResponseFormat,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// One system instruction plus one user message, JSON object reply.
    pub fn json_object(
        model: impl Into<String>,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            response_format: ResponseFormat::json_object(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Connection failed or timed out
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx status
    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// The completion envelope itself could not be decoded
    #[error("unexpected response envelope: {0}")]
    Envelope(String),

    #[error("response had no message content")]
    Empty,
}

impl BackendError {
    /// Transport failures, rate limits and server errors are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Network(_) => true,
            BackendError::Api { status, .. } => *status == 429 || *status >= 500,
            BackendError::Envelope(_) | BackendError::Empty => false,
        }
    }
}

/// Something that can answer a chat request with the first choice's text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError>;
}

/// `POST {base_url}/chat/completions` with bearer auth.
pub struct OpenAiBackend {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(api: &ApiConfig) -> anyhow::Result<Self> {
        let http_client = Client::builder().timeout(api.timeout).build()?;
        Ok(Self {
            http_client,
            api_key: api.api_key.clone(),
            base_url: api.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let start = Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Envelope(e.to_string()))?;

        debug!(
            "Chat completion with {} took {} ms",
            request.model,
            start.elapsed().as_millis()
        );

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(BackendError::Empty)
    }
}
