//! Text-completion client.
//!
//! [`CompletionClient`] is the seam between the evaluators and the model
//! backend. [`OllamaClient`] implements it against Ollama's
//! `/api/generate` endpoint; one instance (and its connection pool) is
//! shared by every evaluator in a run.

use crate::config::OllamaConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// One completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// Transport-level failure of a completion call.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Cannot connect to Ollama at {0}")]
    Connect(String),

    #[error("Ollama API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse Ollama response: {0}")]
    Decode(String),

    #[error("Failed to send request: {0}")]
    Request(String),
}

/// Something that turns a prompt into model text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// Ollama generate API request.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama generate API response.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl<'a> From<&'a CompletionRequest> for GenerateRequest<'a> {
    fn from(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            prompt: &request.prompt,
            system: request
                .system_prompt
                .as_deref()
                .filter(|s| !s.trim().is_empty()),
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

/// Ollama tags API response.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// A model installed on the Ollama server.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub details: Option<ModelDetails>,
}

impl ModelInfo {
    /// Whether this installed model answers to `model` (an untagged name means `:latest`).
    pub fn matches(&self, model: &str) -> bool {
        self.name == model
            || (!model.contains(':') && self.name.strip_suffix(":latest") == Some(model))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelDetails {
    #[serde(default)]
    pub parameter_size: Option<String>,
}

/// Client for a local or remote Ollama server.
pub struct OllamaClient {
    base_url: String,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> Result<Self, CompletionError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_seconds: config.timeout_seconds,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List the models available on the server (also serves as a connection test).
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, CompletionError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let response = Self::check_status(response).await?;
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Decode(e.to_string()))?;

        Ok(tags.models)
    }

    fn map_send_error(&self, e: reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout(self.timeout_seconds)
        } else if e.is_connect() {
            CompletionError::Connect(self.base_url.clone())
        } else {
            CompletionError::Request(e.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CompletionError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(CompletionError::Status { status, body })
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let url = format!("{}/api/generate", self.base_url);
        let payload = GenerateRequest::from(request);

        debug!(
            model = %request.model,
            prompt_len = request.prompt.len(),
            "Sending generate request"
        );

        let response = self
            .http_client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let response = Self::check_status(response).await?;
        let generated: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout(self.timeout_seconds)
            } else {
                CompletionError::Decode(e.to_string())
            }
        })?;

        debug!(
            model = %request.model,
            response_len = generated.response.len(),
            "Received generate response"
        );

        Ok(generated.response)
    }
}
