mod anthropic;
mod factory;
mod fallback;
mod google;
mod ollama;
mod open_ai;
mod throttle;

pub use anthropic::AnthropicProvider;
pub use factory::ProviderFactory;
pub use fallback::{FallbackProvider, RetryPolicy};
pub use google::GoogleProvider;
pub use ollama::OllamaProvider;
pub use open_ai::OpenAIProvider;
pub use throttle::Throttled;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to a model provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport-level failure (connection refused, TLS, body read, client timeout)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    /// A hard deadline elapsed before the provider answered
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The response did not have the expected shape
    #[error("Failed to extract content from {provider} response: {detail}")]
    MalformedResponse { provider: String, detail: String },

    /// No API key in configuration or environment
    #[error("{0} not found in config or environment")]
    MissingCredentials(String),

    /// Image generation finished without producing an image
    #[error("{0} returned no image")]
    NoMedia(String),

    /// The request cannot be expressed for this provider
    #[error("{0}")]
    Unsupported(String),

    /// Every provider in a fallback chain failed
    #[error("All providers failed:\n{0}")]
    AllFailed(String),
}

impl ProviderError {
    /// Whether repeating the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Timeout(_) => true,
            _ => false,
        }
    }
}

/// Shape of the output requested from the model
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    /// Free text
    Text,
    /// JSON conforming to the given schema
    Json(Value),
}

/// One model invocation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Filled-in prompt template
    pub prompt: String,
    /// Optional image as a base64 data URI
    pub image: Option<String>,
    pub output: OutputFormat,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>, temperature: f32) -> Self {
        GenerationRequest {
            prompt: prompt.into(),
            image: None,
            output: OutputFormat::Text,
            temperature,
        }
    }

    pub fn with_image(mut self, data_uri: impl Into<String>) -> Self {
        self.image = Some(data_uri.into());
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.output = OutputFormat::Json(schema);
        self
    }

    pub fn schema(&self) -> Option<&Value> {
        match &self.output {
            OutputFormat::Json(schema) => Some(schema),
            OutputFormat::Text => None,
        }
    }
}

/// Unified trait for text and vision models
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "google", "openai")
    fn provider_name(&self) -> &str;

    /// Run one generation and return the raw text the model produced
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}

/// Trait for image generation models
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn provider_name(&self) -> &str;

    /// Generate one image and return a URL or data URI pointing at it
    async fn generate_image(&self, prompt: &str) -> Result<String, ProviderError>;
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

pub(crate) fn api_key_from(
    configured: Option<&String>,
    env_var: &str,
) -> Result<String, ProviderError> {
    configured
        .cloned()
        .or_else(|| std::env::var(env_var).ok())
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ProviderError::MissingCredentials(env_var.to_string()))
}

/// Turn a non-success status into `ProviderError::Api`, otherwise parse the body
pub(crate) async fn read_json(provider: &str, response: Response) -> Result<Value, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            provider: provider.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let body: Value = response.json().await?;
    debug!("{} response: {:?}", provider, body);
    Ok(body)
}

pub(crate) fn malformed(provider: &str, body: &Value) -> ProviderError {
    ProviderError::MalformedResponse {
        provider: provider.to_string(),
        detail: serde_json::to_string(body).unwrap_or_else(|_| body.to_string()),
    }
}

pub(crate) fn image_parts(
    provider: &str,
    request: &GenerationRequest,
) -> Result<Option<(String, String)>, ProviderError> {
    match request.image.as_deref() {
        None => Ok(None),
        Some(uri) => crate::model::split_data_uri(uri)
            .map(|(media_type, data)| Some((media_type.to_string(), data.to_string())))
            .ok_or_else(|| {
                ProviderError::Unsupported(format!(
                    "{} only accepts images as base64 data URIs",
                    provider
                ))
            }),
    }
}
