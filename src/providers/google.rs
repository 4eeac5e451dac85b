use crate::config::ProviderConfig;
use crate::providers::{
    api_key_from, build_client, image_parts, malformed, read_json, GenerationRequest,
    ImageGenerator, LlmProvider, ProviderError,
};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const NAME: &str = "google";

/// Gemini for text and vision, Imagen for pictures
pub struct GoogleProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl GoogleProvider {
    /// Create a new Google provider from configuration
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, ProviderError> {
        // Try config first, then fall back to environment variable
        let api_key = api_key_from(config.api_key.as_ref(), "GOOGLE_API_KEY")?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(GoogleProvider {
            client: build_client(timeout)?,
            api_key,
            base_url,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        GoogleProvider {
            client: Client::new(),
            api_key,
            base_url,
            model,
            max_tokens: 2000,
        }
    }

    /// Same credentials, different model (e.g. an Imagen model for illustrations)
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.base_url.trim_end_matches('/'),
            self.model,
            method
        )
    }

    fn request_body(&self, request: &GenerationRequest) -> Result<Value, ProviderError> {
        let mut parts = vec![json!({ "text": request.prompt })];
        if let Some((mime_type, data)) = image_parts(NAME, request)? {
            parts.push(json!({
                "inline_data": {
                    "mime_type": mime_type,
                    "data": data
                }
            }));
        }

        let mut generation_config = json!({
            "temperature": request.temperature,
            "maxOutputTokens": self.max_tokens
        });
        if let Some(schema) = request.schema() {
            generation_config["responseMimeType"] = json!("application/json");
            generation_config["responseSchema"] = schema.clone();
        }

        Ok(json!({
            "contents": [{
                "role": "user",
                "parts": parts
            }],
            "generationConfig": generation_config
        }))
    }
}

#[async_trait]
impl LlmProvider for GoogleProvider {
    fn provider_name(&self) -> &str {
        NAME
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let body = self.request_body(request)?;
        debug!(
            "Sending generateContent request to {} (image: {})",
            self.model,
            request.image.is_some()
        );

        let response = self
            .client
            .post(self.endpoint("generateContent"))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let response_body = read_json(NAME, response).await?;

        if let Some(reason) = response_body["promptFeedback"]["blockReason"].as_str() {
            return Err(ProviderError::MalformedResponse {
                provider: NAME.to_string(),
                detail: format!("prompt blocked: {}", reason),
            });
        }

        // Gemini may split the answer across several parts
        let parts = response_body["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| malformed(NAME, &response_body))?;
        let text: String = parts
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect();

        Ok(text)
    }
}

#[async_trait]
impl ImageGenerator for GoogleProvider {
    fn provider_name(&self) -> &str {
        NAME
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, ProviderError> {
        debug!("Sending predict request to {}", self.model);

        let response = self
            .client
            .post(self.endpoint("predict"))
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({
                "instances": [{ "prompt": prompt }],
                "parameters": { "sampleCount": 1 }
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: NAME.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        // Don't log the body here, it carries the whole image
        let response_body: Value = response.json().await?;
        let prediction = &response_body["predictions"][0];
        let data = prediction["bytesBase64Encoded"]
            .as_str()
            .filter(|data| !data.is_empty())
            .ok_or_else(|| ProviderError::NoMedia(NAME.to_string()))?;
        let mime_type = prediction["mimeType"].as_str().unwrap_or("image/png");

        Ok(format!("data:{};base64,{}", mime_type, data))
    }
}
