use crate::config::ProviderConfig;
use crate::providers::{
    build_client, image_parts, malformed, read_json, GenerationRequest, LlmProvider,
    ProviderError,
};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const NAME: &str = "ollama";

/// Local models served by Ollama, e.g. llava for vision
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OllamaProvider {
    /// Create a new Ollama provider from configuration
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(OllamaProvider {
            client: build_client(timeout)?,
            base_url,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(base_url: String, model: String) -> Self {
        OllamaProvider {
            client: Client::new(),
            base_url,
            model,
            max_tokens: 2000,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        NAME
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let mut message = json!({"role": "user", "content": request.prompt});
        if let Some((_, data)) = image_parts(NAME, request)? {
            // Native chat API takes bare base64 without the media type
            message["images"] = json!([data]);
        }

        let mut body = json!({
            "model": self.model,
            "messages": [message],
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": self.max_tokens
            }
        });
        if let Some(schema) = request.schema() {
            body["format"] = schema.clone();
        }

        debug!(
            "Sending chat request to {} (image: {})",
            self.model,
            request.image.is_some()
        );

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await?;

        let response_body: Value = read_json(NAME, response).await?;

        // Check for API error response
        if let Some(error) = response_body.get("error") {
            let error_message = error
                .as_str()
                .unwrap_or_else(|| error["message"].as_str().unwrap_or("Unknown error"));
            return Err(ProviderError::MalformedResponse {
                provider: NAME.to_string(),
                detail: error_message.to_string(),
            });
        }

        let content = response_body["message"]["content"]
            .as_str()
            .ok_or_else(|| malformed(NAME, &response_body))?
            .to_string();

        Ok(content)
    }
}
