use crate::config::ProviderConfig;
use crate::providers::{
    api_key_from, build_client, image_parts, malformed, read_json, GenerationRequest,
    LlmProvider, ProviderError,
};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const NAME: &str = "anthropic";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider from configuration
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, ProviderError> {
        // Try config first, then fall back to environment variable
        let api_key = api_key_from(config.api_key.as_ref(), "ANTHROPIC_API_KEY")?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(AnthropicProvider {
            client: build_client(timeout)?,
            api_key,
            base_url,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        AnthropicProvider {
            client: Client::new(),
            api_key,
            base_url,
            model,
            max_tokens: 2000,
        }
    }
}

/// The messages API has no schema-constrained output, so the schema goes into the prompt
fn prompt_text(request: &GenerationRequest) -> String {
    match request.schema() {
        Some(schema) => format!(
            "{}\n\nRespond with JSON only, no other text, matching this JSON schema:\n{}",
            request.prompt, schema
        ),
        None => request.prompt.clone(),
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        NAME
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let mut content = Vec::new();
        if let Some((media_type, data)) = image_parts(NAME, request)? {
            content.push(json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": media_type,
                    "data": data
                }
            }));
        }
        content.push(json!({"type": "text", "text": prompt_text(request)}));

        debug!(
            "Sending messages request to {} (image: {})",
            self.model,
            request.image.is_some()
        );

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "temperature": request.temperature,
                "messages": [
                    {
                        "role": "user",
                        "content": content
                    }
                ]
            }))
            .send()
            .await?;

        let response_body: Value = read_json(NAME, response).await?;

        // Check for API error response
        if let Some(error) = response_body.get("error") {
            let error_type = error["type"].as_str().unwrap_or("unknown");
            let error_message = error["message"].as_str().unwrap_or("Unknown error");
            return Err(ProviderError::MalformedResponse {
                provider: NAME.to_string(),
                detail: format!("{}: {}", error_type, error_message),
            });
        }

        let text = response_body["content"][0]["text"]
            .as_str()
            .ok_or_else(|| malformed(NAME, &response_body))?
            .to_string();

        Ok(text)
    }
}
