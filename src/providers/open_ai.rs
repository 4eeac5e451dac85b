use crate::config::ProviderConfig;
use crate::providers::{
    api_key_from, build_client, malformed, read_json, GenerationRequest, ImageGenerator,
    LlmProvider, ProviderError,
};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const NAME: &str = "openai";

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider from configuration
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, ProviderError> {
        // Try config first, then fall back to environment variable
        let api_key = api_key_from(config.api_key.as_ref(), "OPENAI_API_KEY")?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(OpenAIProvider {
            client: build_client(timeout)?,
            api_key,
            base_url,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        OpenAIProvider {
            client: Client::new(),
            api_key,
            base_url,
            model,
            max_tokens: 2000,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        let content = match &request.image {
            // The chat API fetches remote URLs itself and accepts data URIs as-is
            Some(image) => json!([
                {"type": "text", "text": request.prompt},
                {"type": "image_url", "image_url": {"url": image}}
            ]),
            None => json!(request.prompt),
        };

        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": content}
            ],
            "temperature": request.temperature,
            "max_tokens": self.max_tokens
        });

        if let Some(schema) = request.schema() {
            // Structured outputs need an object at the root
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "fridge_contents",
                    "schema": {
                        "type": "object",
                        "properties": {"items": schema},
                        "required": ["items"]
                    }
                }
            });
        }

        body
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn provider_name(&self) -> &str {
        NAME
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        debug!(
            "Sending chat completion request to {} (image: {})",
            self.model,
            request.image.is_some()
        );

        let response = self
            .client
            .post(self.url("/v1/chat/completions"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(request))
            .send()
            .await?;

        let response_body = read_json(NAME, response).await?;
        let content = response_body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| malformed(NAME, &response_body))?
            .to_string();

        Ok(content)
    }
}

#[async_trait]
impl ImageGenerator for OpenAIProvider {
    fn provider_name(&self) -> &str {
        NAME
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, ProviderError> {
        debug!("Sending image generation request to {}", self.model);

        let response = self
            .client
            .post(self.url("/v1/images/generations"))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "n": 1
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

        let response_body: Value = response.json().await?;
        let image = &response_body["data"][0];
        if let Some(url) = image["url"].as_str().filter(|url| !url.is_empty()) {
            return Ok(url.to_string());
        }
        match image["b64_json"].as_str().filter(|data| !data.is_empty()) {
            Some(data) => Ok(format!("data:image/png;base64,{}", data)),
            None => Err(ProviderError::NoMedia(NAME.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_generate_text() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer fake_api_key")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "Write a recipe"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "choices": [{
                        "message": {
                            "content": "Frittata\n\n1. Beat the eggs"
                        }
                    }]
                }"#,
            )
            .create_async()
            .await;

        let provider = OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            server.url(),
            "gpt-4o-mini".to_string(),
        );

        let result = provider
            .generate(&GenerationRequest::text("Write a recipe", 0.1))
            .await
            .unwrap();
        assert!(result.starts_with("Frittata"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_with_image_requests_json_schema() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "messages": [{
                    "content": [
                        {"type": "text"},
                        {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
                    ]
                }],
                "response_format": {"type": "json_schema"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices": [{"message": {"content": "{\"items\": []}"}}]}"#,
            )
            .create_async()
            .await;

        let provider = OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            server.url(),
            "gpt-4o-mini".to_string(),
        );
        let request = GenerationRequest::text("List the food", 0.1)
            .with_image("data:image/png;base64,AAAA")
            .with_schema(json!({"type": "array"}));

        let result = provider.generate(&request).await.unwrap();
        assert_eq!(result, r#"{"items": []}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_api_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Invalid request"}"#)
            .create_async()
            .await;

        let provider = OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            server.url(),
            "gpt-4o-mini".to_string(),
        );

        let result = provider.generate(&GenerationRequest::text("hi", 0.1)).await;
        let err = result.unwrap_err();
        assert!(!err.is_transient());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_image_b64() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/images/generations")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": [{"b64_json": "iVBOR"}]}"#)
            .create_async()
            .await;

        let provider = OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            server.url(),
            "gpt-image-1".to_string(),
        );

        let image = provider.generate_image("Photo of a frittata").await.unwrap();
        assert_eq!(image, "data:image/png;base64,iVBOR");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_image_url() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/images/generations")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": [{"url": "https://images.example.com/1.png"}]}"#)
            .create_async()
            .await;

        let provider = OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            server.url(),
            "dall-e-3".to_string(),
        );

        let image = provider.generate_image("Photo of a frittata").await.unwrap();
        assert_eq!(image, "https://images.example.com/1.png");
    }

    #[test]
    fn test_provider_name() {
        let provider = OpenAIProvider::with_base_url(
            "fake_api_key".to_string(),
            DEFAULT_BASE_URL.to_string(),
            "gpt-4o".to_string(),
        );
        assert_eq!(LlmProvider::provider_name(&provider), "openai");
    }
}
