use crate::config::{ChefConfig, ProviderConfig};
use crate::providers::{
    AnthropicProvider, FallbackProvider, GoogleProvider, ImageGenerator, LlmProvider,
    OllamaProvider, OpenAIProvider, ProviderError, Throttled,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider instance from configuration
    pub fn create(
        provider_name: &str,
        config: &ProviderConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        // Validate that provider is enabled
        if !config.enabled {
            return Err(ProviderError::Unsupported(format!(
                "Provider '{}' is not enabled in configuration",
                provider_name
            )));
        }

        match provider_name {
            "google" => Ok(Arc::new(GoogleProvider::new(config, timeout)?)),
            "openai" => Ok(Arc::new(OpenAIProvider::new(config, timeout)?)),
            "anthropic" => Ok(Arc::new(AnthropicProvider::new(config, timeout)?)),
            "ollama" => Ok(Arc::new(OllamaProvider::new(config, timeout)?)),
            _ => Err(ProviderError::Unsupported(format!(
                "Unknown provider: {}",
                provider_name
            ))),
        }
    }

    /// Create an image generator using a provider's credentials and the given image model
    pub fn create_image_generator(
        provider_name: &str,
        config: &ProviderConfig,
        model: &str,
        timeout: Duration,
    ) -> Result<Arc<dyn ImageGenerator>, ProviderError> {
        if !config.enabled {
            return Err(ProviderError::Unsupported(format!(
                "Provider '{}' is not enabled in configuration",
                provider_name
            )));
        }

        match provider_name {
            "google" => Ok(Arc::new(GoogleProvider::new(config, timeout)?.with_model(model))),
            "openai" => Ok(Arc::new(OpenAIProvider::new(config, timeout)?.with_model(model))),
            _ => Err(ProviderError::Unsupported(format!(
                "Provider '{}' cannot generate images",
                provider_name
            ))),
        }
    }

    /// Provider used by the extraction and recipe stages: the fallback chain,
    /// each member behind the shared request limiter
    pub fn text_provider(
        config: &ChefConfig,
        permits: Arc<Semaphore>,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let fallback = FallbackProvider::new(config, |name| {
            let provider_config = config.providers.get(name).ok_or_else(|| {
                ProviderError::Unsupported(format!(
                    "Provider '{}' not found in configuration",
                    name
                ))
            })?;
            let provider = Self::create(name, provider_config, config.request_timeout())?;
            Ok(Arc::new(Throttled::new(provider, permits.clone())) as Arc<dyn LlmProvider>)
        })?;

        Ok(Arc::new(fallback))
    }

    /// Image generator for the illustration stage, `None` when illustration is disabled
    pub fn image_generator(
        config: &ChefConfig,
        permits: Arc<Semaphore>,
    ) -> Result<Option<Arc<dyn ImageGenerator>>, ProviderError> {
        let illustration = &config.illustration;
        if !illustration.enabled {
            return Ok(None);
        }

        let provider_config = config.providers.get(&illustration.provider).ok_or_else(|| {
            ProviderError::Unsupported(format!(
                "Illustration provider '{}' not found in configuration",
                illustration.provider
            ))
        })?;

        let generator = Self::create_image_generator(
            &illustration.provider,
            provider_config,
            &illustration.model,
            config.request_timeout(),
        )?;

        let throttled: Arc<dyn ImageGenerator> = Arc::new(Throttled::new(generator, permits));
        Ok(Some(throttled))
    }

    /// List all available provider names, in the order the CLI shows them
    pub fn available_providers() -> Vec<&'static str> {
        vec!["google", "openai", "anthropic", "ollama"]
    }
}
