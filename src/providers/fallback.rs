use crate::config::{ChefConfig, FallbackConfig};
use crate::providers::{GenerationRequest, LlmProvider, ProviderError};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Bounded retries for transient provider failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Delay before the second attempt; later attempts wait proportionally longer
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        RetryPolicy {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        RetryPolicy::new(1, Duration::ZERO)
    }

    pub fn from_config(config: &FallbackConfig) -> Self {
        RetryPolicy::new(
            config.retry_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 1;
        loop {
            debug!("{} (attempt {}/{})", label, attempt, self.attempts);

            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    warn!(
                        "{} failed (attempt {}/{}): {}",
                        label, attempt, self.attempts, e
                    );
                    // Backoff grows with each attempt
                    let delay = self.delay * attempt;
                    debug!("Waiting {:?} before retry", delay);
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from_config(&FallbackConfig::default())
    }
}

/// Tries each provider in order, retrying transient failures on each
pub struct FallbackProvider {
    providers: Vec<Arc<dyn LlmProvider>>,
    retry: RetryPolicy,
}

impl FallbackProvider {
    /// Create a new fallback provider from configuration.
    ///
    /// `create` builds a single named provider; the factory passes itself here.
    pub fn new<F>(config: &ChefConfig, create: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Result<Arc<dyn LlmProvider>, ProviderError>,
    {
        let retry = RetryPolicy::from_config(&config.fallback);

        if !config.fallback.enabled {
            // If fallback is disabled, just use the default provider
            let default_provider = create(&config.default_provider)?;
            return Ok(FallbackProvider {
                providers: vec![default_provider],
                retry,
            });
        }

        let mut providers = Vec::new();

        // Create providers in fallback order
        for provider_name in &config.fallback.order {
            if let Some(provider_config) = config.providers.get(provider_name) {
                if provider_config.enabled {
                    match create(provider_name) {
                        Ok(provider) => {
                            info!("Added '{}' to fallback chain", provider_name);
                            providers.push(provider);
                        }
                        Err(e) => {
                            warn!("Failed to initialize provider '{}': {}", provider_name, e);
                        }
                    }
                }
            } else {
                warn!(
                    "Provider '{}' in fallback order not found in configuration",
                    provider_name
                );
            }
        }

        if providers.is_empty() {
            return Err(ProviderError::Unsupported(
                "No providers available in fallback configuration".to_string(),
            ));
        }

        Ok(FallbackProvider { providers, retry })
    }

    pub fn from_providers(providers: Vec<Arc<dyn LlmProvider>>, retry: RetryPolicy) -> Self {
        FallbackProvider { providers, retry }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl LlmProvider for FallbackProvider {
    fn provider_name(&self) -> &str {
        match self.providers.as_slice() {
            [only] => only.provider_name(),
            _ => "fallback",
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let mut all_errors: Vec<String> = Vec::new();

        for provider in &self.providers {
            let label = format!("Generating with {}", provider.provider_name());
            match self.retry.run(&label, || provider.generate(request)).await {
                Ok(result) => {
                    info!("Generation succeeded using {}", provider.provider_name());
                    return Ok(result);
                }
                Err(e) if self.providers.len() == 1 => return Err(e),
                Err(e) => {
                    all_errors.push(format!("{}: {}", provider.provider_name(), e));
                }
            }
        }

        Err(ProviderError::AllFailed(all_errors.join("\n")))
    }
}
