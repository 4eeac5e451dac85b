use crate::providers::{GenerationRequest, ImageGenerator, LlmProvider, ProviderError};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Limits how many requests reach the wrapped provider at once.
///
/// The semaphore is shared by every provider built from one configuration, so
/// the limit holds across concurrent pipeline runs. The permit is held for a
/// single request only, never across retry delays.
pub struct Throttled<P: ?Sized> {
    inner: Arc<P>,
    permits: Arc<Semaphore>,
}

impl<P: ?Sized> Throttled<P> {
    pub fn new(inner: Arc<P>, permits: Arc<Semaphore>) -> Self {
        Throttled { inner, permits }
    }
}

fn closed() -> ProviderError {
    ProviderError::Unsupported("request limiter has been closed".to_string())
}

#[async_trait]
impl LlmProvider for Throttled<dyn LlmProvider> {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let _permit = self.permits.acquire().await.map_err(|_| closed())?;
        debug!(
            "Acquired request slot for {} ({} left)",
            self.inner.provider_name(),
            self.permits.available_permits()
        );
        self.inner.generate(request).await
    }
}

#[async_trait]
impl ImageGenerator for Throttled<dyn ImageGenerator> {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, ProviderError> {
        let _permit = self.permits.acquire().await.map_err(|_| closed())?;
        self.inner.generate_image(prompt).await
    }
}
