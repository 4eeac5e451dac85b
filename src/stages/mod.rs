//! The three model-facing steps of the pipeline.
//!
//! Each stage owns its prompt template and its provider handle, and turns
//! provider failures into its own [`ChefError`](crate::ChefError) variant.

mod extraction;
mod illustration;
mod recipe;

pub use extraction::ExtractionStage;
pub use illustration::IllustrationStage;
pub use recipe::RecipeStage;

use std::time::Duration;

use crate::providers::{GenerationRequest, LlmProvider, ProviderError};

/// Run one generation under a hard deadline covering retries and fallbacks
pub(crate) async fn generate_within(
    provider: &dyn LlmProvider,
    request: &GenerationRequest,
    limit: Duration,
) -> Result<String, ProviderError> {
    tokio::time::timeout(limit, provider.generate(request))
        .await
        .map_err(|_| ProviderError::Timeout(limit))?
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::providers::{GenerationRequest, ImageGenerator, LlmProvider, ProviderError};

    /// Answers with queued replies in order and records every request
    #[derive(Default)]
    pub struct Scripted {
        replies: Mutex<VecDeque<Result<String, ProviderError>>>,
        pub requests: Mutex<Vec<GenerationRequest>>,
        pub prompts: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        pub fn replying(replies: Vec<Result<String, ProviderError>>) -> Self {
            Scripted {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Unsupported("no reply left".to_string())))
        }
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            self.next()
        }
    }

    #[async_trait]
    impl ImageGenerator for Scripted {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn generate_image(&self, prompt: &str) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.next()
        }
    }

    /// Never answers
    pub struct Stalled;

    #[async_trait]
    impl LlmProvider for Stalled {
        fn provider_name(&self) -> &str {
            "stalled"
        }

        async fn generate(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
            std::future::pending().await
        }
    }

    #[async_trait]
    impl ImageGenerator for Stalled {
        fn provider_name(&self) -> &str {
            "stalled"
        }

        async fn generate_image(&self, _prompt: &str) -> Result<String, ProviderError> {
            std::future::pending().await
        }
    }
}
