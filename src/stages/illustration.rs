use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::config::IllustrationConfig;
use crate::prompt::PromptTemplate;
use crate::providers::{ImageGenerator, ProviderError, RetryPolicy};
use crate::ChefError;

/// Image prompts are capped; long recipes are cut at a character boundary
const MAX_RECIPE_CHARS: usize = 1500;

/// Renders a photo of the finished dish. Failures never reach the caller.
pub struct IllustrationStage {
    generator: Arc<dyn ImageGenerator>,
    template: PromptTemplate,
    timeout: Duration,
    retry: RetryPolicy,
}

impl IllustrationStage {
    pub fn new(generator: Arc<dyn ImageGenerator>, config: &IllustrationConfig) -> Self {
        IllustrationStage {
            generator,
            template: PromptTemplate::illustrate_recipe(),
            timeout: Duration::from_secs(config.timeout),
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// URL or data URI of the generated image, `None` on any failure
    pub async fn illustrate(&self, recipe: &str) -> Option<String> {
        match self.try_illustrate(recipe).await {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    pub async fn try_illustrate(&self, recipe: &str) -> Result<String, ChefError> {
        let prompt = self
            .template
            .render(&[("recipe", truncate_chars(recipe.trim(), MAX_RECIPE_CHARS))])
            .map_err(|e| ChefError::IllustrationError(e.to_string()))?;

        info!(
            "Illustrating recipe with {}",
            self.generator.provider_name()
        );
        let generation = self.retry.run("Generating illustration", || {
            self.generator.generate_image(&prompt)
        });
        let image = tokio::time::timeout(self.timeout, generation)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))
            .and_then(|result| result)
            .map_err(|e| ChefError::IllustrationError(e.to_string()))?;

        if image.trim().is_empty() {
            return Err(ChefError::IllustrationError(format!(
                "{} returned no image",
                self.generator.provider_name()
            )));
        }

        Ok(image)
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
