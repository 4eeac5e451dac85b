//! The orchestrator: fetch, extract, write the recipe, optionally illustrate.

use log::{info, warn};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::ChefConfig;
use crate::fetcher::{ImageFetcher, ImageReference};
use crate::model::{MealPreferences, RecipeResult};
use crate::providers::{ProviderFactory, RetryPolicy};
use crate::stages::{ExtractionStage, IllustrationStage, RecipeStage};
use crate::ChefError;

/// Turns a fridge photo into a recipe.
///
/// Holds no per-run state, so one instance can be shared behind an `Arc` and
/// run concurrently. Dropping a `run` future cancels its in-flight requests.
pub struct PersonalChef {
    fetcher: ImageFetcher,
    extraction: ExtractionStage,
    recipe: RecipeStage,
    illustration: Option<IllustrationStage>,
}

impl PersonalChef {
    pub fn new(
        fetcher: ImageFetcher,
        extraction: ExtractionStage,
        recipe: RecipeStage,
        illustration: Option<IllustrationStage>,
    ) -> Self {
        PersonalChef {
            fetcher,
            extraction,
            recipe,
            illustration,
        }
    }

    /// Wire every stage from configuration.
    ///
    /// All model calls share one request limiter of `max_concurrent_requests`
    /// permits. An illustration setup that cannot be built is logged and
    /// skipped, since the picture never decides the outcome of a run.
    pub fn from_config(config: &ChefConfig) -> Result<Self, ChefError> {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_requests.max(1)));

        let text_provider = ProviderFactory::text_provider(config, permits.clone())
            .map_err(|e| ChefError::BuilderError(e.to_string()))?;
        let image_generator = match ProviderFactory::image_generator(config, permits) {
            Ok(generator) => generator,
            Err(e) => {
                warn!("Illustration disabled: {}", e);
                None
            }
        };

        let illustration = image_generator.map(|generator| {
            IllustrationStage::new(generator, &config.illustration)
                .with_retry(RetryPolicy::from_config(&config.fallback))
        });

        Ok(PersonalChef::new(
            ImageFetcher::new(&config.fetcher)?,
            ExtractionStage::new(text_provider.clone(), &config.extraction),
            RecipeStage::new(text_provider, &config.recipe),
            illustration,
        ))
    }

    pub fn builder() -> crate::builder::PersonalChefBuilder {
        crate::builder::PersonalChefBuilder::default()
    }

    pub fn illustrates(&self) -> bool {
        self.illustration.is_some()
    }

    /// Run the whole pipeline for one photo.
    ///
    /// Stages run strictly in order and the first failure aborts the run,
    /// except illustration, whose failure only leaves `result_image` unset.
    pub async fn run(
        &self,
        image_reference: &str,
        prefs: &MealPreferences,
    ) -> Result<RecipeResult, ChefError> {
        let prefs = MealPreferences::new(prefs.meal_type.as_str(), prefs.cuisine.as_str())?;
        let reference = ImageReference::parse(image_reference)?;

        let result = self.run_stages(&reference, &prefs).await;
        if let Err(e) = &result {
            warn!("Run for {} failed at the {} stage: {}", reference, e.stage(), e);
        }
        result
    }

    async fn run_stages(
        &self,
        reference: &ImageReference,
        prefs: &MealPreferences,
    ) -> Result<RecipeResult, ChefError> {
        info!("Fetching {}", reference);
        let image = self.fetcher.fetch(reference).await?;

        let contents = self.extraction.extract(&image.data_uri()).await?;
        let recipe = self.recipe.generate_recipe(&contents, prefs).await?;

        let result_image = match &self.illustration {
            Some(stage) => stage.illustrate(&recipe).await,
            None => None,
        };

        info!(
            "Recipe ready ({} chars, illustrated: {})",
            recipe.len(),
            result_image.is_some()
        );
        Ok(RecipeResult {
            recipe,
            result_image,
        })
    }
}
