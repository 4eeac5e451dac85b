use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

use super::generate_within;
use crate::config::RecipeConfig;
use crate::model::{FridgeContents, MealPreferences};
use crate::prompt::{ingredient_bullets, PromptTemplate};
use crate::providers::{GenerationRequest, LlmProvider};
use crate::schema::RecipeRequest;
use crate::ChefError;

/// Writes a recipe from the recognized ingredients
pub struct RecipeStage {
    provider: Arc<dyn LlmProvider>,
    template: PromptTemplate,
    temperature: f32,
    timeout: Duration,
}

impl RecipeStage {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &RecipeConfig) -> Self {
        RecipeStage {
            provider,
            template: PromptTemplate::generate_recipe(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Fill in the prompt for a request; every item becomes one bullet
    pub fn render_prompt(&self, request: &RecipeRequest) -> Result<String, ChefError> {
        let ingredients = ingredient_bullets(&request.fridge_contents);
        self.template
            .render(&[
                ("meal_type", request.meal_type.as_str()),
                ("cuisine", request.cuisine.as_str()),
                ("ingredients", ingredients.as_str()),
            ])
            .map_err(|e| ChefError::GenerationError(e.to_string()))
    }

    pub async fn generate_recipe(
        &self,
        contents: &FridgeContents,
        prefs: &MealPreferences,
    ) -> Result<String, ChefError> {
        let request = RecipeRequest::new(contents.clone(), prefs)
            .map_err(|e| ChefError::InvalidInput(e.to_string()))?;
        let prompt = self.render_prompt(&request)?;
        debug!("Recipe prompt:\n{}", prompt);

        info!(
            "Generating {} recipe ({}) with {}",
            request.meal_type,
            request.cuisine,
            self.provider.provider_name()
        );
        let generation = GenerationRequest::text(prompt, self.temperature);
        let recipe = generate_within(self.provider.as_ref(), &generation, self.timeout)
            .await
            .map_err(|e| ChefError::GenerationError(e.to_string()))?;

        let recipe = recipe.trim();
        if recipe.is_empty() {
            return Err(ChefError::GenerationError(
                "model returned an empty recipe".to_string(),
            ));
        }

        Ok(recipe.to_string())
    }
}
