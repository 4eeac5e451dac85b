use log::warn;
use std::time::Duration;

use crate::config::{default_image_model_for, default_model_for, ChefConfig, ProviderConfig};
use crate::{ChefError, MealPreferences, PersonalChef, RecipeResult};

/// Model provider used for fridge analysis and recipe writing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    Google,
    OpenAI,
    Anthropic,
    Ollama,
}

impl ModelProvider {
    /// Convert to provider name string used by the factory
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProvider::Google => "google",
            ModelProvider::OpenAI => "openai",
            ModelProvider::Anthropic => "anthropic",
            ModelProvider::Ollama => "ollama",
        }
    }
}

/// Builder for configuring and running one fridge-to-recipe job
#[derive(Debug, Default)]
pub struct PersonalChefBuilder {
    image: Option<String>,
    meal_type: Option<String>,
    cuisine: Option<String>,
    provider: Option<ModelProvider>,
    api_key: Option<String>,
    model: Option<String>,
    timeout: Option<Duration>,
    illustrate: Option<bool>,
    config: Option<ChefConfig>,
}

impl PersonalChefBuilder {
    /// Set the fridge photo, an `http(s)://` URL or a `gs://bucket/object` reference
    ///
    /// # Example
    /// ```
    /// use fridge_chef::PersonalChef;
    ///
    /// let builder = PersonalChef::builder()
    ///     .image("gs://my-bucket/fridge.jpg");
    /// ```
    pub fn image(mut self, reference: impl Into<String>) -> Self {
        self.image = Some(reference.into());
        self
    }

    /// Set the kind of meal, e.g. "breakfast" or "dinner"
    pub fn meal_type(mut self, meal_type: impl Into<String>) -> Self {
        self.meal_type = Some(meal_type.into());
        self
    }

    /// Set the cooking style, e.g. "italian" or "junk food"
    pub fn cuisine(mut self, cuisine: impl Into<String>) -> Self {
        self.cuisine = Some(cuisine.into());
        self
    }

    /// Use a specific model provider instead of the configured default.
    ///
    /// This also disables the fallback chain.
    ///
    /// # Example
    /// ```
    /// use fridge_chef::{ModelProvider, PersonalChef};
    ///
    /// let builder = PersonalChef::builder()
    ///     .image("https://example.com/fridge.jpg")
    ///     .provider(ModelProvider::Anthropic);
    /// ```
    pub fn provider(mut self, provider: ModelProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the API key for the model provider
    ///
    /// This allows passing the API key directly instead of relying on
    /// environment variables or config files.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the model name for the model provider
    ///
    /// # Example
    /// ```
    /// use fridge_chef::{ModelProvider, PersonalChef};
    ///
    /// let builder = PersonalChef::builder()
    ///     .provider(ModelProvider::OpenAI)
    ///     .model("gpt-4o");
    /// ```
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set a timeout for HTTP requests (image download and model calls)
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Also generate a picture of the finished dish
    ///
    /// With `.provider()` the picture is drawn by that provider. Providers
    /// without an image model (Anthropic, Ollama) skip the picture.
    pub fn illustrate(mut self, enabled: bool) -> Self {
        self.illustrate = Some(enabled);
        self
    }

    /// Start from this configuration instead of loading `config.toml` and the environment
    pub fn config(mut self, config: ChefConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Merge the builder options into the base configuration
    fn resolve_config(&mut self) -> Result<ChefConfig, ChefError> {
        let mut config = match self.config.take() {
            Some(config) => config,
            None => ChefConfig::load()?,
        };

        if let Some(provider) = self.provider {
            config.default_provider = provider.as_str().to_string();
            config.fallback.enabled = false;
        }

        if self.api_key.is_some() || self.model.is_some() {
            let name = config.default_provider.clone();
            let model = default_model_for(&name).unwrap_or_default();
            let entry = config
                .providers
                .entry(name)
                .or_insert_with(|| ProviderConfig::new(model));
            entry.enabled = true;
            if let Some(key) = self.api_key.take() {
                entry.api_key = Some(key);
            }
            if let Some(model) = self.model.take() {
                entry.model = model;
            }
        }

        if let Some(timeout) = self.timeout {
            let secs = timeout.as_secs().max(1);
            config.timeout = secs;
            config.fetcher.timeout = secs;
        }

        if let Some(enabled) = self.illustrate {
            config.illustration.enabled = enabled;
        }

        // Draw with the chosen provider's credentials when it has an image model
        if let (Some(provider), true) = (self.provider, config.illustration.enabled) {
            let name = provider.as_str();
            match default_image_model_for(name) {
                Some(_) if config.illustration.provider == name => {}
                Some(model) => {
                    config.illustration.provider = name.to_string();
                    config.illustration.model = model.to_string();
                }
                None => {
                    warn!("{} cannot generate images, illustration disabled", name);
                    config.illustration.enabled = false;
                }
            }
        }

        config.fill_default_provider();
        Ok(config)
    }

    /// Build the pipeline and run it
    ///
    /// # Errors
    /// Returns `ChefError` if:
    /// - No image, meal type or cuisine was specified
    /// - The meal type or cuisine is empty
    /// - The configuration cannot be loaded or names no usable provider
    /// - Any pipeline stage except illustration fails
    ///
    /// # Example
    /// ```no_run
    /// # use fridge_chef::PersonalChef;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let result = PersonalChef::builder()
    ///     .image("https://example.com/fridge.jpg")
    ///     .meal_type("dinner")
    ///     .cuisine("italian")
    ///     .build()
    ///     .await?;
    /// println!("{}", result.recipe);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn build(mut self) -> Result<RecipeResult, ChefError> {
        let image = self.image.take().ok_or_else(|| {
            ChefError::BuilderError("No image specified. Use .image()".to_string())
        })?;
        let meal_type = self.meal_type.take().ok_or_else(|| {
            ChefError::BuilderError("No meal type specified. Use .meal_type()".to_string())
        })?;
        let cuisine = self.cuisine.take().ok_or_else(|| {
            ChefError::BuilderError("No cuisine specified. Use .cuisine()".to_string())
        })?;

        // Bad preferences are reported before any configuration or network work
        let prefs = MealPreferences::new(meal_type, cuisine)?;
        let config = self.resolve_config()?;

        PersonalChef::from_config(&config)?.run(&image, &prefs).await
    }
}
