use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct ChefConfig {
    /// Provider used for the extraction and recipe stages
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Map of provider name to provider configuration
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Fallback configuration for automatic provider switching
    #[serde(default)]
    pub fallback: FallbackConfig,
    /// Fridge analysis stage
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Recipe writing stage
    #[serde(default)]
    pub recipe: RecipeConfig,
    /// Optional picture of the finished dish
    #[serde(default)]
    pub illustration: IllustrationConfig,
    /// Image download settings
    #[serde(default)]
    pub fetcher: FetcherConfig,
    /// HTTP timeout for model requests in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Upper bound on model requests in flight across all pipeline runs
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

/// Configuration for a specific AI provider
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Whether this provider is enabled
    pub enabled: bool,
    /// Model identifier (e.g., "gemini-1.5-flash", "gpt-4o-mini")
    pub model: String,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// API key for authentication (can also be set via environment variable)
    pub api_key: Option<String>,
    /// Base URL for API endpoint (for custom or proxy endpoints)
    pub base_url: Option<String>,
}

/// Configuration for provider fallback and retry behavior
#[derive(Debug, Deserialize, Clone)]
pub struct FallbackConfig {
    /// Whether fallback is enabled
    #[serde(default)]
    pub enabled: bool,
    /// Order of providers to try (first to last)
    #[serde(default)]
    pub order: Vec<String>,
    /// Attempts per provider for transient failures
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Initial delay between retries in milliseconds (grows with each attempt)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            order: Vec::new(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Configuration for the fridge analysis stage
#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_stage_temperature")]
    pub temperature: f32,
    /// Hard limit for the whole stage in seconds
    #[serde(default = "default_extraction_timeout")]
    pub timeout: u64,
    /// How many times to ask again when the output does not match the schema.
    /// 1 means no second attempt.
    #[serde(default = "default_invalid_output_attempts")]
    pub invalid_output_attempts: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            temperature: default_stage_temperature(),
            timeout: default_extraction_timeout(),
            invalid_output_attempts: default_invalid_output_attempts(),
        }
    }
}

/// Configuration for the recipe stage
#[derive(Debug, Deserialize, Clone)]
pub struct RecipeConfig {
    #[serde(default = "default_stage_temperature")]
    pub temperature: f32,
    /// Hard limit for the whole stage in seconds
    #[serde(default = "default_recipe_timeout")]
    pub timeout: u64,
}

impl Default for RecipeConfig {
    fn default() -> Self {
        Self {
            temperature: default_stage_temperature(),
            timeout: default_recipe_timeout(),
        }
    }
}

/// Configuration for the illustration stage
#[derive(Debug, Deserialize, Clone)]
pub struct IllustrationConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Provider entry whose credentials are used for image generation
    #[serde(default = "default_illustration_provider")]
    pub provider: String,
    /// Image model identifier
    #[serde(default = "default_illustration_model")]
    pub model: String,
    /// Hard limit for the whole stage in seconds
    #[serde(default = "default_recipe_timeout")]
    pub timeout: u64,
}

impl Default for IllustrationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_illustration_provider(),
            model: default_illustration_model(),
            timeout: default_recipe_timeout(),
        }
    }
}

/// Configuration for fetching the fridge photo
#[derive(Debug, Deserialize, Clone)]
pub struct FetcherConfig {
    /// Request timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub timeout: u64,
    /// Images larger than this are rejected
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    /// Cloud Storage JSON API endpoint
    #[serde(default = "default_storage_base_url")]
    pub storage_base_url: String,
    /// OAuth access token for private buckets (falls back to GOOGLE_OAUTH_ACCESS_TOKEN)
    pub storage_access_token: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            max_image_bytes: default_max_image_bytes(),
            storage_base_url: default_storage_base_url(),
            storage_access_token: None,
        }
    }
}

impl Default for ChefConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            providers: HashMap::new(),
            fallback: FallbackConfig::default(),
            extraction: ExtractionConfig::default(),
            recipe: RecipeConfig::default(),
            illustration: IllustrationConfig::default(),
            fetcher: FetcherConfig::default(),
            timeout: default_timeout(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

// Default value functions
fn default_provider() -> String {
    "google".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_stage_temperature() -> f32 {
    0.1
}

fn default_extraction_timeout() -> u64 {
    60
}

fn default_recipe_timeout() -> u64 {
    120
}

fn default_invalid_output_attempts() -> u32 {
    1
}

fn default_illustration_provider() -> String {
    "google".to_string()
}

fn default_illustration_model() -> String {
    default_image_model_for(&default_illustration_provider())
        .unwrap_or_default()
        .to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_max_image_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_storage_base_url() -> String {
    "https://storage.googleapis.com".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_max_concurrent_requests() -> usize {
    4
}

impl ChefConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with FRIDGE_CHEF__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: FRIDGE_CHEF__PROVIDERS__GOOGLE__API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }

    /// Configuration with a single enabled provider, used by the builder
    pub fn with_provider(name: impl Into<String>, provider: ProviderConfig) -> Self {
        let name = name.into();
        let mut providers = HashMap::new();
        providers.insert(name.clone(), provider);
        Self {
            default_provider: name,
            providers,
            ..Default::default()
        }
    }

    /// Add an entry for the default provider when none is configured, so an
    /// API key in the environment is enough to get started
    pub fn fill_default_provider(&mut self) {
        if let Some(model) = default_model_for(&self.default_provider) {
            self.providers
                .entry(self.default_provider.clone())
                .or_insert_with(|| ProviderConfig::new(model));
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl ProviderConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            enabled: true,
            model: model.into(),
            max_tokens: default_max_tokens(),
            api_key: None,
            base_url: None,
        }
    }
}

/// Default model for each supported provider
pub fn default_model_for(provider: &str) -> Option<&'static str> {
    match provider {
        "google" => Some("gemini-1.5-flash"),
        "openai" => Some("gpt-4o-mini"),
        "anthropic" => Some("claude-3-5-sonnet-20241022"),
        "ollama" => Some("llava"),
        _ => None,
    }
}

/// Default image model for providers that can generate images
pub fn default_image_model_for(provider: &str) -> Option<&'static str> {
    match provider {
        "google" => Some("imagen-3.0-generate-002"),
        "openai" => Some("dall-e-3"),
        _ => None,
    }
}

/// Load configuration from file and environment variables
///
/// Configuration is loaded with the following priority (highest to lowest):
/// 1. Environment variables with FRIDGE_CHEF__ prefix
/// 2. config.toml file in current directory
/// 3. Default values
///
/// Environment variable format: FRIDGE_CHEF__PROVIDERS__GOOGLE__API_KEY
pub fn load_config() -> Result<ChefConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: FRIDGE_CHEF__PROVIDERS__GOOGLE__API_KEY
        .add_source(
            Environment::with_prefix("FRIDGE_CHEF")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut config: ChefConfig = settings.try_deserialize()?;
    config.fill_default_provider();
    Ok(config)
}
