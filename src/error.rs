use thiserror::Error;

/// Errors that can occur while turning a fridge photo into a recipe
#[derive(Error, Debug)]
pub enum ChefError {
    /// The image could not be resolved into bytes (bad reference, network or storage failure)
    #[error("Failed to fetch image: {0}")]
    FetchError(String),

    /// The vision model failed or its output did not match the fridge contents schema
    #[error("Failed to analyse fridge contents: {0}")]
    ExtractionError(String),

    /// The recipe model failed or returned nothing
    #[error("Failed to generate recipe: {0}")]
    GenerationError(String),

    /// The image model failed or returned no media.
    ///
    /// Never returned from the pipeline itself; the illustration stage logs it
    /// and leaves the result image unset.
    #[error("Failed to illustrate recipe: {0}")]
    IllustrationError(String),

    /// Caller supplied preferences that cannot be used
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Builder or provider setup error
    #[error("Builder error: {0}")]
    BuilderError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ::config::ConfigError),
}

impl ChefError {
    /// Short stage label used in logs
    pub fn stage(&self) -> &'static str {
        match self {
            ChefError::FetchError(_) => "fetch",
            ChefError::ExtractionError(_) => "extraction",
            ChefError::GenerationError(_) => "recipe",
            ChefError::IllustrationError(_) => "illustration",
            ChefError::InvalidInput(_) => "input",
            ChefError::BuilderError(_) | ChefError::ConfigError(_) => "setup",
        }
    }
}
