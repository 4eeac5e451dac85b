//! Turn a photo of an open fridge into a recipe.
//!
//! A vision model lists the food it can see, a text model writes a recipe for
//! the requested meal type and cuisine, and an image model can optionally
//! picture the finished dish.
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), fridge_chef::ChefError> {
//! let result = fridge_chef::cook_from_image("gs://my-bucket/fridge.jpg", "dinner", "italian").await?;
//! println!("{}", result.recipe);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod schema;
pub mod stages;

pub use builder::{ModelProvider, PersonalChefBuilder};
pub use crate::config::{load_config, ChefConfig};
pub use error::ChefError;
pub use fetcher::{ImageFetcher, ImageReference};
pub use model::{FridgeContents, FridgeItem, InlineImage, MealPreferences, RecipeResult};
pub use pipeline::PersonalChef;
pub use prompt::PromptTemplate;
pub use schema::SchemaError;

/// Run the pipeline with configuration from `config.toml` and the environment
///
/// # Example
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let result = fridge_chef::cook_from_image(
///     "https://example.com/fridge.jpg",
///     "breakfast",
///     "korean",
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn cook_from_image(
    image_reference: &str,
    meal_type: &str,
    cuisine: &str,
) -> Result<RecipeResult, ChefError> {
    let prefs = MealPreferences::new(meal_type, cuisine)?;
    let config = load_config()?;
    PersonalChef::from_config(&config)?
        .run(image_reference, &prefs)
        .await
}
