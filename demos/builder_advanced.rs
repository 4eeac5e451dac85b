//! Advanced builder API usage
//!
//! This example demonstrates:
//! - Choosing a provider and passing its API key directly
//! - Custom timeout settings
//! - Sharing one configured pipeline between concurrent runs
//!
//! Run with: OPENAI_API_KEY=... cargo run --example builder_advanced -- <image-reference>

use fridge_chef::{load_config, MealPreferences, ModelProvider, PersonalChef};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let image = std::env::args()
        .nth(1)
        .ok_or("usage: builder_advanced <http(s)://... or gs://bucket/object>")?;

    // Example 1: OpenAI for analysis, recipe and picture
    println!("=== OpenAI with custom timeout ===");
    let api_key = std::env::var("OPENAI_API_KEY")?;
    let result = PersonalChef::builder()
        .image(&image)
        .meal_type("dinner")
        .cuisine("japanese")
        .provider(ModelProvider::OpenAI)
        .api_key(api_key)
        .model("gpt-4o")
        .timeout(Duration::from_secs(90))
        .illustrate(true)
        .build()
        .await?;
    println!("{}", result.recipe);
    if let Some(picture) = &result.result_image {
        println!("\nPicture: {}", picture);
    }

    // Example 2: one pipeline, several meals at once
    println!("\n=== Shared pipeline ===");
    let chef = Arc::new(PersonalChef::from_config(&load_config()?)?);
    let mut handles = Vec::new();
    for (meal_type, cuisine) in [("breakfast", "greek"), ("lunch", "indian"), ("dinner", "spanish")] {
        let chef = chef.clone();
        let image = image.clone();
        handles.push(tokio::spawn(async move {
            let prefs = MealPreferences::new(meal_type, cuisine)?;
            chef.run(&image, &prefs).await
        }));
    }
    for handle in handles {
        match handle.await? {
            Ok(result) => println!("---\n{}", result.recipe),
            Err(e) => println!("---\nfailed at the {} stage: {}", e.stage(), e),
        }
    }

    Ok(())
}
