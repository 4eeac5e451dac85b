//! Simple API usage with the convenience function
//!
//! Reads configuration from `config.toml` and `FRIDGE_CHEF__*` environment
//! variables, exactly like the CLI does.
//!
//! Run with: cargo run --example simple_api -- <image-reference>

use fridge_chef::cook_from_image;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let image = std::env::args()
        .nth(1)
        .ok_or("usage: simple_api <http(s)://... or gs://bucket/object>")?;

    println!("=== Dinner, italian ===");
    let result = cook_from_image(&image, "dinner", "italian").await?;
    println!("{}", result.recipe);

    println!("\n=== Same fridge, korean breakfast ===");
    let result = cook_from_image(&image, "breakfast", "korean").await?;
    println!("{}", result.recipe);

    Ok(())
}
