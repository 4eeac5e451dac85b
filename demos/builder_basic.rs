//! Basic usage of the PersonalChef builder API
//!
//! Run with: cargo run --example builder_basic -- <image-reference>

use fridge_chef::{ChefError, PersonalChef};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let image = std::env::args()
        .nth(1)
        .ok_or("usage: builder_basic <http(s)://... or gs://bucket/object>")?;

    println!("=== Recipe only ===");
    let result = PersonalChef::builder()
        .image(&image)
        .meal_type("lunch")
        .cuisine("mexican")
        .build()
        .await?;
    println!("{}", result.recipe);

    println!("\n=== Recipe with a picture of the dish ===");
    let result = PersonalChef::builder()
        .image(&image)
        .meal_type("dessert")
        .cuisine("french")
        .illustrate(true)
        .build()
        .await?;
    println!("{}", result.recipe);
    match result.result_image {
        Some(picture) if picture.starts_with("data:") => {
            println!("\nPicture: inline image, {} bytes", picture.len())
        }
        Some(picture) => println!("\nPicture: {}", picture),
        None => println!("\nNo picture this time"),
    }

    println!("\n=== Errors are reported per stage ===");
    let result = PersonalChef::builder()
        .image("s3://bucket/fridge.jpg")
        .meal_type("dinner")
        .cuisine("thai")
        .build()
        .await;
    match result {
        Err(e @ ChefError::FetchError(_)) => println!("{} stage: {}", e.stage(), e),
        Err(e) => return Err(e.into()),
        Ok(_) => println!("unexpected success"),
    }

    Ok(())
}
