use log::error;
use std::env;
use std::process::ExitCode;

use fridge_chef::config::{default_image_model_for, default_model_for};
use fridge_chef::providers::ProviderFactory;
use fridge_chef::{load_config, ChefConfig, ChefError, MealPreferences, PersonalChef};

const USAGE: &str = "Usage: fridge-chef <image-reference> <meal-type> <cuisine> [--json]
       fridge-chef --list-providers

  image-reference  http(s):// URL or gs://bucket/object
  meal-type        e.g. breakfast, lunch, dinner
  cuisine          e.g. italian, korean, junk food

Configuration is read from ./config.toml and FRIDGE_CHEF__* environment variables.";

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let json = match args.iter().position(|arg| arg == "--json") {
        Some(index) => {
            args.remove(index);
            true
        }
        None => false,
    };

    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|arg| arg == "--list-providers") {
        return match load_config() {
            Ok(config) => {
                for line in provider_lines(&config) {
                    println!("{}", line);
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", ChefError::from(e));
                ExitCode::FAILURE
            }
        };
    }

    let [image, meal_type, cuisine] = match <[String; 3]>::try_from(args) {
        Ok(args) => args,
        Err(_) => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match run(&image, &meal_type, &cuisine, json).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{} stage failed", e.stage());
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(image: &str, meal_type: &str, cuisine: &str, json: bool) -> Result<(), ChefError> {
    let prefs = MealPreferences::new(meal_type, cuisine)?;
    let config = load_config()?;
    let result = PersonalChef::from_config(&config)?
        .run(image, &prefs)
        .await?;

    if json {
        let output = serde_json::to_string_pretty(&result)
            .map_err(|e| ChefError::GenerationError(format!("Failed to serialize result: {}", e)))?;
        println!("{}", output);
    } else {
        println!("{}", result.recipe);
        if let Some(image) = &result.result_image {
            if image.starts_with("data:") {
                println!("\n[illustration: inline image, {} bytes]", image.len());
            } else {
                println!("\n[illustration: {}]", image);
            }
        }
    }

    Ok(())
}

/// One line per provider: name, text model, image model, and whether it is
/// the configured default
fn provider_lines(config: &ChefConfig) -> Vec<String> {
    ProviderFactory::available_providers()
        .into_iter()
        .map(|name| {
            let model = config
                .providers
                .get(name)
                .map(|p| p.model.as_str())
                .or_else(|| default_model_for(name))
                .unwrap_or("-");
            let images = default_image_model_for(name).unwrap_or("-");
            let marker = if config.default_provider == name { " (default)" } else { "" };
            format!("{:<10} model: {:<28} images: {}{}", name, model, images, marker)
        })
        .collect()
}
