use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::generate_within;
use crate::config::ExtractionConfig;
use crate::model::FridgeContents;
use crate::prompt::PromptTemplate;
use crate::providers::{GenerationRequest, LlmProvider};
use crate::schema::{fridge_contents_json_schema, parse_fridge_contents, ExtractionRequest};
use crate::ChefError;

/// Asks a vision model which food items are in the photo
pub struct ExtractionStage {
    provider: Arc<dyn LlmProvider>,
    template: PromptTemplate,
    temperature: f32,
    timeout: Duration,
    invalid_output_attempts: u32,
}

impl ExtractionStage {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &ExtractionConfig) -> Self {
        ExtractionStage {
            provider,
            template: PromptTemplate::analyse_fridge(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout),
            invalid_output_attempts: config.invalid_output_attempts.max(1),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Identify the visible food items in an inline image.
    ///
    /// Output that does not match the fridge contents schema is an error; it
    /// is only re-requested when `invalid_output_attempts` allows it.
    pub async fn extract(&self, image_data_uri: &str) -> Result<FridgeContents, ChefError> {
        let envelope = ExtractionRequest::new(image_data_uri)
            .map_err(|e| ChefError::ExtractionError(format!("invalid request: {}", e)))?;
        let prompt = self
            .template
            .render(&[])
            .map_err(|e| ChefError::ExtractionError(e.to_string()))?;

        let request = GenerationRequest::text(prompt, self.temperature)
            .with_image(envelope.image_url)
            .with_schema(fridge_contents_json_schema());

        let mut attempt = 1;
        loop {
            info!(
                "Analysing fridge contents with {}",
                self.provider.provider_name()
            );
            let output = generate_within(self.provider.as_ref(), &request, self.timeout)
                .await
                .map_err(|e| ChefError::ExtractionError(e.to_string()))?;
            debug!("Extraction output: {}", output);

            match parse_fridge_contents(&output) {
                Ok(contents) => {
                    info!("Recognized {} item(s)", contents.len());
                    return Ok(contents);
                }
                Err(e) if attempt < self.invalid_output_attempts => {
                    warn!(
                        "Model output did not match the schema (attempt {}/{}): {}",
                        attempt, self.invalid_output_attempts, e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    return Err(ChefError::ExtractionError(format!(
                        "model output did not match the fridge contents schema: {}",
                        e
                    )))
                }
            }
        }
    }
}
