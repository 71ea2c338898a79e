use serde_json::Value;
use std::sync::Arc;

use super::ai_service::{nutrition_prompt, nutrition_schema, ImagePayload, InferenceProvider};
use super::error::AnalysisError;
use super::retry::{try_each_credential, RetryPolicy};
use crate::config::AnalyzerConfig;
use crate::models::NutritionEstimate;

/// Turns a food photo into a nutrition estimate, falling back across API
/// keys and retrying transient provider failures with backoff.
pub struct ImageAnalyzer {
    api_keys: Vec<String>,
    retry: RetryPolicy,
    provider: Arc<dyn InferenceProvider>,
    prompt: String,
    schema: Value,
}

impl ImageAnalyzer {
    pub fn new(config: &AnalyzerConfig, provider: Arc<dyn InferenceProvider>) -> Self {
        Self {
            api_keys: config.api_keys.clone(),
            retry: RetryPolicy::new(config.max_attempts, config.base_delay),
            provider,
            prompt: nutrition_prompt(),
            schema: nutrition_schema(),
        }
    }

    pub fn key_count(&self) -> usize {
        self.api_keys.len()
    }

    pub async fn analyze_image(&self, image: &ImagePayload) -> Result<NutritionEstimate, AnalysisError> {
        if self.api_keys.is_empty() {
            return Err(AnalysisError::Configuration);
        }
        if image.is_empty() {
            return Err(AnalysisError::InvalidImage);
        }

        log::debug!("📸 Starting image analysis ({} key(s))", self.api_keys.len());

        let total = self.api_keys.len();
        let estimate = try_each_credential(&self.api_keys, |index, key| {
            let label = format!("API key {}/{}", index + 1, total);
            async move {
                self.retry
                    .run(&label, move |_attempt| self.analyze_with_key(key, image))
                    .await
            }
        })
        .await?;

        log::info!(
            "✅ Analyzed image: {} ({:.0} kcal)",
            estimate.food_name,
            estimate.calories
        );
        Ok(estimate)
    }

    async fn analyze_with_key(&self, api_key: &str, image: &ImagePayload) -> Result<NutritionEstimate, AnalysisError> {
        let text = self
            .provider
            .generate(api_key, image, &self.prompt, &self.schema)
            .await?;

        parse_estimate(&text)
    }
}

/// Parses the model's JSON text and checks the value ranges
pub fn parse_estimate(text: &str) -> Result<NutritionEstimate, AnalysisError> {
    let estimate: NutritionEstimate = serde_json::from_str(text.trim())?;
    estimate.validate().map_err(AnalysisError::Parse)?;
    Ok(estimate)
}
