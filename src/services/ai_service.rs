use base64::{engine::general_purpose, Engine};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

use super::error::AnalysisError;
use crate::models::NOT_FOOD_NAME;

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Base64 image plus its MIME type, as the inference provider expects it
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub data: String,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        Self::new(general_purpose::STANDARD.encode(bytes), mime_type)
    }

    /// Accepts `data:image/png;base64,....` or bare base64
    pub fn from_data_url(url: &str) -> Self {
        let url = url.trim();

        let Some(rest) = url.strip_prefix("data:") else {
            return Self::new(url, DEFAULT_MIME_TYPE);
        };

        match rest.split_once(',') {
            Some((header, data)) => {
                let mime_type = header
                    .split(';')
                    .next()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_MIME_TYPE);
                Self::new(data, mime_type)
            }
            None => Self::new(rest, DEFAULT_MIME_TYPE),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;

        let mime_type = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            _ => DEFAULT_MIME_TYPE,
        };

        log::debug!("📊 Image file size: {} bytes ({})", bytes.len(), mime_type);
        Ok(Self::from_bytes(&bytes, mime_type))
    }

    pub fn is_empty(&self) -> bool {
        self.data.trim().is_empty()
    }
}

pub fn nutrition_prompt() -> String {
    format!(
        "Analyze this image of food and provide its nutritional information. \
         Be as accurate as possible. If it's not food, return zeros for all \
         nutritional values and '{}' as the name.",
        NOT_FOOD_NAME
    )
}

/// Structured-output schema for a NutritionEstimate, every field required
pub fn nutrition_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "foodName": {
                "type": "STRING",
                "description": "The name of the food item identified in the image."
            },
            "calories": {
                "type": "NUMBER",
                "description": "Estimated number of calories."
            },
            "protein": {
                "type": "NUMBER",
                "description": "Estimated grams of protein."
            },
            "carbs": {
                "type": "NUMBER",
                "description": "Estimated grams of carbohydrates."
            },
            "fat": {
                "type": "NUMBER",
                "description": "Estimated grams of fat."
            }
        },
        "required": ["foodName", "calories", "protein", "carbs", "fat"]
    })
}

/// One request/response round trip to an image-understanding model.
/// Returns the model's JSON text untouched.
#[async_trait::async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn generate(
        &self,
        api_key: &str,
        image: &ImagePayload,
        prompt: &str,
        schema: &Value,
    ) -> Result<String, AnalysisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_prefix_is_stripped() {
        let image = ImagePayload::from_data_url("data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(image.data, "iVBORw0KGgo=");
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn test_bare_base64_defaults_to_jpeg() {
        let image = ImagePayload::from_data_url("/9j/4AAQSkZJRg==");
        assert_eq!(image.data, "/9j/4AAQSkZJRg==");
        assert_eq!(image.mime_type, "image/jpeg");

        let no_mime = ImagePayload::from_data_url("data:;base64,AAAA");
        assert_eq!(no_mime.mime_type, "image/jpeg");
        assert_eq!(no_mime.data, "AAAA");
    }

    #[test]
    fn test_from_bytes_encodes() {
        let image = ImagePayload::from_bytes(b"hello", "image/webp");
        assert_eq!(image.data, "aGVsbG8=");
        assert!(!image.is_empty());
        assert!(ImagePayload::from_bytes(b"", "image/jpeg").is_empty());
    }

    #[test]
    fn test_from_path_detects_png() {
        let path = std::env::temp_dir().join(format!("snapcal-test-{}.PNG", std::process::id()));
        fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let image = ImagePayload::from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, general_purpose::STANDARD.encode([0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn test_schema_requires_every_field() {
        let schema = nutrition_schema();
        let required = schema["required"].as_array().unwrap();

        for field in ["foodName", "calories", "protein", "carbs", "fat"] {
            assert!(required.iter().any(|v| v == field), "{} not required", field);
            assert!(schema["properties"][field].is_object());
        }
        assert_eq!(schema["properties"]["foodName"]["type"], "STRING");
        assert_eq!(schema["properties"]["fat"]["type"], "NUMBER");
    }

    #[test]
    fn test_prompt_names_sentinel() {
        assert!(nutrition_prompt().contains(NOT_FOOD_NAME));
    }
}
