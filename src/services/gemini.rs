use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::ai_service::{ImagePayload, InferenceProvider};
use super::error::AnalysisError;

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Google Gemini `generateContent` client with JSON structured output
pub struct GeminiProvider {
    model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(model: impl Into<String>, timeout: Duration) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            model: model.into(),
            client,
        })
    }

    fn api_url(&self) -> String {
        format!("{}/models/{}:generateContent", API_BASE_URL, self.model)
    }

    fn build_request<'a>(image: &'a ImagePayload, prompt: &'a str, schema: &'a Value) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: &image.mime_type,
                            data: &image.data,
                        },
                    },
                    Part::Text { text: prompt },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            },
        }
    }

    /// Prefer the API's own error message over the raw body
    fn error_message(body: &str) -> String {
        serde_json::from_str::<GenerateResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .map_or_else(|| body.trim().to_string(), |e| e.message)
    }

    fn extract_text(body: &str) -> Result<String, AnalysisError> {
        let response: GenerateResponse = serde_json::from_str(body)?;

        if let Some(error) = response.error {
            return Err(AnalysisError::message(error.message));
        }

        let text = response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<String>();

        if text.trim().is_empty() {
            return Err(AnalysisError::Parse("no text in Gemini response".to_string()));
        }

        Ok(text)
    }
}

#[async_trait::async_trait]
impl InferenceProvider for GeminiProvider {
    async fn generate(
        &self,
        api_key: &str,
        image: &ImagePayload,
        prompt: &str,
        schema: &Value,
    ) -> Result<String, AnalysisError> {
        let request = Self::build_request(image, prompt, schema);

        log::info!("🤖 Sending request to Gemini with model: {}", self.model);
        log::debug!("🔄 Base64 image size: {} bytes ({})", image.data.len(), image.mime_type);

        let response = self
            .client
            .post(self.api_url())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 Gemini response status: {}", status);

        let body = response.text().await?;

        if !status.is_success() {
            let message = Self::error_message(&body);
            log::error!("❌ Gemini API error ({}): {}", status, message);
            return Err(AnalysisError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let text = Self::extract_text(&body)?;
        log::debug!("💬 Gemini response content: {}", text);

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai_service::{nutrition_prompt, nutrition_schema};

    #[test]
    fn test_request_shape() {
        let image = ImagePayload::new("AAAA", "image/png");
        let prompt = nutrition_prompt();
        let schema = nutrition_schema();

        let value = serde_json::to_value(GeminiProvider::build_request(&image, &prompt, &schema)).unwrap();

        let parts = &value["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "AAAA");
        assert_eq!(parts[1]["text"], prompt.as_str());
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["generationConfig"]["responseSchema"], schema);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"foodName\":"},{"text":"\"apple\"}"}]}}]}"#;
        assert_eq!(GeminiProvider::extract_text(body).unwrap(), r#"{"foodName":"apple"}"#);
    }

    #[test]
    fn test_extract_text_without_candidates() {
        let err = GeminiProvider::extract_text(r#"{"candidates":[]}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Parse(_)));

        let err = GeminiProvider::extract_text("<html>").unwrap_err();
        assert!(matches!(err, AnalysisError::Parse(_)));
    }

    #[test]
    fn test_error_message_prefers_api_message() {
        let body = r#"{"error":{"code":503,"message":"The model is overloaded. Please try again later.","status":"UNAVAILABLE"}}"#;
        assert_eq!(
            GeminiProvider::error_message(body),
            "The model is overloaded. Please try again later."
        );
        assert_eq!(GeminiProvider::error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_api_url() {
        let provider = GeminiProvider::new("gemini-2.5-flash", Duration::from_secs(5)).unwrap();
        assert_eq!(
            provider.api_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
