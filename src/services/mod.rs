pub mod ai_service;
pub mod analyzer;
pub mod error;
pub mod gemini; // Google Gemini generateContent
pub mod retry;

pub use ai_service::{ImagePayload, InferenceProvider};
pub use analyzer::ImageAnalyzer;
pub use error::AnalysisError;
pub use gemini::GeminiProvider;
