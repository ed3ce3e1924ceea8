pub mod analyzer;
pub mod gemini; // Google Gemini vision client
pub mod normalizer;

pub use analyzer::{AnalyzerError, FoodAnalyzer};
pub use gemini::GeminiAnalyzer;
pub use normalizer::{ImageNormalizer, NormalizeError};
