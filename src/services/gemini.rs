use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};

use super::analyzer::{parse_analysis_text, AnalyzerError, FoodAnalyzer, ANALYSIS_PROMPT};
use crate::config::AnalyzerConfig;
use crate::models::{AnalysisResult, NormalizedImage};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// First text part across all candidates.
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
    }
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

/// Both the success shape and the `{error}` shape, every property optional.
fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "foodName": { "type": "STRING" },
            "calories": { "type": "NUMBER" },
            "unit": { "type": "STRING" },
            "healthAdvice": { "type": "STRING" },
            "confidence": { "type": "STRING", "enum": ["high", "medium", "low"] },
            "error": { "type": "STRING" }
        }
    })
}

/// Google Gemini `generateContent` client.
pub struct GeminiAnalyzer {
    api_key: Option<String>,
    model: String,
    api_base: String,
    structured_output: bool,
    client: reqwest::Client,
}

impl GeminiAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_base: config.api_base.clone(),
            structured_output: config.structured_output,
            client: reqwest::Client::new(),
        }
    }

    fn build_request(&self, image: &NormalizedImage) -> GenerateRequest {
        let base64_image = general_purpose::STANDARD.encode(&image.jpeg);
        log::debug!(
            "🔄 Base64 encoded image: {} bytes from {} bytes of JPEG",
            base64_image.len(),
            image.jpeg.len()
        );

        let generation_config = self.structured_output.then(|| GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: response_schema(),
        });

        GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::Text {
                        text: ANALYSIS_PROMPT.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg".to_string(),
                            data: base64_image,
                        },
                    },
                ],
            }],
            generation_config,
        }
    }

    async fn generate(&self, api_key: &str, request: &GenerateRequest) -> Result<String, AnalyzerError> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);

        log::info!("🤖 Sending request to Gemini with model: {}", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AnalyzerError::Api(format!("request failed: {}", e)))?;

        let status = response.status();
        log::debug!("📥 Gemini response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::error!("❌ Gemini API error response ({}): {}", status, error_text);
            return Err(AnalyzerError::Api(format!("status {}", status)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AnalyzerError::Api(format!("unreadable response envelope: {}", e)))?;

        body.first_text()
            .ok_or_else(|| AnalyzerError::Api("response has no text candidates".to_string()))
    }
}

#[async_trait::async_trait]
impl FoodAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, image: &NormalizedImage) -> Result<AnalysisResult, AnalyzerError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AnalyzerError::Api("GEMINI_API_KEY is not configured".to_string()))?;

        let request = self.build_request(image);
        let text = self.generate(api_key, &request).await?;
        log::info!("💬 Gemini response content: {}", text);

        parse_analysis_text(&text)
    }
}
