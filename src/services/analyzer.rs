use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::models::{AnalysisResult, Confidence, NormalizedImage, DEFAULT_UNIT};

pub const ANALYSIS_PROMPT: &str = "你是一个专业的营养分析助手。请分析图片中的食物并提供以下信息：\n\
1. 食物名称（中文）\n\
2. 估算热量（kcal/100g或每份）\n\
3. 简短的健康建议（50字以内）\n\
\n\
请严格以JSON格式返回结果，不要有其他文字：\n\
{\n\
  \"foodName\": \"食物名称\",\n\
  \"calories\": 数值,\n\
  \"unit\": \"kcal/100g\",\n\
  \"healthAdvice\": \"健康建议\",\n\
  \"confidence\": \"high\"\n\
}\n\
\n\
如果图片中没有食物或无法识别，请返回：\n\
{\n\
  \"error\": \"无法识别食物\"\n\
}";

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// Transport, auth, quota or envelope failure talking to the inference endpoint.
    #[error("analyzer API error: {0}")]
    Api(String),
    #[error("analyzer timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("cannot parse analyzer response: {0}")]
    Unparsable(String),
    /// The model answered with the `{error}` shape and the message says no food was found.
    #[error("food not recognized: {0}")]
    NotRecognized(String),
    /// The model answered with the `{error}` shape for some other reason.
    #[error("analyzer reported: {0}")]
    Reported(String),
}

/// Multimodal backend that turns a normalized photo into nutrition text.
#[async_trait::async_trait]
pub trait FoodAnalyzer: Send + Sync {
    async fn analyze(&self, image: &NormalizedImage) -> Result<AnalysisResult, AnalyzerError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    #[serde(default)]
    error: Option<serde_json::Value>,
    food_name: Option<String>,
    calories: Option<serde_json::Value>,
    unit: Option<String>,
    health_advice: Option<String>,
    confidence: Option<String>,
}

fn json_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[\s\S]*\}").expect("static regex"))
}

/// Pulls the JSON object out of model output.
///
/// The whole text is tried first (JSON-mode output), then the greedy span from
/// the first `{` to the last `}`. A span that does not parse is an error; no
/// further guessing is done.
pub fn extract_json_object(text: &str) -> Result<serde_json::Map<String, serde_json::Value>, AnalyzerError> {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(text.trim()) {
        return Ok(map);
    }

    let span = json_span()
        .find(text)
        .ok_or_else(|| AnalyzerError::Unparsable("no JSON object in response".to_string()))?;

    match serde_json::from_str(span.as_str()) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(AnalyzerError::Unparsable("JSON span is not an object".to_string())),
        Err(e) => Err(AnalyzerError::Unparsable(format!("invalid JSON span: {}", e))),
    }
}

/// Parses model output into an [`AnalysisResult`], filling the optional fields.
pub fn parse_analysis_text(text: &str) -> Result<AnalysisResult, AnalyzerError> {
    let object = extract_json_object(text)?;
    let raw: RawAnalysis = serde_json::from_value(serde_json::Value::Object(object))
        .map_err(|e| AnalyzerError::Unparsable(format!("unexpected field types: {}", e)))?;

    if let Some(message) = raw.error.and_then(error_message) {
        return Err(if signals_not_recognized(&message) {
            AnalyzerError::NotRecognized(message)
        } else {
            AnalyzerError::Reported(message)
        });
    }

    let food_name = raw
        .food_name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AnalyzerError::Unparsable("missing foodName".to_string()))?;

    let calories = match raw.calories {
        Some(serde_json::Value::Number(n)) => n,
        Some(serde_json::Value::String(s)) => parse_number(&s)
            .ok_or_else(|| AnalyzerError::Unparsable(format!("calories is not numeric: {}", s)))?,
        _ => return Err(AnalyzerError::Unparsable("missing calories".to_string())),
    };

    let confidence = match raw.confidence.as_deref() {
        None => Confidence::default(),
        Some(label) => Confidence::from_label(label).unwrap_or_else(|| {
            log::warn!("Unknown confidence label '{}', using medium", label);
            Confidence::default()
        }),
    };

    Ok(AnalysisResult {
        food_name,
        calories,
        unit: raw
            .unit
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UNIT.to_string()),
        health_advice: raw.health_advice.unwrap_or_default(),
        confidence,
    })
}

/// Only a truthy `error` counts; `null`, `false`, `""` and `0` sit next to a valid result.
fn error_message(error: serde_json::Value) -> Option<String> {
    match error {
        serde_json::Value::Null | serde_json::Value::Bool(false) => None,
        serde_json::Value::Bool(true) => Some("true".to_string()),
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

fn parse_number(s: &str) -> Option<serde_json::Number> {
    let s = s.trim();
    if let Ok(i) = s.parse::<u64>() {
        return Some(serde_json::Number::from(i));
    }
    s.parse::<f64>().ok().and_then(serde_json::Number::from_f64)
}

fn signals_not_recognized(message: &str) -> bool {
    if message.contains("无法识别") || message.contains("未识别") {
        return true;
    }
    let lower = message.to_lowercase();
    ["not recognized", "unrecognized", "no food", "cannot identify", "unable to identify"]
        .iter()
        .any(|needle| lower.contains(needle))
}
