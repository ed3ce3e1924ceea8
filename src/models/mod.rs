use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const DEFAULT_UNIT: &str = "kcal/100g";

/// Image part as it came off the multipart stream, before validation.
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Upload that passed ingress checks.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub content_type: ImageMime,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Jpeg,
    Png,
    Webp,
}

impl ImageMime {
    /// Parses a declared content type, ignoring case and any `;` parameters.
    pub fn from_content_type(s: &str) -> Option<Self> {
        let essence = s.split(';').next().unwrap_or("").trim().to_ascii_lowercase();

        match essence.as_str() {
            "image/jpeg" => Some(ImageMime::Jpeg),
            "image/png" => Some(ImageMime::Png),
            "image/webp" => Some(ImageMime::Webp),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageMime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
            ImageMime::Webp => "image/webp",
        };
        write!(f, "{}", s)
    }
}

/// JPEG re-encoded within the configured dimension bound.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl Confidence {
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub food_name: String,
    /// Kept as written by the analyzer so `52` is not echoed back as `52.0`.
    pub calories: serde_json::Number,
    pub unit: String,
    pub health_advice: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoFile,
    InvalidFile,
    FileTooLarge,
    RecognitionFailed,
    ApiError,
    InternalError,
    MethodNotAllowed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NoFile => "NO_FILE",
            ErrorCode::InvalidFile => "INVALID_FILE",
            ErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ErrorCode::RecognitionFailed => "RECOGNITION_FAILED",
            ErrorCode::ApiError => "API_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::MethodNotAllowed => "METHOD_NOT_ALLOWED",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::NoFile | ErrorCode::InvalidFile => 400,
            ErrorCode::FileTooLarge => 413,
            ErrorCode::RecognitionFailed => 422,
            ErrorCode::ApiError => 503,
            ErrorCode::InternalError => 500,
            ErrorCode::MethodNotAllowed => 405,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: ErrorCode,
    pub message: String,
}

/// Uniform `{success, data|error}` body returned by every analyze response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Success { success: bool, data: AnalysisResult },
    Failure { success: bool, error: ErrorEnvelope },
}

impl Envelope {
    pub fn success(data: AnalysisResult) -> Self {
        Envelope::Success {
            success: true,
            data,
        }
    }

    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Envelope::Failure {
            success: false,
            error: ErrorEnvelope {
                code,
                message: message.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_ignores_case_and_parameters() {
        assert_eq!(ImageMime::from_content_type("image/JPEG"), Some(ImageMime::Jpeg));
        assert_eq!(
            ImageMime::from_content_type("image/webp; charset=binary"),
            Some(ImageMime::Webp)
        );
        assert_eq!(ImageMime::from_content_type("image/gif"), None);
        assert_eq!(ImageMime::from_content_type(""), None);
    }

    #[test]
    fn test_failure_envelope_shape() {
        let body = serde_json::to_value(Envelope::failure(ErrorCode::FileTooLarge, "too big")).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "error": { "code": "FILE_TOO_LARGE", "message": "too big" }
            })
        );
    }

    #[test]
    fn test_success_envelope_keeps_integer_calories() {
        let result = AnalysisResult {
            food_name: "apple".to_string(),
            calories: serde_json::Number::from(52),
            unit: DEFAULT_UNIT.to_string(),
            health_advice: "low calorie".to_string(),
            confidence: Confidence::High,
        };
        let text = serde_json::to_string(&Envelope::success(result)).unwrap();

        assert_eq!(
            text,
            r#"{"success":true,"data":{"foodName":"apple","calories":52,"unit":"kcal/100g","healthAdvice":"low calorie","confidence":"high"}}"#
        );
    }
}
