use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::pipeline::PipelineError;
use crate::models::{AnalysisResult, Envelope, ErrorCode};
use crate::services::AnalyzerError;

/// Client-facing message for a code. `limit_bytes` only matters for FILE_TOO_LARGE.
pub fn client_message(code: ErrorCode, limit_bytes: usize) -> String {
    match code {
        ErrorCode::NoFile => "请上传图片文件".to_string(),
        ErrorCode::InvalidFile => "图片格式不正确，请上传JPEG、PNG或WebP格式的图片".to_string(),
        ErrorCode::FileTooLarge => format!(
            "图片文件过大，请上传小于{}MB的图片",
            limit_bytes.div_ceil(1024 * 1024)
        ),
        ErrorCode::RecognitionFailed => "无法识别图片中的食物，请重新拍摄更清晰的照片".to_string(),
        ErrorCode::ApiError => "AI服务暂时不可用，请稍后重试".to_string(),
        ErrorCode::InternalError => "服务器内部错误".to_string(),
        ErrorCode::MethodNotAllowed => "只支持POST请求".to_string(),
    }
}

impl PipelineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PipelineError::NoFile => ErrorCode::NoFile,
            PipelineError::InvalidFile(_) => ErrorCode::InvalidFile,
            PipelineError::FileTooLarge { .. } => ErrorCode::FileTooLarge,
            PipelineError::Analyzer(AnalyzerError::NotRecognized(_)) => ErrorCode::RecognitionFailed,
            PipelineError::Analyzer(AnalyzerError::Api(_))
            | PipelineError::Analyzer(AnalyzerError::Timeout(_)) => ErrorCode::ApiError,
            PipelineError::Analyzer(AnalyzerError::Unparsable(_))
            | PipelineError::Analyzer(AnalyzerError::Reported(_))
            | PipelineError::Normalize(_)
            | PipelineError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

/// Wire response for an error code.
pub fn error_response(code: ErrorCode, limit_bytes: usize) -> Response {
    let status = StatusCode::from_u16(code.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = Envelope::failure(code, client_message(code, limit_bytes));
    (status, Json(body)).into_response()
}

/// Maps a pipeline outcome onto the envelope. Raw causes are logged, never sent.
pub fn analysis_response(outcome: Result<AnalysisResult, PipelineError>, limit_bytes: usize) -> Response {
    match outcome {
        Ok(result) => {
            log::info!("🍽️ Recognized '{}' ({} {})", result.food_name, result.calories, result.unit);
            (StatusCode::OK, Json(Envelope::success(result))).into_response()
        }
        Err(e) => {
            let code = e.code();
            match code {
                ErrorCode::InternalError | ErrorCode::ApiError => {
                    log::error!("❌ Analyze request failed with {}: {}", code, e)
                }
                _ => log::warn!("⚠️ Analyze request rejected with {}: {}", code, e),
            }
            error_response(code, limit_bytes)
        }
    }
}
