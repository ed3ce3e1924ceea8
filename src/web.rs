use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart,
    },
    http::StatusCode,
    response::Response,
    Json,
};
use bytes::{Bytes, BytesMut};
use std::sync::Arc;

use crate::handlers::{analysis_response, AnalysisPipeline, PipelineError};
use crate::models::{HealthStatus, ImageMime, ImagePart};

/// Room for boundaries, part headers and small side fields on top of the file limit.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Transport body limit for an upload route.
pub fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES)
}

pub const IMAGE_FIELD: &str = "image";

/// Reads the first `image` part, keeping at most `max_bytes + 1` bytes of it.
///
/// Parts with any other name are skipped. When the declared type is not an
/// accepted image the body is not read at all.
pub async fn read_image_part(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<Option<ImagePart>, PipelineError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            log::debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        if content_type
            .as_deref()
            .and_then(ImageMime::from_content_type)
            .is_none()
        {
            return Ok(Some(ImagePart {
                content_type,
                data: Bytes::new(),
            }));
        }

        let mut data = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, max_bytes))? {
            let room = max_bytes.saturating_add(1).saturating_sub(data.len());
            data.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if data.len() > max_bytes {
                break;
            }
        }

        return Ok(Some(ImagePart {
            content_type,
            data: data.freeze(),
        }));
    }

    Ok(None)
}

fn multipart_error(e: MultipartError, max_bytes: usize) -> PipelineError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PipelineError::FileTooLarge { limit: max_bytes }
    } else {
        PipelineError::Internal(format!("malformed multipart body: {}", e))
    }
}

/// Shared `POST /api/analyze` body for both shells.
pub async fn analyze_upload(
    pipeline: Arc<AnalysisPipeline>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let limit = pipeline.config().max_upload_bytes;

    let outcome = match multipart {
        Ok(mut multipart) => match read_image_part(&mut multipart, limit).await {
            Ok(part) => pipeline.run(part).await,
            Err(e) => Err(e),
        },
        Err(rejection) => {
            log::warn!("⚠️ Request is not a multipart upload: {}", rejection);
            Err(PipelineError::NoFile)
        }
    };

    analysis_response(outcome, limit)
}

pub async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })
}

pub mod function;
pub mod server;
