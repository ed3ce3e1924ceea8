use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    response::Response,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};

use super::{analyze_upload, body_limit, health_check};
use crate::handlers::AnalysisPipeline;

/// Standalone server: API routes, permissive CORS and the browser client as fallback.
pub fn create_server_router(pipeline: Arc<AnalysisPipeline>, static_dir: Option<PathBuf>) -> Router {
    let limit = body_limit(pipeline.config().max_upload_bytes);

    let mut router = Router::new()
        .route("/api/analyze", post(analyze_handler))
        .route("/api/health", get(health_check));

    if let Some(dir) = static_dir {
        log::info!("📁 Serving static files from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(limit))
        .layer(CorsLayer::permissive())
        .with_state(pipeline)
}

async fn analyze_handler(
    State(pipeline): State<Arc<AnalysisPipeline>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    log::info!("📨 Analyze request received");
    analyze_upload(pipeline, multipart).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::handlers::pipeline::tests::{png_bytes, CannedAnalyzer};
    use crate::services::FoodAnalyzer;
    use crate::web::test_support::{send, upload_request, Part};
    use axum::{body::Body, http::Request};

    const APPLE: &str = r#"Here you go: {"foodName":"apple","calories":52,"unit":"kcal/100g","healthAdvice":"low calorie","confidence":"high"}"#;

    fn app(analyzer: Arc<dyn FoodAnalyzer>) -> Router {
        app_with(PipelineConfig::default(), analyzer)
    }

    fn app_with(config: PipelineConfig, analyzer: Arc<dyn FoodAnalyzer>) -> Router {
        let pipeline = Arc::new(AnalysisPipeline::new(config, analyzer));
        create_server_router(pipeline, None)
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let png = png_bytes(64, 48);
        let request = upload_request(
            "POST",
            "/api/analyze",
            &[Part {
                name: "image",
                content_type: Some("image/png"),
                data: &png,
            }],
        );

        let (status, _, body) = send(app(CannedAnalyzer::text(APPLE)), request).await;

        assert_eq!(status, 200);
        assert_eq!(
            body,
            serde_json::json!({
                "success": true,
                "data": {
                    "foodName": "apple",
                    "calories": 52,
                    "unit": "kcal/100g",
                    "healthAdvice": "low calorie",
                    "confidence": "high"
                }
            })
        );
    }

    #[tokio::test]
    async fn test_defaults_applied() {
        let png = png_bytes(16, 16);
        let request = upload_request(
            "POST",
            "/api/analyze",
            &[Part {
                name: "image",
                content_type: Some("image/png"),
                data: &png,
            }],
        );

        let analyzer = CannedAnalyzer::text(r#"{"foodName":"rice","calories":130,"healthAdvice":"fine"}"#);
        let (status, _, body) = send(app(analyzer), request).await;

        assert_eq!(status, 200);
        assert_eq!(body["data"]["unit"], "kcal/100g");
        assert_eq!(body["data"]["confidence"], "medium");
    }

    #[tokio::test]
    async fn test_missing_image_field() {
        let request = upload_request(
            "POST",
            "/api/analyze",
            &[Part {
                name: "photo",
                content_type: Some("image/png"),
                data: b"abc",
            }],
        );

        let (status, _, body) = send(app(CannedAnalyzer::text(APPLE)), request).await;

        assert_eq!(status, 400);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NO_FILE");
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_no_file() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let (status, _, body) = send(app(CannedAnalyzer::text(APPLE)), request).await;

        assert_eq!(status, 400);
        assert_eq!(body["error"]["code"], "NO_FILE");
    }

    #[tokio::test]
    async fn test_gif_is_invalid_file() {
        let request = upload_request(
            "POST",
            "/api/analyze",
            &[Part {
                name: "image",
                content_type: Some("image/gif"),
                data: b"GIF89a....",
            }],
        );

        let (status, _, body) = send(app(CannedAnalyzer::text(APPLE)), request).await;

        assert_eq!(status, 400);
        assert_eq!(body["error"]["code"], "INVALID_FILE");
    }

    #[tokio::test]
    async fn test_eleven_megabyte_jpeg_is_too_large() {
        let data = vec![0xAB; 11 * 1024 * 1024];
        let request = upload_request(
            "POST",
            "/api/analyze",
            &[Part {
                name: "image",
                content_type: Some("image/jpeg"),
                data: &data,
            }],
        );

        let (status, _, body) = send(app(CannedAnalyzer::text(APPLE)), request).await;

        assert_eq!(status, 413);
        assert_eq!(body["error"]["code"], "FILE_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_side_fields_do_not_count_against_image_limit() {
        let png = png_bytes(16, 16);
        let note = vec![b'a'; 200 * 1024];
        let config = PipelineConfig {
            max_upload_bytes: 64 * 1024,
            ..PipelineConfig::default()
        };
        let request = upload_request(
            "POST",
            "/api/analyze",
            &[
                Part {
                    name: "note",
                    content_type: Some("text/plain"),
                    data: &note,
                },
                Part {
                    name: "image",
                    content_type: Some("image/png"),
                    data: &png,
                },
            ],
        );

        let (status, _, body) = send(app_with(config, CannedAnalyzer::text(APPLE)), request).await;

        assert_eq!(status, 200);
        assert_eq!(body["data"]["foodName"], "apple");
    }

    #[tokio::test]
    async fn test_unbounded_upload_limit_does_not_overflow() {
        let png = png_bytes(16, 16);
        let config = PipelineConfig {
            max_upload_bytes: usize::MAX,
            ..PipelineConfig::default()
        };
        let request = upload_request(
            "POST",
            "/api/analyze",
            &[Part {
                name: "image",
                content_type: Some("image/png"),
                data: &png,
            }],
        );

        let (status, _, _) = send(app_with(config, CannedAnalyzer::text(APPLE)), request).await;

        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_not_recognized() {
        let png = png_bytes(16, 16);
        let request = upload_request(
            "POST",
            "/api/analyze",
            &[Part {
                name: "image",
                content_type: Some("image/png"),
                data: &png,
            }],
        );

        let (status, _, body) = send(app(CannedAnalyzer::text(r#"{"error":"无法识别食物"}"#)), request).await;

        assert_eq!(status, 422);
        assert_eq!(body["error"]["code"], "RECOGNITION_FAILED");
    }

    #[tokio::test]
    async fn test_no_json_is_internal_error() {
        let png = png_bytes(16, 16);
        let request = upload_request(
            "POST",
            "/api/analyze",
            &[Part {
                name: "image",
                content_type: Some("image/png"),
                data: &png,
            }],
        );

        let (status, _, body) = send(app(CannedAnalyzer::text("I see a plate of something tasty.")), request).await;

        assert_eq!(status, 500);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "服务器内部错误");
    }

    #[tokio::test]
    async fn test_api_failure_is_service_unavailable() {
        let png = png_bytes(16, 16);
        let request = upload_request(
            "POST",
            "/api/analyze",
            &[Part {
                name: "image",
                content_type: Some("image/png"),
                data: &png,
            }],
        );

        let (status, _, body) = send(app(CannedAnalyzer::api_failure("403 forbidden")), request).await;

        assert_eq!(status, 503);
        assert_eq!(body["error"]["code"], "API_ERROR");
        assert!(!body["error"]["message"].as_str().unwrap().contains("403"));
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let (status, _, body) = send(app(CannedAnalyzer::text(APPLE)), request).await;

        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert!(timestamp.ends_with('Z'));
    }
}
