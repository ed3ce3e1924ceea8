use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use std::sync::Arc;

use super::{analyze_upload, body_limit, health_check};
use crate::handlers::{error_response, AnalysisPipeline};
use crate::models::ErrorCode;

const ALLOWED_METHODS: &str = "GET,OPTIONS,PATCH,DELETE,POST,PUT";
const ALLOWED_HEADERS: &str = "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, Content-Length, Content-MD5, Content-Type, Date, X-Api-Version";

/// Function-platform shell: same pipeline, platform-style method and CORS handling.
pub fn create_function_router(pipeline: Arc<AnalysisPipeline>) -> Router {
    let limit = body_limit(pipeline.config().max_upload_bytes);

    Router::new()
        .route("/api/analyze", any(function_handler))
        .route("/api/health", get(health_check))
        .layer(DefaultBodyLimit::max(limit))
        .layer(middleware::map_response(add_cors_headers))
        .with_state(pipeline)
}

async fn function_handler(
    method: Method,
    State(pipeline): State<Arc<AnalysisPipeline>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    match method {
        Method::OPTIONS => StatusCode::OK.into_response(),
        Method::POST => analyze_upload(pipeline, multipart).await,
        other => {
            log::warn!("⚠️ Rejected {} request on analyze function", other);
            error_response(ErrorCode::MethodNotAllowed, pipeline.config().max_upload_bytes)
        }
    }
}

async fn add_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    response
}
