//! API route handlers
//!
//! - `video`: URL validation, metadata, direct links and server downloads
//! - `artifacts`: serving downloaded files and their status
//! - `service`: health, platform catalogue, rate-limit status, analytics

pub mod artifacts;
pub mod service;
pub mod video;

use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::platform::Platform;

/// Body accepted by every video endpoint
#[derive(Debug, Deserialize)]
pub struct VideoRequest {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_quality")]
    pub quality: String,
}

fn default_quality() -> String {
    "best".to_string()
}

/// Unwrap the body into a trimmed, supported URL
pub(crate) fn require_url(
    payload: Result<Json<VideoRequest>, JsonRejection>,
) -> ApiResult<(VideoRequest, String, Platform)> {
    let Json(request) = payload.map_err(|_| ApiError::MissingUrl)?;
    let url = request
        .url
        .as_deref()
        .ok_or(ApiError::MissingUrl)?
        .trim()
        .to_string();

    if url.is_empty() {
        return Err(ApiError::EmptyUrl);
    }
    let platform = Platform::from_url(&url).ok_or(ApiError::UnsupportedPlatform)?;
    Ok((request, url, platform))
}

/// Reject the request when the client has used up its window
pub(crate) fn check_admission(
    state: &AppState,
    client: &str,
    endpoint: &'static str,
) -> ApiResult<()> {
    if state.limiter.admit(client) {
        return Ok(());
    }
    tracing::warn!(client, endpoint, "Rate limit exceeded");
    state.usage.record_admission_denied(endpoint);
    Err(ApiError::AdmissionDenied)
}

/// Service info and endpoint list
pub async fn api_info() -> impl IntoResponse {
    Json(json!({
        "name": "Video Downloader API",
        "version": env!("CARGO_PKG_VERSION"),
        "platforms": Platform::ALL.iter().map(|p| p.tag()).collect::<Vec<_>>(),
        "endpoints": [
            "POST /api/video/info",
            "POST /api/video/direct-url",
            "POST /api/video/download",
            "POST /api/video/validate",
            "GET /api/serve/{download_id}",
            "GET /api/download/status/{download_id}",
            "GET /api/supported-platforms",
            "GET /api/rate-limit/status",
            "GET /api/analytics/stats",
            "GET /api/health"
        ]
    }))
}

/// 404 for undefined routes
pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}
