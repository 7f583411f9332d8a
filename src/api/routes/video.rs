use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use time::OffsetDateTime;

use super::{check_admission, require_url, VideoRequest};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::ClientIp;
use crate::api::state::AppState;
use crate::downloader::FailureKind;
use crate::notify::build_caption;
use crate::platform::Platform;
use crate::store::ArtifactStore;
use crate::usage::RequestEvent;

/// Result of a server-side download. The local path is never exposed.
#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub download_id: String,
    pub title: String,
    pub file_extension: String,
    pub file_size: u64,
    pub quality: String,
    pub format_id: String,
    pub resolution: String,
    pub fps: f64,
    pub duration: u64,
    pub thumbnail: String,
    pub uploader: String,
    pub platform: String,
    pub download_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

fn record_usage(
    state: &AppState,
    endpoint: &'static str,
    platform: Platform,
    started: Instant,
    failure: Option<FailureKind>,
) {
    state.usage.record_request(&RequestEvent {
        endpoint,
        platform: platform.tag().to_string(),
        processing_time: started.elapsed(),
        failure,
    });
}

fn success(platform: Platform, data: impl Serialize) -> Json<Value> {
    Json(json!({
        "success": true,
        "platform": platform.tag(),
        "data": data,
    }))
}

/// POST /api/video/validate - not rate limited
pub async fn validate_url(
    payload: Result<Json<VideoRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload.map_err(|_| ApiError::MissingUrl)?;
    let url = request.url.ok_or(ApiError::MissingUrl)?.trim().to_string();

    if url.is_empty() {
        return Ok(Json(json!({
            "valid": false,
            "error": "URL cannot be empty",
        })));
    }

    let platform = Platform::from_url(&url);
    Ok(Json(json!({
        "valid": platform.is_some(),
        "platform": platform.map(|p| p.tag()),
        "url": url,
    })))
}

/// POST /api/video/info
pub async fn video_info(
    State(state): State<Arc<AppState>>,
    ClientIp(client): ClientIp,
    payload: Result<Json<VideoRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let started = Instant::now();
    check_admission(&state, &client, "/api/video/info")?;
    let (_, url, platform) = require_url(payload)?;
    tracing::info!(client = %client, %platform, url = %url, "Getting video info");

    match state.orchestrator.resolve_info(&url).await {
        Ok(metadata) => {
            record_usage(&state, "/api/video/info", platform, started, None);
            state.usage.record_metadata(&metadata);
            state.limiter.record(&client);
            Ok(success(platform, metadata))
        }
        Err(e) => {
            record_usage(&state, "/api/video/info", platform, started, Some(e.kind));
            Err(ApiError::VideoNotFound)
        }
    }
}

/// POST /api/video/direct-url
pub async fn direct_url(
    State(state): State<Arc<AppState>>,
    ClientIp(client): ClientIp,
    payload: Result<Json<VideoRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let started = Instant::now();
    check_admission(&state, &client, "/api/video/direct-url")?;
    let (request, url, platform) = require_url(payload)?;
    tracing::info!(client = %client, %platform, url = %url, quality = %request.quality, "Getting direct URL");

    match state.orchestrator.resolve_direct_url(&url, &request.quality).await {
        Ok(link) => {
            record_usage(&state, "/api/video/direct-url", platform, started, None);
            state.usage.record_metadata(&link.metadata);
            state.limiter.record(&client);
            Ok(success(platform, link))
        }
        Err(e) => {
            record_usage(&state, "/api/video/direct-url", platform, started, Some(e.kind));
            Err(ApiError::LinkUnavailable)
        }
    }
}

/// POST /api/video/download
///
/// Materializes the file, registers it and answers with a ticket. The
/// notification runs in the background and never delays or fails the response.
pub async fn download(
    State(state): State<Arc<AppState>>,
    ClientIp(client): ClientIp,
    payload: Result<Json<VideoRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let started = Instant::now();
    check_admission(&state, &client, "/api/video/download")?;
    let (request, url, platform) = require_url(payload)?;
    tracing::info!(client = %client, %platform, url = %url, quality = %request.quality, "Downloading video");

    let file = match state.orchestrator.materialize(&url, &request.quality).await {
        Ok(file) => file,
        Err(e) => {
            record_usage(&state, "/api/video/download", platform, started, Some(e.kind));
            return Err(ApiError::DownloadUnavailable);
        }
    };

    let ticket = state.store.register(&file, &request.quality);
    let status = state.store.status_of(&ticket)?;

    let notifier = state.notifier.clone();
    let path = file.path.clone();
    let caption = build_caption(&file.metadata);
    let notify_ticket = ticket.clone();
    tokio::spawn(async move {
        match notifier.notify(&path, &caption).await {
            Ok(()) => tracing::debug!(ticket = %notify_ticket, sink = notifier.name(), "Notification sent"),
            Err(e) => tracing::warn!(
                ticket = %notify_ticket,
                sink = notifier.name(),
                error = %e,
                "Notification failed"
            ),
        }
    });

    record_usage(&state, "/api/video/download", platform, started, None);
    state.usage.record_metadata(&file.metadata);
    state.limiter.record(&client);

    let metadata = file.metadata;
    Ok(success(
        platform,
        DownloadResponse {
            download_url: ArtifactStore::serve_path(&ticket),
            download_id: ticket,
            title: metadata.title,
            file_extension: file.file_extension,
            file_size: file.file_size,
            quality: request.quality,
            format_id: file.format_id,
            resolution: file.resolution,
            fps: file.fps,
            duration: metadata.duration,
            thumbnail: metadata.thumbnail,
            uploader: metadata.uploader,
            platform: metadata.platform,
            expires_at: status.expires_at,
        },
    ))
}
