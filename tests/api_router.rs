//! Router-level tests driven through `oneshot` with a scripted resolver

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

use common::{ScriptedResolver, Step, MP4_MAGIC};
use video_downloader_lib::api::{build_router, AppState, RouterOptions};
use video_downloader_lib::clock::{Clock, SystemClock};
use video_downloader_lib::downloader::{CascadeSettings, ExtractionOrchestrator};
use video_downloader_lib::limiter::{RateLimiter, DEFAULT_WINDOW};
use video_downloader_lib::notify::{NotificationSink, NotifyError};
use video_downloader_lib::store::{ArtifactStore, DEFAULT_RETENTION};
use video_downloader_lib::usage::InMemoryUsage;

const VIDEO_URL: &str = "https://www.youtube.com/watch?v=abc123";

fn state(resolver: ScriptedResolver, dir: &Path, max_requests: usize) -> AppState {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let orchestrator =
        ExtractionOrchestrator::new(Arc::new(resolver), dir, CascadeSettings::default());
    AppState::new(
        orchestrator,
        RateLimiter::new(max_requests, DEFAULT_WINDOW, clock.clone()),
        ArtifactStore::new(DEFAULT_RETENTION, clock),
    )
}

fn router(state: AppState) -> Router {
    build_router(Arc::new(state), &RouterOptions::default())
}

fn post(uri: &str, body: Value, client: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, client: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Forwards every notification into a channel
struct ChannelSink(mpsc::UnboundedSender<(PathBuf, String)>);

#[async_trait]
impl NotificationSink for ChannelSink {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn notify(&self, path: &Path, caption: &str) -> Result<(), NotifyError> {
        let _ = self.0.send((path.to_path_buf(), caption.to_string()));
        Ok(())
    }
}

#[tokio::test]
async fn test_validate_is_not_rate_limited() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(ScriptedResolver::new(Step::Metadata), dir.path(), 1));

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(post("/api/video/validate", json!({ "url": VIDEO_URL }), "1.1.1.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["valid"], true);
        assert_eq!(body["platform"], "youtube");
    }

    let response = app
        .clone()
        .oneshot(post("/api/video/validate", json!({ "url": "https://example.com/x" }), "1.1.1.1"))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["valid"], false);

    let response = app
        .oneshot(post("/api/video/validate", json!({ "url": "   " }), "1.1.1.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["valid"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_bad_requests() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(ScriptedResolver::new(Step::Metadata), dir.path(), 10));

    let response = app
        .clone()
        .oneshot(post("/api/video/info", json!({}), "2.2.2.2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid request");

    let response = app
        .clone()
        .oneshot(post("/api/video/info", json!({ "url": "" }), "2.2.2.2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid URL");

    let response = app
        .oneshot(post("/api/video/download", json!({ "url": "https://example.com/v.mp4" }), "2.2.2.2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Unsupported platform");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(ScriptedResolver::new(Step::Metadata), dir.path(), 2));

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post("/api/video/info", json!({ "url": VIDEO_URL }), "3.3.3.3"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post("/api/video/info", json!({ "url": VIDEO_URL }), "3.3.3.3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(response).await["error"], "Rate limit exceeded");

    // Another client keeps its own budget
    let response = app
        .clone()
        .oneshot(post("/api/video/info", json!({ "url": VIDEO_URL }), "4.4.4.4, 10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/api/rate-limit/status", "3.3.3.3"))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["client_ip"], "3.3.3.3");
    assert_eq!(body["rate_limit"]["requests_made"], 2);
    assert_eq!(body["rate_limit"]["requests_remaining"], 0);
    assert_eq!(body["rate_limit"]["max_requests"], 2);
    assert!(body["rate_limit"]["time_until_reset"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_failed_extraction_does_not_consume_budget() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(
        ScriptedResolver::new(Step::Fail("Video unavailable")),
        dir.path(),
        1,
    ));

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(post("/api/video/info", json!({ "url": VIDEO_URL }), "5.5.5.5"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "Video not found");
    }

    let response = app
        .oneshot(get("/api/rate-limit/status", "5.5.5.5"))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["rate_limit"]["requests_made"], 0);
}

#[tokio::test]
async fn test_download_serve_and_status() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let state = state(
        ScriptedResolver::new(Step::media(MP4_MAGIC, "mp4", 4096)),
        dir.path(),
        10,
    )
    .with_notifier(Arc::new(ChannelSink(tx)));
    let app = router(state);

    let response = app
        .clone()
        .oneshot(post("/api/video/download", json!({ "url": VIDEO_URL, "quality": "720p" }), "6.6.6.6"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["platform"], "youtube");

    let data = &body["data"];
    assert_eq!(data["title"], "Test clip");
    assert_eq!(data["file_extension"], "mp4");
    assert_eq!(data["file_size"], 4096);
    assert_eq!(data["quality"], "720p");
    assert!(data.get("file_path").is_none());
    let ticket = data["download_id"].as_str().unwrap().to_string();
    let serve_url = data["download_url"].as_str().unwrap().to_string();
    assert_eq!(serve_url, format!("/api/serve/{}", ticket));

    let (path, caption) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(path.starts_with(dir.path()));
    assert!(caption.contains("<b>Test clip</b>"));

    let response = app.clone().oneshot(get(&serve_url, "6.6.6.6")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Test clip.mp4\""
    );
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "4096");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.len(), 4096);
    assert!(bytes.starts_with(MP4_MAGIC));

    let response = app
        .clone()
        .oneshot(get(&format!("/api/download/status/{}", ticket), "6.6.6.6"))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["download_count"], 1);
    assert_eq!(body["data"]["download_id"], ticket.as_str());

    let response = app
        .oneshot(get("/api/serve/no-such-ticket", "6.6.6.6"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Download not found");
}

#[tokio::test]
async fn test_failed_download_is_uniform_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(ScriptedResolver::new(Step::html(4096)), dir.path(), 10));

    let response = app
        .oneshot(post("/api/video/download", json!({ "url": VIDEO_URL }), "7.7.7.7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Video not available");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_analytics_requires_tracking() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(ScriptedResolver::new(Step::Metadata), dir.path(), 10));
    let response = app.oneshot(get("/api/analytics/stats", "8.8.8.8")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let usage = Arc::new(InMemoryUsage::new(Arc::new(SystemClock)));
    let app = router(
        state(ScriptedResolver::new(Step::Metadata), dir.path(), 10).with_usage(usage),
    );
    let response = app
        .clone()
        .oneshot(post("/api/video/info", json!({ "url": VIDEO_URL }), "8.8.8.8"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/api/analytics/stats", "8.8.8.8"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["summary"]["total_requests"], 1);
    assert_eq!(body["data"]["summary"]["successful_requests"], 1);
    assert_eq!(body["data"]["endpoint_stats"][0]["endpoint"], "/api/video/info");
    assert_eq!(body["data"]["endpoint_stats"][0]["total_requests"], 1);

    let response = app.oneshot(get("/api/health", "8.8.8.8")).await.unwrap();
    assert_eq!(json_body(response).await["usage_tracking"], "enabled");
}

#[tokio::test]
async fn test_service_routes() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(state(ScriptedResolver::new(Step::Metadata), dir.path(), 10));

    let response = app.clone().oneshot(get("/api/health", "9.9.9.9")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["usage_tracking"], "disabled");
    assert_eq!(body["active_downloads"], 0);

    let response = app
        .clone()
        .oneshot(get("/api/supported-platforms", "9.9.9.9"))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert!(body["platforms"]["youtube"].is_object());
    assert!(body["platforms"]["tiktok"].is_object());

    let response = app.clone().oneshot(get("/", "9.9.9.9")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/nope", "9.9.9.9")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Not found");
}
