//! Server initialization and routing
//!
//! Router construction, middleware stack, background sweeps and graceful
//! shutdown.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use super::error::ApiError;
use super::routes::{api_info, artifacts, not_found, service, video};
use super::state::AppState;
use crate::config::AppConfig;
use crate::store::purge_stale_files;
use crate::sweeper::spawn_periodic;

/// Router options that come from configuration
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub enable_cors: bool,
    pub request_timeout: std::time::Duration,
}

impl From<&AppConfig> for RouterOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            enable_cors: config.enable_cors,
            request_timeout: config.request_timeout(),
        }
    }
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Build the router with all routes and middleware
pub fn build_router(state: Arc<AppState>, options: &RouterOptions) -> Router {
    let cors = if options.enable_cors {
        CorsLayer::new()
            .allow_origin(AnyOrigin)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/", get(api_info))
        .route("/api/health", get(service::health_check))
        .route("/api/supported-platforms", get(service::supported_platforms))
        .route("/api/rate-limit/status", get(service::rate_limit_status))
        .route("/api/analytics/stats", get(service::analytics_stats))
        // Video
        .route("/api/video/validate", post(video::validate_url))
        .route("/api/video/info", post(video::video_info))
        .route("/api/video/direct-url", post(video::direct_url))
        .route("/api/video/download", post(video::download))
        // Artifacts
        .route("/api/serve/{download_id}", get(artifacts::serve_artifact))
        .route(
            "/api/download/status/{download_id}",
            get(artifacts::download_status),
        )
        .fallback(not_found)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            options.request_timeout,
        ))
        .layer(cors)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(format!("handler panicked: {}", detail)).into_response()
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let result = if config.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Start the HTTP server and block until shutdown.
///
/// Both periodic sweeps run for the lifetime of the server and are cancelled
/// once it has stopped accepting requests.
pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    init_tracing(&config);

    tokio::fs::create_dir_all(&config.download_dir).await?;
    purge_leftovers(&config).await;
    let state = Arc::new(AppState::from_config(&config).await?);
    let app = build_router(state.clone(), &RouterOptions::from(&config));
    let addr: SocketAddr = config.socket_addr()?;

    let cancel = CancellationToken::new();
    let store = state.store.clone();
    let store_sweeper = spawn_periodic(
        "artifact-sweep",
        config.sweep_interval(),
        cancel.clone(),
        move || store.sweep(),
    );
    let limiter = state.limiter.clone();
    let limiter_sweeper = spawn_periodic(
        "limiter-sweep",
        config.limiter_sweep_interval(),
        cancel.clone(),
        move || limiter.sweep(),
    );

    tracing::info!("Starting Video Downloader API on {}", addr);
    tracing::info!(
        "Rate limit: {} requests per {}s, retention: {}h",
        config.rate_limit_max_requests,
        config.rate_limit_window_secs,
        config.retention_hours
    );
    tracing::info!(
        download_dir = %config.download_dir.display(),
        cors = config.enable_cors,
        usage_tracking = config.usage_tracking,
        "Configuration loaded"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    cancel.cancel();
    let _ = tokio::join!(store_sweeper, limiter_sweeper);
    served?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Remove files a previous run left behind once they are past retention
async fn purge_leftovers(config: &AppConfig) {
    let dir = config.download_dir.clone();
    let retention = config.retention();
    match tokio::task::spawn_blocking(move || purge_stale_files(&dir, retention)).await {
        Ok(Ok(0)) => {}
        Ok(Ok(removed)) => tracing::info!(removed, "Removed stale files from a previous run"),
        Ok(Err(e)) => tracing::warn!(error = %e, "Failed to scan download directory"),
        Err(e) => tracing::warn!(error = %e, "Startup cleanup task failed"),
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
