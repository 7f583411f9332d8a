use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use time::OffsetDateTime;

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::ClientIp;
use crate::api::state::AppState;
use crate::platform::catalogue;

/// GET /api/health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let usage_tracking = if state.usage.is_tracking() {
        "enabled"
    } else {
        "disabled"
    };
    Json(json!({
        "status": "healthy",
        "timestamp": OffsetDateTime::now_utc().unix_timestamp(),
        "service": "Video Downloader API",
        "usage_tracking": usage_tracking,
        "active_downloads": state.store.len(),
    }))
}

/// GET /api/supported-platforms
pub async fn supported_platforms() -> Json<Value> {
    let platforms: BTreeMap<_, _> = catalogue().into_iter().collect();
    Json(json!({
        "success": true,
        "platforms": platforms,
    }))
}

/// GET /api/rate-limit/status
pub async fn rate_limit_status(
    State(state): State<Arc<AppState>>,
    ClientIp(client): ClientIp,
) -> Json<Value> {
    let stats = state.limiter.stats(&client);
    Json(json!({
        "client_ip": client,
        "rate_limit": stats,
    }))
}

/// GET /api/analytics/stats
pub async fn analytics_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let snapshot = state
        .usage
        .snapshot()
        .ok_or(ApiError::AnalyticsUnavailable)?;
    Ok(Json(json!({
        "success": true,
        "data": snapshot,
    })))
}
