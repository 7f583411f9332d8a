use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tokio_util::io::ReaderStream;

use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /api/serve/{download_id}
pub async fn serve_artifact(
    State(state): State<Arc<AppState>>,
    Path(ticket): Path<String>,
) -> ApiResult<Response> {
    let served = state.store.serve(&ticket).await?;

    let body = Body::from_stream(ReaderStream::new(served.file));
    let disposition = format!("attachment; filename=\"{}\"", served.file_name);

    Ok((
        [
            (CONTENT_TYPE, "application/octet-stream".to_string()),
            (CONTENT_DISPOSITION, disposition),
            (CONTENT_LENGTH, served.file_size.to_string()),
        ],
        body,
    )
        .into_response())
}

/// GET /api/download/status/{download_id}
pub async fn download_status(
    State(state): State<Arc<AppState>>,
    Path(ticket): Path<String>,
) -> ApiResult<Json<Value>> {
    let status = state.store.status_of(&ticket)?;
    Ok(Json(json!({
        "success": true,
        "data": status,
    })))
}
