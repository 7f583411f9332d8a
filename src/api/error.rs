use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced at the request boundary.
///
/// Resolution failures are deliberately uniform: the client learns that the
/// video could not be retrieved, never whether it was private, blocked or
/// the extraction tool timed out.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Too many requests. Please wait before making another request.")]
    AdmissionDenied,

    #[error("URL is required in request body")]
    MissingUrl,

    #[error("URL cannot be empty")]
    EmptyUrl,

    #[error("URL must be from YouTube, TikTok, or Instagram")]
    UnsupportedPlatform,

    #[error("Could not retrieve video information. The video may be private or unavailable.")]
    VideoNotFound,

    #[error("Could not get direct download URL. The video may be private or unavailable.")]
    LinkUnavailable,

    #[error("Could not download video. The video may be private or unavailable.")]
    DownloadUnavailable,

    #[error("Download has expired")]
    ArtifactExpired,

    #[error("Download ID not found or expired")]
    ArtifactMissing,

    #[error("Analytics require usage tracking to be enabled")]
    AnalyticsUnavailable,

    #[error("The requested endpoint does not exist")]
    RouteNotFound,

    /// Detail is logged, never returned
    #[error("An error occurred while processing your request")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::AdmissionDenied => StatusCode::TOO_MANY_REQUESTS,
            ApiError::MissingUrl | ApiError::EmptyUrl | ApiError::UnsupportedPlatform => {
                StatusCode::BAD_REQUEST
            }
            ApiError::VideoNotFound
            | ApiError::LinkUnavailable
            | ApiError::DownloadUnavailable
            | ApiError::ArtifactExpired
            | ApiError::ArtifactMissing
            | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::AnalyticsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short title in the `error` field
    fn title(&self) -> &'static str {
        match self {
            ApiError::AdmissionDenied => "Rate limit exceeded",
            ApiError::MissingUrl => "Invalid request",
            ApiError::EmptyUrl => "Invalid URL",
            ApiError::UnsupportedPlatform => "Unsupported platform",
            ApiError::VideoNotFound => "Video not found",
            ApiError::LinkUnavailable | ApiError::DownloadUnavailable => "Video not available",
            ApiError::ArtifactExpired => "Download expired",
            ApiError::ArtifactMissing => "Download not found",
            ApiError::AnalyticsUnavailable => "Analytics not available",
            ApiError::RouteNotFound => "Not found",
            ApiError::Internal(_) => "Server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(detail = %detail, "Internal error");
        }

        let status = self.status_code();
        let body = Json(json!({
            "error": self.title(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Expired => ApiError::ArtifactExpired,
            StoreError::NotFound => ApiError::ArtifactMissing,
            StoreError::Io(e) => ApiError::Internal(format!("artifact I/O: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::AdmissionDenied.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::UnsupportedPlatform.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::DownloadUnavailable.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::AnalyticsUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_internal_hides_detail() {
        let err = ApiError::Internal("disk on fire at /srv/x".to_string());
        assert!(!err.to_string().contains("/srv/x"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_errors_map() {
        assert!(matches!(ApiError::from(StoreError::Expired), ApiError::ArtifactExpired));
        assert!(matches!(ApiError::from(StoreError::NotFound), ApiError::ArtifactMissing));
    }
}
