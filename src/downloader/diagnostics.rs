// Failure diagnostics - classifies tool error output for the logs
//
// Every failed cascade attempt is logged with one of these reasons so that an
// operator can tell a transient block (worth retrying later) from a permanent
// one, even though clients only ever see a generic "not found".

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// HTTP 403 Forbidden - usually a rejected user agent or missing referer
    Forbidden,

    /// Geographic restriction
    GeoBlocked,

    /// Network timeout or connection failure
    NetworkTimeout,

    /// Rate limiting (429 or similar)
    RateLimited,

    /// Captcha / bot wall
    BotDetection,

    /// Private video requiring authorization
    PrivateVideo,

    /// Login required (age gate, followers-only)
    LoginRequired,

    /// Video deleted or unavailable
    VideoUnavailable,

    /// URL not handled by any extractor
    UnsupportedUrl,

    /// Downloaded bytes were not media
    InvalidContent,

    Unknown,
}

impl FailureReason {
    /// A later attempt (other profile, later time) might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Forbidden
                | Self::NetworkTimeout
                | Self::RateLimited
                | Self::BotDetection
                | Self::InvalidContent
                | Self::Unknown
        )
    }

    /// No profile will get past this
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::PrivateVideo | Self::VideoUnavailable | Self::UnsupportedUrl
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Forbidden => "Access denied (HTTP 403)",
            Self::GeoBlocked => "Geographic restriction",
            Self::NetworkTimeout => "Network timeout",
            Self::RateLimited => "Rate limited by platform",
            Self::BotDetection => "Bot detection triggered",
            Self::PrivateVideo => "Private video",
            Self::LoginRequired => "Login required",
            Self::VideoUnavailable => "Video unavailable",
            Self::UnsupportedUrl => "Unsupported URL",
            Self::InvalidContent => "Downloaded content is not media",
            Self::Unknown => "Unknown failure",
        }
    }
}

/// Analyze error message and return the most specific reason
pub fn diagnose_error(error: &str) -> Option<FailureReason> {
    let lower = error.to_lowercase();

    if lower.contains("private video")
        || lower.contains("video is private")
        || lower.contains("this account is private")
    {
        return Some(FailureReason::PrivateVideo);
    }

    if lower.contains("video unavailable")
        || lower.contains("video has been removed")
        || lower.contains("no longer available")
        || lower.contains("video is unavailable")
        || lower.contains("http error 404")
    {
        return Some(FailureReason::VideoUnavailable);
    }

    if lower.contains("unsupported url") {
        return Some(FailureReason::UnsupportedUrl);
    }

    if lower.contains("sign in to confirm your age")
        || lower.contains("login required")
        || lower.contains("log in")
        || lower.contains("requested content is not available, rate-limit reached or login required")
    {
        return Some(FailureReason::LoginRequired);
    }

    if lower.contains("not available in your country")
        || lower.contains("blocked in your country")
        || lower.contains("geo restrict")
        || lower.contains("geo-restrict")
    {
        return Some(FailureReason::GeoBlocked);
    }

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(FailureReason::RateLimited);
    }

    if lower.contains("captcha") || lower.contains("unusual traffic") || lower.contains("not a bot") {
        return Some(FailureReason::BotDetection);
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return Some(FailureReason::Forbidden);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("network is unreachable")
    {
        return Some(FailureReason::NetworkTimeout);
    }

    if lower.contains("html") || lower.contains("too small") || lower.contains("validation") {
        return Some(FailureReason::InvalidContent);
    }

    if !error.is_empty() {
        return Some(FailureReason::Unknown);
    }

    None
}
