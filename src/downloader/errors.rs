// Error types for the extraction pipeline
//
// ResolveError describes one failed resolver invocation. ExtractionError is
// what the orchestrator reports once a whole cascade is exhausted.

use std::fmt;

/// Failure of a single resolver attempt
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// Socket/connection failure or the per-attempt deadline elapsed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The site reports the video as missing, private or region-locked
    #[error("Video unavailable: {0}")]
    Unavailable(String),

    /// yt-dlp binary is not installed or not runnable
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Failed to parse yt-dlp JSON output
    #[error("Parse error: {0}")]
    Parse(String),

    /// The tool finished but produced nothing usable
    #[error("Unusable result: {0}")]
    Unusable(String),

    #[error("Extraction failed: {0}")]
    Failed(String),
}

impl ResolveError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

// Classify raw tool output
impl From<String> for ResolveError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        if lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("connection reset")
            || lower.contains("connection refused")
            || lower.contains("network is unreachable")
            || lower.contains("temporary failure in name resolution")
        {
            return Self::Transport(s);
        }

        if lower.contains("video unavailable")
            || lower.contains("private video")
            || lower.contains("video is private")
            || lower.contains("not available in your country")
            || lower.contains("has been removed")
            || lower.contains("http error 404")
        {
            return Self::Unavailable(s);
        }

        if lower.contains("command not found")
            || lower.contains("no such file or directory")
            || lower.contains("failed to start")
        {
            return Self::ToolNotFound(s);
        }

        if lower.contains("invalid json") || lower.contains("parse") {
            return Self::Parse(s);
        }

        Self::Failed(s)
    }
}

/// Internal failure code of an exhausted cascade.
/// Callers see all three the same way; the distinction is kept for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Video missing/private/blocked, or attempts failed for mixed reasons
    NotFound,
    /// Every attempt failed on transport
    Transport,
    /// Every attempt produced a file that failed content validation
    Validation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Transport => write!(f, "transport"),
            Self::Validation => write!(f, "validation"),
        }
    }
}

/// Every profile of a cascade failed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{operation}: all {attempts} profiles failed ({kind}); last error: {last_error}")]
pub struct ExtractionError {
    pub operation: &'static str,
    pub kind: FailureKind,
    pub attempts: usize,
    pub last_error: String,
}
