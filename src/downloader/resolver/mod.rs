// Resolver capability - the only component that talks to the outside world
//
// The orchestrator drives a resolver through its cascades. Each call carries a
// full profile, so a resolver keeps no per-request state.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::errors::ResolveError;
use super::models::RawMediaResult;
use super::profiles::ExtractionProfile;

pub mod ytdlp;

pub use ytdlp::YtDlpResolver;

/// Where a download request should write its bytes: `<dir>/<stem>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub dir: PathBuf,
    pub stem: String,
}

impl DownloadTarget {
    pub fn new(dir: impl AsRef<Path>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            stem: stem.into(),
        }
    }

    /// yt-dlp output template
    pub fn output_template(&self) -> String {
        self.dir
            .join(format!("{}.%(ext)s", self.stem))
            .to_string_lossy()
            .to_string()
    }
}

#[async_trait]
pub trait Resolver: Send + Sync {
    /// Name of the resolver (for logging)
    fn name(&self) -> &'static str;

    /// Resolve `url` with one profile. With a target, the media is also
    /// downloaded and `RawMediaResult::local_path` points at the written file.
    async fn resolve(
        &self,
        url: &str,
        profile: &ExtractionProfile,
        target: Option<&DownloadTarget>,
    ) -> Result<RawMediaResult, ResolveError>;
}
