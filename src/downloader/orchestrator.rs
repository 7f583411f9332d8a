// Extraction orchestrator with fallback logic
//
// Each operation builds its cascade for the URL's platform and hands the
// cascade a closure performing one attempt. The closure decides what counts
// as success for that operation; the cascade does the ordering and logging.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use super::cascade::{AttemptOutcome, Cascade};
use super::errors::{ExtractionError, ResolveError};
use super::models::{DirectLink, MaterializedFile, MediaMetadata};
use super::profiles::{CascadeSettings, ExtractionProfile};
use super::quality::Quality;
use super::resolver::{DownloadTarget, Resolver};
use super::utils::{remove_quietly, FALLBACK_EXTENSIONS};
use super::validation::validate_file;
use crate::platform::Platform;

pub struct ExtractionOrchestrator {
    resolver: Arc<dyn Resolver>,
    download_dir: PathBuf,
    settings: CascadeSettings,
}

impl ExtractionOrchestrator {
    pub fn new(
        resolver: Arc<dyn Resolver>,
        download_dir: impl Into<PathBuf>,
        settings: CascadeSettings,
    ) -> Self {
        Self {
            resolver,
            download_dir: download_dir.into(),
            settings,
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn info_cascade(&self, url: &str) -> Cascade {
        Cascade::new("info", self.settings.info_profiles(Platform::from_url(url)))
    }

    pub fn direct_url_cascade(&self, url: &str, quality: Quality) -> Cascade {
        Cascade::new(
            "direct-url",
            self.settings.direct_url_profiles(Platform::from_url(url), quality),
        )
    }

    pub fn materialize_cascade(&self, url: &str, quality: Quality) -> Cascade {
        Cascade::new(
            "materialize",
            self.settings.materialize_profiles(Platform::from_url(url), quality),
        )
    }

    /// Video metadata without downloading
    pub async fn resolve_info(&self, url: &str) -> Result<MediaMetadata, ExtractionError> {
        let cascade = self.info_cascade(url);
        cascade
            .run(url, move |profile| async move {
                match self.resolver.resolve(url, &profile, None).await {
                    Ok(raw) => AttemptOutcome::Success(MediaMetadata::from_raw(&raw, url)),
                    Err(e) => AttemptOutcome::Failed(e),
                }
            })
            .await
    }

    /// A fetchable link for `quality_label` without downloading
    pub async fn resolve_direct_url(
        &self,
        url: &str,
        quality_label: &str,
    ) -> Result<DirectLink, ExtractionError> {
        let cascade = self.direct_url_cascade(url, Quality::parse(quality_label));
        cascade
            .run(url, move |profile| async move {
                match self.resolver.resolve(url, &profile, None).await {
                    Ok(raw) => match DirectLink::from_raw(&raw, url, quality_label) {
                        Some(link) => AttemptOutcome::Success(link),
                        None => AttemptOutcome::Failed(ResolveError::Unusable(
                            "no fetchable URL in result".to_string(),
                        )),
                    },
                    Err(e) => AttemptOutcome::Failed(e),
                }
            })
            .await
    }

    /// Download the video into the download directory and validate it
    pub async fn materialize(
        &self,
        url: &str,
        quality_label: &str,
    ) -> Result<MaterializedFile, ExtractionError> {
        if let Err(e) = tokio::fs::create_dir_all(&self.download_dir).await {
            tracing::error!(dir = %self.download_dir.display(), error = %e, "Cannot create download directory");
        }

        let cascade = self.materialize_cascade(url, Quality::parse(quality_label));
        cascade
            .run(url, move |profile| self.materialize_attempt(url, profile))
            .await
    }

    async fn materialize_attempt(
        &self,
        url: &str,
        profile: ExtractionProfile,
    ) -> AttemptOutcome<MaterializedFile> {
        let target = DownloadTarget::new(&self.download_dir, Uuid::new_v4().simple().to_string());

        let raw = match self.resolver.resolve(url, &profile, Some(&target)).await {
            Ok(raw) => raw,
            Err(e) => {
                discard_partial(&target).await;
                return AttemptOutcome::Failed(e);
            }
        };

        let Some(path) = raw.local_path.clone() else {
            discard_partial(&target).await;
            return AttemptOutcome::Failed(ResolveError::Unusable(
                "resolver reported no local file".to_string(),
            ));
        };

        match validate_file(&path).await {
            Ok((file_size, container)) => {
                tracing::debug!(path = %path.display(), file_size, ?container, "Download validated");
                let file_extension = path
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .or_else(|| raw.ext.clone())
                    .unwrap_or_else(|| "mp4".to_string());

                AttemptOutcome::Success(MaterializedFile {
                    file_size,
                    file_extension,
                    format_id: raw.format_id.clone().unwrap_or_default(),
                    resolution: raw.resolution.clone().unwrap_or_else(|| "Unknown".to_string()),
                    fps: raw.fps.unwrap_or(0.0),
                    metadata: MediaMetadata::from_raw(&raw, url),
                    path,
                })
            }
            Err(rejection) => {
                remove_quietly(&path).await;
                AttemptOutcome::Invalid(format!("{}: {}", path.display(), rejection))
            }
        }
    }
}

/// Remove whatever a failed download left behind under the target stem
async fn discard_partial(target: &DownloadTarget) {
    for ext in FALLBACK_EXTENSIONS.iter().chain(["part", "ytdl"].iter()) {
        let path = target.dir.join(format!("{}.{}", target.stem, ext));
        if path.exists() {
            remove_quietly(&path).await;
        }
    }
}
