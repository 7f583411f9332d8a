// Data models shared by the resolver, the orchestrator and the HTTP layer

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::utils::format_duration;
use crate::platform;

/// One rendition as reported by the extraction tool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFormat {
    pub format_id: Option<String>,
    pub url: Option<String>,
    pub ext: Option<String>,
    pub quality: Option<f64>,
    pub resolution: Option<String>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
    pub format_note: Option<String>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
}

/// Unnormalized result of one resolver invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMediaResult {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub uploader: Option<String>,
    pub duration: Option<f64>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub upload_date: Option<String>,
    pub thumbnail: Option<String>,
    pub webpage_url: Option<String>,
    /// Name of the site extractor that handled the URL
    pub extractor: Option<String>,
    /// Fetchable URL of the selected rendition, when the tool resolved one
    pub url: Option<String>,
    pub ext: Option<String>,
    pub format_id: Option<String>,
    pub resolution: Option<String>,
    pub fps: Option<f64>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
    pub formats: Vec<RawFormat>,
    /// Local file written by the tool, set only for download requests
    pub local_path: Option<PathBuf>,
}

impl RawMediaResult {
    pub fn title_or_default(&self) -> String {
        self.title.clone().unwrap_or_else(|| "Unknown Title".to_string())
    }

    pub fn platform_tag(&self) -> String {
        platform::tag_from_extractor(self.extractor.as_deref().unwrap_or(""))
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration.map(|d| d.max(0.0) as u64).unwrap_or(0)
    }

    /// URL to hand out for direct fetching.
    ///
    /// Prefers the top-level `url`; otherwise takes the *last* entry of the
    /// format list. The tool does not promise that list is ordered by quality,
    /// so the fallback is only a positional pick.
    pub fn fetchable_url(&self) -> Option<&str> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return Some(url);
        }
        self.formats
            .last()
            .and_then(|f| f.url.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// Format descriptor exposed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub format_id: String,
    pub quality: f64,
    pub resolution: String,
    pub fps: f64,
    pub file_extension: String,
    pub file_size: u64,
    pub format_note: String,
    pub vcodec: String,
    pub acodec: String,
}

impl From<&RawFormat> for FormatDescriptor {
    fn from(f: &RawFormat) -> Self {
        Self {
            format_id: f.format_id.clone().unwrap_or_default(),
            quality: f.quality.unwrap_or(0.0),
            resolution: f.resolution.clone().unwrap_or_else(|| "Unknown".to_string()),
            fps: f.fps.unwrap_or(0.0),
            file_extension: f.ext.clone().unwrap_or_else(|| "mp4".to_string()),
            file_size: f.filesize.or(f.filesize_approx).unwrap_or(0),
            format_note: f.format_note.clone().unwrap_or_default(),
            vcodec: f.vcodec.clone().unwrap_or_else(|| "none".to_string()),
            acodec: f.acodec.clone().unwrap_or_else(|| "none".to_string()),
        }
    }
}

/// Normalized view of a resolved video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub uploader: String,
    /// Duration in seconds
    pub duration: u64,
    pub duration_string: String,
    pub view_count: u64,
    pub like_count: u64,
    pub upload_date: String,
    pub thumbnail: String,
    pub webpage_url: String,
    pub platform: String,
    pub formats: Vec<FormatDescriptor>,
}

impl MediaMetadata {
    /// Normalize a raw result. `request_url` fills in the canonical URL and
    /// the identifier when the tool omitted them.
    pub fn from_raw(raw: &RawMediaResult, request_url: &str) -> Self {
        let video_id = raw
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| platform::fallback_video_id(request_url));
        let duration = raw.duration_secs();

        Self {
            video_id,
            title: raw.title_or_default(),
            description: raw.description.clone().unwrap_or_default(),
            uploader: raw.uploader.clone().unwrap_or_else(|| "Unknown".to_string()),
            duration,
            duration_string: format_duration(duration),
            view_count: raw.view_count.unwrap_or(0),
            like_count: raw.like_count.unwrap_or(0),
            upload_date: raw.upload_date.clone().unwrap_or_default(),
            thumbnail: raw.thumbnail.clone().unwrap_or_default(),
            webpage_url: raw
                .webpage_url
                .clone()
                .unwrap_or_else(|| request_url.to_string()),
            platform: raw.platform_tag(),
            formats: raw.formats.iter().map(FormatDescriptor::from).collect(),
        }
    }
}

/// A fetchable link for the requested quality
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectLink {
    pub title: String,
    pub download_url: String,
    pub file_extension: String,
    pub file_size: u64,
    pub quality: String,
    pub format_id: String,
    pub resolution: String,
    pub fps: f64,
    pub duration: u64,
    pub thumbnail: String,
    pub platform: String,
    #[serde(skip)]
    pub metadata: MediaMetadata,
}

impl DirectLink {
    /// None when the raw result carries no fetchable URL
    pub fn from_raw(raw: &RawMediaResult, request_url: &str, quality: &str) -> Option<Self> {
        let download_url = raw.fetchable_url()?.to_string();
        let metadata = MediaMetadata::from_raw(raw, request_url);

        Some(Self {
            title: metadata.title.clone(),
            download_url,
            file_extension: raw.ext.clone().unwrap_or_else(|| "mp4".to_string()),
            file_size: raw.filesize.or(raw.filesize_approx).unwrap_or(0),
            quality: quality.to_string(),
            format_id: raw.format_id.clone().unwrap_or_default(),
            resolution: raw.resolution.clone().unwrap_or_else(|| "Unknown".to_string()),
            fps: raw.fps.unwrap_or(0.0),
            duration: metadata.duration,
            thumbnail: metadata.thumbnail.clone(),
            platform: metadata.platform.clone(),
            metadata,
        })
    }
}

/// A validated file written to local storage, ready to be registered
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedFile {
    pub path: PathBuf,
    pub file_size: u64,
    /// Extension of the file actually on disk
    pub file_extension: String,
    pub format_id: String,
    pub resolution: String,
    pub fps: f64,
    pub metadata: MediaMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_format(id: &str, url: Option<&str>) -> RawFormat {
        RawFormat {
            format_id: Some(id.to_string()),
            url: url.map(|u| u.to_string()),
            ext: Some("mp4".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_metadata_defaults() {
        let raw = RawMediaResult {
            extractor: Some("TikTok".to_string()),
            ..Default::default()
        };
        let url = "https://www.tiktok.com/@someone/video/7234567890123456789";
        let meta = MediaMetadata::from_raw(&raw, url);

        assert_eq!(meta.title, "Unknown Title");
        assert_eq!(meta.uploader, "Unknown");
        assert_eq!(meta.webpage_url, url);
        assert_eq!(meta.platform, "tiktok");
        assert_eq!(meta.video_id, "7234567890123456789");
        assert_eq!(meta.duration_string, "00:00");
    }

    #[test]
    fn test_metadata_keeps_reported_fields() {
        let raw = RawMediaResult {
            id: Some("abc".to_string()),
            title: Some("Clip".to_string()),
            duration: Some(75.6),
            view_count: Some(12),
            extractor: Some("youtube:tab".to_string()),
            formats: vec![raw_format("18", None)],
            ..Default::default()
        };
        let meta = MediaMetadata::from_raw(&raw, "https://youtu.be/abc");

        assert_eq!(meta.video_id, "abc");
        assert_eq!(meta.duration, 75);
        assert_eq!(meta.duration_string, "01:15");
        assert_eq!(meta.platform, "youtube");
        assert_eq!(meta.formats.len(), 1);
        assert_eq!(meta.formats[0].resolution, "Unknown");
    }

    #[test]
    fn test_fetchable_url_prefers_top_level() {
        let raw = RawMediaResult {
            url: Some("https://cdn/top.mp4".to_string()),
            formats: vec![raw_format("1", Some("https://cdn/1.mp4"))],
            ..Default::default()
        };
        assert_eq!(raw.fetchable_url(), Some("https://cdn/top.mp4"));
    }

    #[test]
    fn test_fetchable_url_falls_back_to_last_format() {
        let raw = RawMediaResult {
            formats: vec![
                raw_format("1", Some("https://cdn/1.mp4")),
                raw_format("2", Some("https://cdn/2.mp4")),
            ],
            ..Default::default()
        };
        assert_eq!(raw.fetchable_url(), Some("https://cdn/2.mp4"));
    }

    #[test]
    fn test_direct_link_requires_url() {
        let raw = RawMediaResult {
            formats: vec![raw_format("1", None)],
            ..Default::default()
        };
        assert!(DirectLink::from_raw(&raw, "https://youtu.be/x", "best").is_none());
    }
}
