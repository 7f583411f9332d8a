// Platform classification for incoming URLs
//
// Pure lookups: which platform a URL belongs to, the catalogue served by
// /api/supported-platforms, and identifier recovery for URLs the extraction
// tool returned without an id.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    TikTok,
    Instagram,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::YouTube, Platform::TikTok, Platform::Instagram];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::TikTok => "tiktok",
            Self::Instagram => "instagram",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::YouTube => "YouTube",
            Self::TikTok => "TikTok",
            Self::Instagram => "Instagram",
        }
    }

    pub fn domains(&self) -> &'static [&'static str] {
        match self {
            Self::YouTube => &["youtube.com", "www.youtube.com", "youtu.be", "m.youtube.com"],
            Self::TikTok => &["tiktok.com", "www.tiktok.com", "vm.tiktok.com"],
            Self::Instagram => &["instagram.com", "www.instagram.com"],
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            Self::YouTube => "fab fa-youtube",
            Self::TikTok => "fab fa-tiktok",
            Self::Instagram => "fab fa-instagram",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            Self::YouTube => "#FF0000",
            Self::TikTok => "#000000",
            Self::Instagram => "#E4405F",
        }
    }

    /// Classify a URL by host. Subdomains of a supported domain match too.
    pub fn from_url(raw: &str) -> Option<Self> {
        let parsed = Url::parse(raw.trim()).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        let host = parsed.host_str()?.to_lowercase();

        Self::ALL.into_iter().find(|platform| {
            platform
                .domains()
                .iter()
                .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Entry of the supported-platforms catalogue
#[derive(Debug, Clone, Serialize)]
pub struct PlatformInfo {
    pub name: &'static str,
    pub domains: &'static [&'static str],
    pub icon: &'static str,
    pub color: &'static str,
}

pub fn catalogue() -> Vec<(&'static str, PlatformInfo)> {
    Platform::ALL
        .into_iter()
        .map(|p| {
            (
                p.tag(),
                PlatformInfo {
                    name: p.display_name(),
                    domains: p.domains(),
                    icon: p.icon(),
                    color: p.color(),
                },
            )
        })
        .collect()
}

/// Platform tag derived from the extraction tool's extractor name.
/// Unknown extractors keep their own (lower-cased) name.
pub fn tag_from_extractor(extractor: &str) -> String {
    let lower = extractor.to_lowercase();
    for platform in Platform::ALL {
        if lower.contains(platform.tag()) {
            return platform.tag().to_string();
        }
    }
    lower
}

lazy_static! {
    static ref TIKTOK_ID_PATTERNS: Vec<Regex> = [
        r"tiktok\.com.*?/video/(\d+)",
        r"vm\.tiktok\.com/([A-Za-z0-9]+)",
        r"vt\.tiktok\.com/([A-Za-z0-9]+)",
        r"/(\d{19,})",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect();
}

/// Identifier embedded in a TikTok URL (numeric video id or short-link code)
pub fn tiktok_video_id(url: &str) -> Option<String> {
    TIKTOK_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Identifier for a video whose metadata carried none.
///
/// TikTok URLs carry the id themselves; anything else gets a stable
/// 16-character id derived from the URL.
pub fn fallback_video_id(url: &str) -> String {
    if url.to_lowercase().contains("tiktok.com") {
        if let Some(id) = tiktok_video_id(url) {
            return id;
        }
    }
    let mut id = Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes())
        .simple()
        .to_string();
    id.truncate(16);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_supported_hosts() {
        assert_eq!(
            Platform::from_url("https://www.youtube.com/watch?v=abc"),
            Some(Platform::YouTube)
        );
        assert_eq!(Platform::from_url("https://youtu.be/abc"), Some(Platform::YouTube));
        assert_eq!(
            Platform::from_url("https://vm.tiktok.com/ZMabc123/"),
            Some(Platform::TikTok)
        );
        assert_eq!(
            Platform::from_url("https://www.instagram.com/reel/xyz/"),
            Some(Platform::Instagram)
        );
    }

    #[test]
    fn test_classify_rejects_lookalikes() {
        assert_eq!(Platform::from_url("https://notyoutube.com/watch"), None);
        assert_eq!(Platform::from_url("https://example.com/tiktok.com"), None);
        assert_eq!(Platform::from_url("ftp://youtube.com/x"), None);
        assert_eq!(Platform::from_url("not a url"), None);
    }

    #[test]
    fn test_tag_from_extractor() {
        assert_eq!(tag_from_extractor("youtube:tab"), "youtube");
        assert_eq!(tag_from_extractor("TikTok"), "tiktok");
        assert_eq!(tag_from_extractor("Instagram"), "instagram");
        assert_eq!(tag_from_extractor("Vimeo"), "vimeo");
    }

    #[test]
    fn test_tiktok_ids() {
        assert_eq!(
            tiktok_video_id("https://www.tiktok.com/@user/video/7234567890123456789").as_deref(),
            Some("7234567890123456789")
        );
        assert_eq!(
            tiktok_video_id("https://vm.tiktok.com/ZMabc123/").as_deref(),
            Some("ZMabc123")
        );
        assert_eq!(tiktok_video_id("https://www.tiktok.com/@user"), None);
    }

    #[test]
    fn test_fallback_id_is_stable() {
        let a = fallback_video_id("https://www.instagram.com/reel/xyz/");
        let b = fallback_video_id("https://www.instagram.com/reel/xyz/");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_catalogue_lists_every_platform() {
        let tags: Vec<_> = catalogue().into_iter().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec!["youtube", "tiktok", "instagram"]);
    }
}
