// Extraction profiles and the per-operation cascades built from them
//
// A profile is one complete yt-dlp configuration: headers, timeouts, retry
// counts, format selector and platform hints. Each operation tries its
// profiles in order until one works, so the order below matters: the first
// entry is the richest configuration, the last is the bare minimum.

use crate::platform::Platform;

use super::quality::{Quality, DEFAULT_CEILING};

/// Socket timeout used by the slower fallback profiles
pub const EXTENDED_SOCKET_TIMEOUT: u32 = 60;

pub const CHROME_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36"),
    ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8"),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("Sec-Ch-Ua", "\"Chromium\";v=\"122\", \"Not(A:Brand\";v=\"24\", \"Google Chrome\";v=\"122\""),
    ("Sec-Ch-Ua-Mobile", "?0"),
    ("Sec-Ch-Ua-Platform", "\"Windows\""),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Sec-Fetch-User", "?1"),
    ("Upgrade-Insecure-Requests", "1"),
];

pub const UPDATED_BROWSER_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36"),
    ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"),
    ("Accept-Language", "en-US,en;q=0.5"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("DNT", "1"),
    ("Connection", "keep-alive"),
    ("Upgrade-Insecure-Requests", "1"),
];

pub const PLAIN_BROWSER_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36"),
    ("Accept", "*/*"),
    ("Accept-Language", "en-US,en;q=0.9"),
];

pub const TIKTOK_MOBILE_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1"),
    ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Referer", "https://www.tiktok.com/"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
];

pub const TIKTOK_APP_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "TikTok 26.2.0 rv:262018 (iPhone; iOS 14.4.2; en_US) Cronet"),
    ("Accept", "*/*"),
    ("Accept-Language", "en-US,en;q=0.9"),
];

pub const TIKTOK_CRAWLER_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"),
    ("Accept", "*/*"),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Referer", "https://www.tiktok.com/"),
];

pub const TIKTOK_API_HOSTNAME: &str = "api.tiktokv.com";

/// Site-specific extractor arguments (`--extractor-args site:key=value;...`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformHint {
    pub extractor: &'static str,
    pub args: Vec<(&'static str, String)>,
}

impl PlatformHint {
    /// TikTok private API hostname, optionally with a page download timeout
    pub fn tiktok(webpage_download_timeout: Option<u32>) -> Self {
        let mut args = vec![("api_hostname", TIKTOK_API_HOSTNAME.to_string())];
        if let Some(timeout) = webpage_download_timeout {
            args.push(("webpage_download_timeout", timeout.to_string()));
        }
        Self {
            extractor: "tiktok",
            args,
        }
    }

    pub fn to_arg(&self) -> String {
        let pairs: Vec<String> = self
            .args
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}:{}", self.extractor, pairs.join(";"))
    }
}

/// Configuration for one extraction attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionProfile {
    /// Short name used in logs
    pub name: &'static str,
    /// 1-based position inside its cascade, assigned by `Cascade::new`
    pub rank: usize,
    /// yt-dlp format selector
    pub format: String,
    pub headers: Vec<(String, String)>,
    /// `None` leaves the tool default in place
    pub socket_timeout_secs: Option<u32>,
    pub retries: Option<u32>,
    pub fragment_retries: Option<u32>,
    pub no_check_certificate: bool,
    /// Keep going on per-item errors instead of aborting
    pub ignore_errors: bool,
    pub no_cookies: bool,
    pub hints: Vec<PlatformHint>,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    /// Wall-clock budget for the whole tool invocation
    pub deadline_secs: u64,
}

impl Default for ExtractionProfile {
    fn default() -> Self {
        Self {
            name: "default",
            rank: 0,
            format: "best".to_string(),
            headers: Vec::new(),
            socket_timeout_secs: None,
            retries: None,
            fragment_retries: None,
            no_check_certificate: false,
            ignore_errors: false,
            no_cookies: false,
            hints: Vec::new(),
            proxy: None,
            deadline_secs: 120,
        }
    }
}

impl ExtractionProfile {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_headers(mut self, headers: &[(&str, &str)]) -> Self {
        self.headers = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    pub fn with_socket_timeout(mut self, seconds: u32) -> Self {
        self.socket_timeout_secs = Some(seconds);
        self
    }

    pub fn with_retries(mut self, retries: u32, fragment_retries: Option<u32>) -> Self {
        self.retries = Some(retries);
        self.fragment_retries = fragment_retries;
        self
    }

    pub fn with_no_check_certificate(mut self, enabled: bool) -> Self {
        self.no_check_certificate = enabled;
        self
    }

    pub fn with_ignore_errors(mut self, enabled: bool) -> Self {
        self.ignore_errors = enabled;
        self
    }

    pub fn with_no_cookies(mut self, enabled: bool) -> Self {
        self.no_cookies = enabled;
        self
    }

    pub fn with_hint(mut self, hint: Option<PlatformHint>) -> Self {
        self.hints.extend(hint);
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_deadline(mut self, seconds: u64) -> Self {
        self.deadline_secs = seconds;
        self
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("user-agent"))
            .map(|(_, v)| v.as_str())
    }
}

/// Knobs shared by every cascade
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeSettings {
    /// Socket timeout of the primary profile
    pub socket_timeout_secs: u32,
    /// Deadline for metadata-only invocations
    pub info_deadline_secs: u64,
    /// Deadline for invocations that download bytes
    pub download_deadline_secs: u64,
    pub proxy: Option<String>,
}

impl Default for CascadeSettings {
    fn default() -> Self {
        Self {
            socket_timeout_secs: 30,
            info_deadline_secs: 120,
            download_deadline_secs: 600,
            proxy: None,
        }
    }
}

impl CascadeSettings {
    fn finish(&self, profiles: Vec<ExtractionProfile>, deadline: u64) -> Vec<ExtractionProfile> {
        profiles
            .into_iter()
            .map(|p| p.with_proxy(self.proxy.clone()).with_deadline(deadline))
            .collect()
    }

    /// Richest configuration: browser headers, retries and the platform hint
    fn primary(&self, platform: Option<Platform>, format: String) -> ExtractionProfile {
        let hint = (platform == Some(Platform::TikTok)).then(|| PlatformHint::tiktok(Some(60)));
        ExtractionProfile::new("default")
            .with_format(format)
            .with_headers(CHROME_HEADERS)
            .with_socket_timeout(self.socket_timeout_secs)
            .with_retries(3, Some(3))
            .with_no_check_certificate(true)
            .with_hint(hint)
    }

    pub fn info_profiles(&self, platform: Option<Platform>) -> Vec<ExtractionProfile> {
        let profiles = vec![
            self.primary(platform, "best".to_string()),
            ExtractionProfile::new("updated-headers")
                .with_headers(UPDATED_BROWSER_HEADERS)
                .with_socket_timeout(EXTENDED_SOCKET_TIMEOUT)
                .with_retries(3, None),
            ExtractionProfile::new("minimal")
                .with_ignore_errors(true)
                .with_no_check_certificate(true),
            ExtractionProfile::new("no-cookies")
                .with_ignore_errors(true)
                .with_no_check_certificate(true)
                .with_no_cookies(true),
        ];
        self.finish(profiles, self.info_deadline_secs)
    }

    pub fn direct_url_profiles(
        &self,
        platform: Option<Platform>,
        quality: Quality,
    ) -> Vec<ExtractionProfile> {
        let profiles = vec![
            self.primary(platform, quality.format_selector()),
            ExtractionProfile::new("minimal")
                .with_format(ceiling_fallback())
                .with_ignore_errors(true)
                .with_no_check_certificate(true),
            ExtractionProfile::new("updated-headers")
                .with_format(ceiling_fallback())
                .with_headers(PLAIN_BROWSER_HEADERS)
                .with_ignore_errors(true)
                .with_no_check_certificate(true),
            ExtractionProfile::new("basic").with_format("worst/best"),
        ];
        self.finish(profiles, self.info_deadline_secs)
    }

    /// Download cascade. TikTok swaps the generic minimal profile for three
    /// app/mobile emulation profiles and uses a crawler identity afterwards.
    pub fn materialize_profiles(
        &self,
        platform: Option<Platform>,
        quality: Quality,
    ) -> Vec<ExtractionProfile> {
        let mut profiles = vec![self.primary(platform, quality.format_selector())];

        if platform == Some(Platform::TikTok) {
            profiles.extend(tiktok_profiles());
            profiles.push(
                ExtractionProfile::new("updated-headers")
                    .with_headers(TIKTOK_CRAWLER_HEADERS)
                    .with_ignore_errors(true)
                    .with_no_check_certificate(true)
                    .with_hint(Some(PlatformHint::tiktok(None))),
            );
        } else {
            profiles.push(
                ExtractionProfile::new("minimal")
                    .with_format(ceiling_fallback())
                    .with_ignore_errors(true)
                    .with_no_check_certificate(true),
            );
            profiles.push(
                ExtractionProfile::new("updated-headers")
                    .with_format(ceiling_fallback())
                    .with_headers(PLAIN_BROWSER_HEADERS)
                    .with_ignore_errors(true)
                    .with_no_check_certificate(true),
            );
        }

        profiles.push(ExtractionProfile::new("basic").with_format("worst/best"));
        self.finish(profiles, self.download_deadline_secs)
    }
}

/// Mobile web, app API and generic low-quality TikTok profiles
fn tiktok_profiles() -> Vec<ExtractionProfile> {
    vec![
        ExtractionProfile::new("tiktok-mobile")
            .with_headers(TIKTOK_MOBILE_HEADERS)
            .with_ignore_errors(true)
            .with_no_check_certificate(true),
        ExtractionProfile::new("tiktok-api")
            .with_headers(TIKTOK_APP_HEADERS)
            .with_ignore_errors(true)
            .with_no_check_certificate(true)
            .with_hint(Some(PlatformHint::tiktok(Some(30)))),
        ExtractionProfile::new("tiktok-generic")
            .with_format("worst/best")
            .with_ignore_errors(true)
            .with_socket_timeout(EXTENDED_SOCKET_TIMEOUT)
            .with_retries(1, None),
    ]
}

fn ceiling_fallback() -> String {
    Quality::Ceiling(DEFAULT_CEILING).format_selector()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(profiles: &[ExtractionProfile]) -> Vec<&'static str> {
        profiles.iter().map(|p| p.name).collect()
    }

    #[test]
    fn test_info_cascade_order() {
        let profiles = CascadeSettings::default().info_profiles(Some(Platform::YouTube));
        assert_eq!(
            names(&profiles),
            vec!["default", "updated-headers", "minimal", "no-cookies"]
        );
        assert_eq!(profiles[0].socket_timeout_secs, Some(30));
        assert!(profiles[0].hints.is_empty());
        assert!(profiles[3].no_cookies);
    }

    #[test]
    fn test_tiktok_primary_profile_carries_hint() {
        let profiles = CascadeSettings::default().info_profiles(Some(Platform::TikTok));
        assert_eq!(
            profiles[0].hints[0].to_arg(),
            "tiktok:api_hostname=api.tiktokv.com;webpage_download_timeout=60"
        );
    }

    #[test]
    fn test_direct_url_uses_requested_quality_first() {
        let profiles =
            CascadeSettings::default().direct_url_profiles(None, Quality::parse("480p"));
        assert_eq!(profiles[0].format, "best[height<=480]/best");
        assert_eq!(profiles[1].format, "best[height<=720]/best");
        assert_eq!(profiles.last().map(|p| p.format.as_str()), Some("worst/best"));
    }

    #[test]
    fn test_materialize_cascade_generic() {
        let profiles =
            CascadeSettings::default().materialize_profiles(Some(Platform::Instagram), Quality::Best);
        assert_eq!(
            names(&profiles),
            vec!["default", "minimal", "updated-headers", "basic"]
        );
        assert!(profiles.iter().all(|p| p.deadline_secs == 600));
    }

    #[test]
    fn test_materialize_cascade_tiktok() {
        let profiles =
            CascadeSettings::default().materialize_profiles(Some(Platform::TikTok), Quality::Best);
        assert_eq!(
            names(&profiles),
            vec![
                "default",
                "tiktok-mobile",
                "tiktok-api",
                "tiktok-generic",
                "updated-headers",
                "basic"
            ]
        );
        assert!(profiles[1].user_agent().unwrap_or("").contains("iPhone"));
        assert_eq!(
            profiles[2].hints[0].to_arg(),
            "tiktok:api_hostname=api.tiktokv.com;webpage_download_timeout=30"
        );
        assert!(profiles[4].user_agent().unwrap_or("").contains("Googlebot"));
    }

    #[test]
    fn test_proxy_applied_to_every_profile() {
        let settings = CascadeSettings {
            proxy: Some("socks5h://127.0.0.1:1080".to_string()),
            ..Default::default()
        };
        assert!(settings
            .info_profiles(None)
            .iter()
            .all(|p| p.proxy.as_deref() == Some("socks5h://127.0.0.1:1080")));
    }
}
