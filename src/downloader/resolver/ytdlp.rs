// yt-dlp resolver - runs the native `yt-dlp` binary
//
// One invocation per attempt. Metadata comes from `--dump-json`; for download
// requests `--no-simulate` makes the same invocation also write the file.

use async_trait::async_trait;

use super::{DownloadTarget, Resolver};
use crate::downloader::errors::ResolveError;
use crate::downloader::models::{RawFormat, RawMediaResult};
use crate::downloader::profiles::ExtractionProfile;
use crate::downloader::utils::{find_ytdlp, locate_download, run_output_with_timeout};

const VERSION_CHECK_SECS: u64 = 10;

pub struct YtDlpResolver {
    ytdlp_path: String,
}

impl YtDlpResolver {
    pub fn new() -> Self {
        Self {
            ytdlp_path: find_ytdlp(),
        }
    }

    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            ytdlp_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.ytdlp_path
    }

    /// Check if yt-dlp binary is available
    pub async fn is_available(&self) -> bool {
        let args = vec!["--version".to_string()];
        match run_output_with_timeout(&self.ytdlp_path, args, VERSION_CHECK_SECS).await {
            Ok(out) => out.status.success(),
            Err(_) => false,
        }
    }

    /// Build command arguments
    pub fn build_args(
        url: &str,
        profile: &ExtractionProfile,
        target: Option<&DownloadTarget>,
    ) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "--format".to_string(),
            profile.format.clone(),
        ];

        if let Some(timeout) = profile.socket_timeout_secs {
            args.push("--socket-timeout".to_string());
            args.push(timeout.to_string());
        }
        if let Some(retries) = profile.retries {
            args.push("--retries".to_string());
            args.push(retries.to_string());
        }
        if let Some(retries) = profile.fragment_retries {
            args.push("--fragment-retries".to_string());
            args.push(retries.to_string());
        }

        for (name, value) in &profile.headers {
            args.push("--add-header".to_string());
            args.push(format!("{}:{}", name, value));
        }

        for hint in &profile.hints {
            args.push("--extractor-args".to_string());
            args.push(hint.to_arg());
        }

        if profile.no_check_certificate {
            args.push("--no-check-certificates".to_string());
        }
        if profile.ignore_errors {
            args.push("--ignore-errors".to_string());
        }
        if profile.no_cookies {
            args.push("--no-cookies".to_string());
        }

        // Proxy
        if let Some(proxy) = &profile.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        match target {
            Some(target) => {
                args.push("--no-simulate".to_string());
                args.push("--no-part".to_string());
                args.push("--output".to_string());
                args.push(target.output_template());
            }
            None => args.push("--skip-download".to_string()),
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Parse JSON output
    pub fn parse_json(stdout: &[u8]) -> Result<RawMediaResult, ResolveError> {
        let json_str = String::from_utf8_lossy(stdout);
        // With --ignore-errors a failed run can still exit 0 and print nothing
        let line = json_str
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && *l != "null")
            .ok_or_else(|| ResolveError::Unusable("yt-dlp printed no metadata".to_string()))?;

        let json: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| ResolveError::Parse(format!("Invalid JSON: {}", e)))?;
        if !json.is_object() {
            return Err(ResolveError::Parse("Expected a JSON object".to_string()));
        }

        Ok(RawMediaResult {
            id: str_field(&json, "id"),
            title: str_field(&json, "title"),
            description: str_field(&json, "description"),
            uploader: str_field(&json, "uploader"),
            duration: json["duration"].as_f64(),
            view_count: json["view_count"].as_u64(),
            like_count: json["like_count"].as_u64(),
            upload_date: str_field(&json, "upload_date"),
            thumbnail: str_field(&json, "thumbnail"),
            webpage_url: str_field(&json, "webpage_url"),
            extractor: str_field(&json, "extractor"),
            url: str_field(&json, "url"),
            ext: str_field(&json, "ext"),
            format_id: str_field(&json, "format_id"),
            resolution: str_field(&json, "resolution"),
            fps: json["fps"].as_f64(),
            filesize: json["filesize"].as_u64(),
            filesize_approx: json["filesize_approx"].as_u64(),
            formats: Self::parse_formats(&json),
            local_path: None,
        })
    }

    fn parse_formats(json: &serde_json::Value) -> Vec<RawFormat> {
        let Some(formats_array) = json["formats"].as_array() else {
            return Vec::new();
        };

        formats_array
            .iter()
            .map(|f| RawFormat {
                format_id: str_field(f, "format_id"),
                url: str_field(f, "url"),
                ext: str_field(f, "ext"),
                quality: f["quality"].as_f64(),
                resolution: str_field(f, "resolution"),
                height: f["height"].as_u64().map(|h| h as u32),
                fps: f["fps"].as_f64(),
                filesize: f["filesize"].as_u64(),
                filesize_approx: f["filesize_approx"].as_u64(),
                format_note: str_field(f, "format_note"),
                vcodec: str_field(f, "vcodec"),
                acodec: str_field(f, "acodec"),
            })
            .collect()
    }
}

fn str_field(json: &serde_json::Value, key: &str) -> Option<String> {
    json[key].as_str().map(|s| s.to_string())
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for YtDlpResolver {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn resolve(
        &self,
        url: &str,
        profile: &ExtractionProfile,
        target: Option<&DownloadTarget>,
    ) -> Result<RawMediaResult, ResolveError> {
        let args = Self::build_args(url, profile, target);
        tracing::debug!(
            profile = profile.name,
            program = %self.ytdlp_path,
            args = %args.join(" "),
            "Running yt-dlp"
        );

        let out = run_output_with_timeout(&self.ytdlp_path, args, profile.deadline_secs)
            .await
            .map_err(|e| {
                if e.starts_with("Timed out") {
                    ResolveError::Transport(e)
                } else {
                    ResolveError::from(e)
                }
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(ResolveError::from(stderr.trim().to_string()));
        }

        let mut raw = Self::parse_json(&out.stdout)?;

        if let Some(target) = target {
            let (path, ext) = locate_download(&target.dir, &target.stem, raw.ext.as_deref())
                .ok_or_else(|| {
                    ResolveError::Unusable(format!(
                        "downloaded file not found for {}",
                        target.stem
                    ))
                })?;
            raw.ext = Some(ext);
            raw.local_path = Some(path);
        }

        Ok(raw)
    }
}
