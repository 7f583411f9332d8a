// Best-effort notification side channel
//
// After a server download the file is mirrored to a chat. Nothing here may
// affect the response to the client: the handler spawns `notify` and only
// logs the outcome.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::downloader::models::MediaMetadata;

/// Telegram rejects `sendVideo` uploads above this size
pub const VIDEO_UPLOAD_LIMIT: u64 = 50 * 1024 * 1024;

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("file unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API rejected the upload: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify(&self, path: &Path, caption: &str) -> Result<(), NotifyError>;
}

/// Used when no chat is configured
#[derive(Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn notify(&self, _path: &Path, _caption: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

pub struct TelegramSink {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        proxy: Option<&str>,
    ) -> Result<Self, NotifyError> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(120));
        if let Some(proxy_url) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(Self {
            client: builder.build()?,
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.bot_token, method)
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn notify(&self, path: &Path, caption: &str) -> Result<(), NotifyError> {
        let (part, size) = file_part(path).await?;

        let (method, form) = if size > VIDEO_UPLOAD_LIMIT {
            tracing::warn!(size, "Video too large for sendVideo, sending as document");
            let form = Form::new()
                .text("chat_id", self.chat_id.clone())
                .text("caption", document_caption(caption))
                .text("parse_mode", "HTML")
                .part("document", part);
            ("sendDocument", form)
        } else {
            let form = Form::new()
                .text("chat_id", self.chat_id.clone())
                .text("caption", caption.to_string())
                .text("parse_mode", "HTML")
                .text("supports_streaming", "true")
                .part("video", part);
            ("sendVideo", form)
        };

        let response = self
            .client
            .post(self.endpoint(method))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body: ApiResponse = response.json().await?;

        if !body.ok {
            return Err(NotifyError::Rejected(
                body.description
                    .unwrap_or_else(|| format!("status {}", status)),
            ));
        }

        tracing::info!(method, path = %path.display(), "Notification delivered");
        Ok(())
    }
}

/// Multipart part that streams the file from disk instead of buffering it
async fn file_part(path: &Path) -> Result<(Part, u64), NotifyError> {
    let file = tokio::fs::File::open(path).await?;
    let size = file.metadata().await?.len();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "video.mp4".to_string());

    let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
    let part = Part::stream_with_length(body, size).file_name(file_name);
    Ok((part, size))
}

fn document_caption(caption: &str) -> String {
    if caption.is_empty() {
        "📹 Video file (sent as document due to size limit)".to_string()
    } else {
        format!("📹 {}\n\n⚠️ Sent as document due to size limit", caption)
    }
}

/// Caption with title, uploader, platform and duration. Empty fields are left out.
pub fn build_caption(metadata: &MediaMetadata) -> String {
    let mut lines = Vec::new();

    if !metadata.title.is_empty() {
        lines.push(format!("🎬 <b>{}</b>", escape_html(&metadata.title)));
    }
    if !metadata.uploader.is_empty() {
        lines.push(format!("👤 {}", escape_html(&metadata.uploader)));
    }
    if !metadata.platform.is_empty() {
        lines.push(format!("📱 {}", title_case(&metadata.platform)));
    }
    if metadata.duration > 0 {
        lines.push(format!(
            "⏱️ {}:{:02}",
            metadata.duration / 60,
            metadata.duration % 60
        ));
    }

    lines.join("\n")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
