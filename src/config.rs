use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Where materialized videos are written
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// How long a downloaded file stays fetchable
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// Interval of the expired-artifact sweep
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Rate limit: requests per window per client
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: usize,

    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    /// Interval of the idle-client sweep
    #[serde(default = "default_limiter_sweep_interval_secs")]
    pub limiter_sweep_interval_secs: u64,

    /// Socket timeout handed to yt-dlp
    #[serde(default = "default_socket_timeout_secs")]
    pub socket_timeout_secs: u32,

    /// Explicit yt-dlp binary; searched for when unset
    #[serde(default)]
    pub ytdlp_path: Option<String>,

    /// Proxy for yt-dlp and outgoing notifications (http, https or socks5)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Notifications are disabled unless both are set
    #[serde(default)]
    pub telegram_bot_token: Option<String>,

    #[serde(default)]
    pub telegram_chat_id: Option<String>,

    /// Keep in-memory usage analytics
    #[serde(default = "default_true")]
    pub usage_tracking: bool,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Whole-request timeout; must cover a full download cascade
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            download_dir: default_download_dir(),
            retention_hours: default_retention_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
            rate_limit_max_requests: default_rate_limit_max_requests(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            limiter_sweep_interval_secs: default_limiter_sweep_interval_secs(),
            socket_timeout_secs: default_socket_timeout_secs(),
            ytdlp_path: None,
            proxy: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            usage_tracking: default_true(),
            enable_cors: default_true(),
            request_timeout_secs: default_request_timeout_secs(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional `video_api` file, then environment
    /// variables prefixed `VIDEO_API__`
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("video_api").required(false))
            .add_source(config::Environment::with_prefix("VIDEO_API").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 60 * 60)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn limiter_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.limiter_sweep_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Both Telegram settings, when notifications are configured
    pub fn telegram(&self) -> Option<(&str, &str)> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) if !token.is_empty() && !chat.is_empty() => {
                Some((token.as_str(), chat.as_str()))
            }
            _ => None,
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_retention_hours() -> u64 {
    24
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

fn default_rate_limit_max_requests() -> usize {
    10
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_limiter_sweep_interval_secs() -> u64 {
    300
}

fn default_socket_timeout_secs() -> u32 {
    30
}

fn default_request_timeout_secs() -> u64 {
    900
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
