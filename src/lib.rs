//! Video resolution and download service
//!
//! Resolves metadata, direct links and server-side downloads for YouTube,
//! TikTok and Instagram videos through yt-dlp, behind a per-client rate
//! limiter. Downloaded files are served by ticket until their retention runs
//! out.

pub mod api;
pub mod clock;
pub mod config;
pub mod downloader;
pub mod limiter;
pub mod notify;
pub mod platform;
pub mod store;
pub mod sweeper;
pub mod usage;

pub use api::start_server;
pub use config::AppConfig;

pub fn run(config: AppConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(start_server(config))
}
