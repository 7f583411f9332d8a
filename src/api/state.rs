use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::downloader::{CascadeSettings, ExtractionOrchestrator, Resolver, YtDlpResolver};
use crate::limiter::RateLimiter;
use crate::notify::{NoopSink, NotificationSink, TelegramSink};
use crate::store::ArtifactStore;
use crate::usage::{InMemoryUsage, NoopRecorder, UsageRecorder};

/// Shared application state
pub struct AppState {
    pub orchestrator: Arc<ExtractionOrchestrator>,
    pub limiter: Arc<RateLimiter>,
    pub store: Arc<ArtifactStore>,
    pub notifier: Arc<dyn NotificationSink>,
    pub usage: Arc<dyn UsageRecorder>,
}

impl AppState {
    /// State with no notifications and no usage tracking
    pub fn new(
        orchestrator: ExtractionOrchestrator,
        limiter: RateLimiter,
        store: ArtifactStore,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            limiter: Arc::new(limiter),
            store: Arc::new(store),
            notifier: Arc::new(NoopSink),
            usage: Arc::new(NoopRecorder),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_usage(mut self, usage: Arc<dyn UsageRecorder>) -> Self {
        self.usage = usage;
        self
    }

    /// Wire every collaborator from configuration
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let resolver = match &config.ytdlp_path {
            Some(path) => YtDlpResolver::with_path(path.clone()),
            None => YtDlpResolver::new(),
        };
        if !resolver.is_available().await {
            tracing::warn!(path = resolver.path(), "yt-dlp not runnable; every extraction will fail");
        }
        let resolver: Arc<dyn Resolver> = Arc::new(resolver);

        let settings = CascadeSettings {
            socket_timeout_secs: config.socket_timeout_secs,
            proxy: config.proxy.clone(),
            ..Default::default()
        };
        let orchestrator =
            ExtractionOrchestrator::new(resolver, config.download_dir.clone(), settings);

        let limiter = RateLimiter::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
            clock.clone(),
        );
        let store = ArtifactStore::new(config.retention(), clock.clone());

        let mut state = Self::new(orchestrator, limiter, store);

        if let Some((token, chat_id)) = config.telegram() {
            let sink = TelegramSink::new(token, chat_id, config.proxy.as_deref())?;
            tracing::info!("Telegram notifications enabled");
            state = state.with_notifier(Arc::new(sink));
        }

        if config.usage_tracking {
            state = state.with_usage(Arc::new(InMemoryUsage::new(clock)));
        }

        Ok(state)
    }
}
