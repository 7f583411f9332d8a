// Optional usage accounting
//
// Handlers report every request here. Nothing in admission or artifact serving
// reads it back, so running with `NoopRecorder` only loses the analytics
// endpoint.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use time::Date;

use crate::clock::Clock;
use crate::downloader::errors::FailureKind;
use crate::downloader::models::MediaMetadata;

const POPULAR_LIMIT: usize = 10;
const RECENT_DAYS: i64 = 7;
/// Distinct videos remembered for the popularity ranking
const TRACKED_VIDEOS_LIMIT: usize = 1000;

/// One finished request
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub endpoint: &'static str,
    pub platform: String,
    pub processing_time: Duration,
    /// Why the cascade gave up; `None` for a successful request
    pub failure: Option<FailureKind>,
}

impl RequestEvent {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

pub trait UsageRecorder: Send + Sync {
    fn is_tracking(&self) -> bool {
        false
    }

    fn record_request(&self, _event: &RequestEvent) {}

    fn record_metadata(&self, _metadata: &MediaMetadata) {}

    fn record_admission_denied(&self, _endpoint: &'static str) {}

    /// None when this recorder keeps no history
    fn snapshot(&self) -> Option<UsageSnapshot> {
        None
    }
}

#[derive(Debug, Default)]
pub struct NoopRecorder;

impl UsageRecorder for NoopRecorder {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub summary: UsageSummary,
    pub platform_stats: Vec<PlatformStats>,
    pub endpoint_stats: Vec<EndpointStats>,
    pub failures: Vec<FailureCount>,
    pub popular_videos: Vec<PopularVideo>,
    pub daily_requests: Vec<DailyRequests>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub success_rate: f64,
    pub recent_requests_7d: u64,
    pub rate_limit_rejections: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformStats {
    pub platform: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub success_rate: f64,
    /// Seconds
    pub avg_processing_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointStats {
    pub endpoint: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub rate_limit_rejections: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureCount {
    pub kind: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularVideo {
    pub title: String,
    pub platform: String,
    pub uploader: String,
    pub request_count: u64,
    pub view_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRequests {
    pub date: String,
    pub requests: u64,
}

#[derive(Debug, Default)]
struct PlatformTally {
    total: u64,
    successful: u64,
    processing: Duration,
}

#[derive(Debug, Default)]
struct EndpointTally {
    total: u64,
    successful: u64,
    rejected: u64,
}

#[derive(Debug)]
struct VideoTally {
    title: String,
    platform: String,
    uploader: String,
    view_count: u64,
    requests: u64,
}

#[derive(Debug, Default)]
struct Tallies {
    total: u64,
    successful: u64,
    rejections: u64,
    platforms: HashMap<String, PlatformTally>,
    endpoints: HashMap<&'static str, EndpointTally>,
    failures: HashMap<FailureKind, u64>,
    videos: HashMap<String, VideoTally>,
    /// Only the last `RECENT_DAYS` days are kept
    days: BTreeMap<Date, u64>,
}

impl Tallies {
    /// Make room for one more video by forgetting the least requested one
    fn evict_least_requested(&mut self) {
        let coldest = self
            .videos
            .iter()
            .min_by_key(|(_, v)| v.requests)
            .map(|(id, _)| id.clone());
        if let Some(id) = coldest {
            self.videos.remove(&id);
        }
    }
}

fn is_recent(today: Date, day: Date) -> bool {
    (today - day).whole_days() < RECENT_DAYS
}

/// Process-lifetime analytics kept in memory
pub struct InMemoryUsage {
    tallies: Mutex<Tallies>,
    clock: Arc<dyn Clock>,
}

impl InMemoryUsage {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tallies: Mutex::new(Tallies::default()),
            clock,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tallies> {
        self.tallies.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl UsageRecorder for InMemoryUsage {
    fn is_tracking(&self) -> bool {
        true
    }

    fn record_request(&self, event: &RequestEvent) {
        let today = self.clock.now_utc().date();
        let success = event.succeeded();
        let mut tallies = self.lock();

        tallies.total += 1;
        if success {
            tallies.successful += 1;
        }
        *tallies.days.entry(today).or_default() += 1;
        tallies.days.retain(|day, _| is_recent(today, *day));

        let platform = tallies.platforms.entry(event.platform.clone()).or_default();
        platform.total += 1;
        if success {
            platform.successful += 1;
        }
        platform.processing += event.processing_time;

        let endpoint = tallies.endpoints.entry(event.endpoint).or_default();
        endpoint.total += 1;
        if success {
            endpoint.successful += 1;
        }

        if let Some(kind) = event.failure {
            *tallies.failures.entry(kind).or_default() += 1;
        }
    }

    fn record_metadata(&self, metadata: &MediaMetadata) {
        let mut tallies = self.lock();
        if !tallies.videos.contains_key(&metadata.video_id)
            && tallies.videos.len() >= TRACKED_VIDEOS_LIMIT
        {
            tallies.evict_least_requested();
        }

        let video = tallies
            .videos
            .entry(metadata.video_id.clone())
            .or_insert_with(|| VideoTally {
                title: metadata.title.clone(),
                platform: metadata.platform.clone(),
                uploader: metadata.uploader.clone(),
                view_count: 0,
                requests: 0,
            });
        video.requests += 1;
        video.view_count = metadata.view_count;
    }

    fn record_admission_denied(&self, endpoint: &'static str) {
        let mut tallies = self.lock();
        tallies.rejections += 1;
        tallies.endpoints.entry(endpoint).or_default().rejected += 1;
    }

    fn snapshot(&self) -> Option<UsageSnapshot> {
        let today = self.clock.now_utc().date();
        let tallies = self.lock();

        // Buckets are pruned on write; a quiet week still ages them out here
        let recent_days: Vec<(Date, u64)> = tallies
            .days
            .iter()
            .filter(|(day, _)| is_recent(today, **day))
            .map(|(day, n)| (*day, *n))
            .collect();
        let recent_requests_7d = recent_days.iter().map(|(_, n)| n).sum();

        let mut platform_stats: Vec<PlatformStats> = tallies
            .platforms
            .iter()
            .map(|(name, t)| PlatformStats {
                platform: name.clone(),
                total_requests: t.total,
                successful_requests: t.successful,
                success_rate: rate(t.successful, t.total),
                avg_processing_time: if t.total > 0 {
                    round_to(t.processing.as_secs_f64() / t.total as f64, 3)
                } else {
                    0.0
                },
            })
            .collect();
        platform_stats.sort_by(|a, b| b.total_requests.cmp(&a.total_requests).then(a.platform.cmp(&b.platform)));

        let mut endpoint_stats: Vec<EndpointStats> = tallies
            .endpoints
            .iter()
            .map(|(name, t)| EndpointStats {
                endpoint: name.to_string(),
                total_requests: t.total,
                successful_requests: t.successful,
                rate_limit_rejections: t.rejected,
            })
            .collect();
        endpoint_stats.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));

        let mut failures: Vec<FailureCount> = tallies
            .failures
            .iter()
            .map(|(kind, count)| FailureCount {
                kind: kind.to_string(),
                count: *count,
            })
            .collect();
        failures.sort_by(|a, b| b.count.cmp(&a.count).then(a.kind.cmp(&b.kind)));

        let mut popular_videos: Vec<PopularVideo> = tallies
            .videos
            .values()
            .map(|v| PopularVideo {
                title: v.title.clone(),
                platform: v.platform.clone(),
                uploader: v.uploader.clone(),
                request_count: v.requests,
                view_count: v.view_count,
            })
            .collect();
        popular_videos.sort_by(|a, b| b.request_count.cmp(&a.request_count).then(a.title.cmp(&b.title)));
        popular_videos.truncate(POPULAR_LIMIT);

        let daily_requests = recent_days
            .into_iter()
            .map(|(day, n)| DailyRequests {
                date: day.to_string(),
                requests: n,
            })
            .collect();

        Some(UsageSnapshot {
            summary: UsageSummary {
                total_requests: tallies.total,
                successful_requests: tallies.successful,
                success_rate: rate(tallies.successful, tallies.total),
                recent_requests_7d,
                rate_limit_rejections: tallies.rejections,
            },
            platform_stats,
            endpoint_stats,
            failures,
            popular_videos,
            daily_requests,
        })
    }
}

/// Percentage rounded to two decimals
fn rate(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, 2)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
