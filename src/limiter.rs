// Sliding-window rate limiter keyed by client identifier
//
// Each client owns a queue of admission timestamps, oldest first. Entries older
// than the window are trimmed lazily on every operation touching that client,
// and the periodic sweep drops clients whose queue became empty.
//
// DashMap holds each client's queue under its shard lock, so trim+compare and
// trim+append are atomic per client while unrelated clients proceed in parallel.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

use crate::clock::Clock;

pub const DEFAULT_MAX_REQUESTS: usize = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Per-client usage snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientStats {
    pub requests_made: usize,
    pub requests_remaining: usize,
    /// Time until the oldest counted request leaves a full window; zero below the limit
    #[serde(rename = "time_until_reset", serialize_with = "serialize_secs")]
    pub reset_in: Duration,
    pub max_requests: usize,
    #[serde(rename = "time_window", serialize_with = "serialize_secs")]
    pub window: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: DashMap<String, VecDeque<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests,
            window,
            clients: DashMap::new(),
            clock,
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// True when the client may make another request right now.
    /// Does not consume any budget; call `record` once the request succeeded.
    pub fn admit(&self, client_id: &str) -> bool {
        let now = self.clock.now();
        match self.clients.get_mut(client_id) {
            Some(mut timestamps) => {
                trim(&mut timestamps, now, self.window);
                timestamps.len() < self.max_requests
            }
            None => self.max_requests > 0,
        }
    }

    /// Count one request against the client's window
    pub fn record(&self, client_id: &str) {
        let now = self.clock.now();
        let mut timestamps = self.clients.entry(client_id.to_string()).or_default();
        trim(&mut timestamps, now, self.window);
        timestamps.push_back(now);
    }

    pub fn stats(&self, client_id: &str) -> ClientStats {
        let now = self.clock.now();
        let (made, reset_in) = match self.clients.get_mut(client_id) {
            Some(mut timestamps) => {
                trim(&mut timestamps, now, self.window);
                let reset_in = match timestamps.front() {
                    Some(oldest) if timestamps.len() >= self.max_requests => {
                        self.window.saturating_sub(now.duration_since(*oldest))
                    }
                    _ => Duration::ZERO,
                };
                (timestamps.len(), reset_in)
            }
            None => (0, Duration::ZERO),
        };

        ClientStats {
            requests_made: made,
            requests_remaining: self.max_requests.saturating_sub(made),
            reset_in,
            max_requests: self.max_requests,
            window: self.window,
        }
    }

    /// Trim every client and forget the ones left with nothing in the window.
    /// Returns how many clients were evicted.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.clients.len();
        self.clients.retain(|_, timestamps| {
            trim(timestamps, now, self.window);
            !timestamps.is_empty()
        });
        let evicted = before.saturating_sub(self.clients.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.clients.len(), "Rate limiter sweep");
        }
        evicted
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

/// Drop timestamps that are strictly older than the window
fn trim(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = timestamps.front() {
        if now.duration_since(*oldest) > window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}
