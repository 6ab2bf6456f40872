//! Per-client request rate limiting
//!
//! [`RateLimiter`] is the single capability the rate-limit stage depends on.
//! Two implementations exist and are chosen at startup from configuration:
//!
//! - [`WindowRateLimiter`]: in-process table, 60 requests per 60 seconds.
//! - [`RedisRateLimiter`](super::redis::RedisRateLimiter): fixed quota per
//!   period held in Redis, for deployments running several instances.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::AppResult;

/// Length of one counting window
pub const WINDOW: Duration = Duration::from_secs(60);

/// Requests admitted per client within one window
pub const REQUEST_CAP: u32 = 60;

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record one request from `client_id` and decide whether to serve it
    async fn admit(&self, client_id: &str) -> AppResult<bool>;
}

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    last_seen: Instant,
    count: u32,
}

/// Window counter keyed by client identifier.
///
/// An entry restarts at 1 once more than [`WINDOW`] has passed since that
/// client's previous request; otherwise every request bumps the count and
/// refreshes `last_seen`. Requests past [`REQUEST_CAP`] are refused. A client
/// that bursts at the end of one window and again right after the reset can
/// get up to twice the cap through in a short span.
#[derive(Default)]
pub struct WindowRateLimiter {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl WindowRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn admit_at(&self, client_id: &str, now: Instant) -> bool {
        let count = {
            let mut entries = self.entries.lock();
            match entries.get_mut(client_id) {
                Some(entry) if now.saturating_duration_since(entry.last_seen) <= WINDOW => {
                    entry.count = entry.count.saturating_add(1);
                    entry.last_seen = now;
                    entry.count
                }
                _ => {
                    entries.insert(
                        client_id.to_string(),
                        RateLimitEntry {
                            last_seen: now,
                            count: 1,
                        },
                    );
                    1
                }
            }
        };

        count <= REQUEST_CAP
    }

    #[cfg(test)]
    fn count_for(&self, client_id: &str) -> Option<u32> {
        self.entries.lock().get(client_id).map(|e| e.count)
    }
}

#[async_trait]
impl RateLimiter for WindowRateLimiter {
    async fn admit(&self, client_id: &str) -> AppResult<bool> {
        Ok(self.admit_at(client_id, Instant::now()))
    }
}
