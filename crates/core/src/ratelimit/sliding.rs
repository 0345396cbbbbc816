//! In-process sliding-window log limiter.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{RateLimitDecision, RateLimiter};
use crate::Error;

/// Sliding-window limiter holding per-key request timestamps in memory.
///
/// A request is admitted iff fewer than `limit` requests from the same key
/// fall inside the trailing window. Rejected requests are not counted.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    limit: u32,
    window_ms: i64,
    hits: Mutex<HashMap<String, VecDeque<i64>>>,
}

impl SlidingWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window_ms: window.as_millis() as i64, hits: Mutex::new(HashMap::new()) }
    }

    /// Decide for a request arriving at `now_ms` (epoch milliseconds).
    pub async fn limit_at(&self, key: &str, now_ms: i64) -> RateLimitDecision {
        let mut hits = self.hits.lock().await;

        // Drop keys whose whole log has aged out so idle clients don't accumulate.
        let cutoff = now_ms - self.window_ms;
        hits.retain(|_, log| log.back().is_some_and(|&t| t > cutoff));

        let log = hits.entry(key.to_string()).or_default();
        while log.front().is_some_and(|&t| t <= cutoff) {
            log.pop_front();
        }

        let used = log.len() as u32;
        let success = used < self.limit;
        if success {
            log.push_back(now_ms);
        }

        let remaining = if success { self.limit - used - 1 } else { 0 };
        let reset = log.front().map_or(now_ms, |&oldest| oldest) + self.window_ms;

        RateLimitDecision { success, limit: self.limit, remaining, reset }
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn limit(&self, key: &str) -> Result<RateLimitDecision, Error> {
        if self.limit == 0 || self.window_ms <= 0 {
            return Err(Error::RateLimiter("limiter configured with an empty quota".into()));
        }
        Ok(self.limit_at(key, chrono::Utc::now().timestamp_millis()).await)
    }
}
