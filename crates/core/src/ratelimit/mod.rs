//! Per-client request limiting over a sliding window.

mod sliding;

pub use sliding::SlidingWindowLimiter;

use async_trait::async_trait;

use crate::Error;

/// Outcome of one limiter check, with the quota metadata reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request is admitted.
    pub success: bool,
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests still available in the current window after this one.
    pub remaining: u32,
    /// Epoch milliseconds at which the oldest counted request leaves the window.
    pub reset: i64,
}

/// A limiter keyed by an arbitrary client identity.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count a request for `key` and decide whether it is admitted.
    async fn limit(&self, key: &str) -> Result<RateLimitDecision, Error>;
}
