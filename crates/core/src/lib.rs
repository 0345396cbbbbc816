//! Core types and shared functionality for scrapechat.
//!
//! This crate provides:
//! - The scraped-page record and its shape validation
//! - Key-value cache with SQLite backend and the scrape cache on top of it
//! - Sliding-window rate limiting
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod ratelimit;
pub mod record;

pub use cache::{CacheLookup, CacheWrite, KvStore, ScrapeCache, SqliteStore};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use ratelimit::{RateLimitDecision, RateLimiter, SlidingWindowLimiter};
pub use record::{Headings, ScrapedContent, ShapeError};
