//! SQLite-backed key-value store and the scrape cache built on it.
//!
//! This module provides:
//!
//! - A [`KvStore`] seam with get/set/delete and per-entry TTL
//! - [`SqliteStore`], the tokio-rusqlite implementation with WAL mode and migrations
//! - [`ScrapeCache`], which keys, validates and size-bounds scraped pages

pub mod connection;
pub mod migrations;
pub mod scrape;
pub mod store;

pub use crate::Error;

pub use connection::SqliteStore;
pub use scrape::{CacheLookup, CacheWrite, ScrapeCache, cache_key};
pub use store::KvStore;
