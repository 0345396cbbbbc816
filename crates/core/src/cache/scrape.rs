//! Scrape cache: keys, read validation and size-bounded write-through.
//!
//! Store failures never escape this module. Reads degrade to a miss and writes
//! are skipped, with the outcome visible in [`CacheLookup`] and [`CacheWrite`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::store::KvStore;
use crate::record::{self, ScrapedContent, ShapeError};

/// Namespace prefix for scrape entries.
pub const KEY_PREFIX: &str = "scrape : ";

/// URLs are truncated to this many characters before key construction.
pub const MAX_KEY_URL_CHARS: usize = 200;

/// Default lifetime of an entry (7 days).
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default ceiling on a serialized record (1 MiB).
pub const DEFAULT_MAX_BYTES: usize = 1_048_576;

/// Build the cache key for a URL.
///
/// Two URLs that only differ after character 200 share a key.
pub fn cache_key(url: &str) -> String {
    let truncated: String = url.chars().take(MAX_KEY_URL_CHARS).collect();
    format!("{KEY_PREFIX}{truncated}")
}

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// A valid record was found.
    Hit(ScrapedContent),
    /// Nothing usable is stored, or the store could not be read.
    Miss,
    /// The stored string was not JSON; the key was deleted.
    Corrupt,
    /// The stored value had the wrong shape; the key was deleted.
    Invalid(ShapeError),
}

impl CacheLookup {
    /// Collapse to the record, treating every non-hit as absent.
    pub fn into_hit(self) -> Option<ScrapedContent> {
        match self {
            CacheLookup::Hit(record) => Some(record),
            _ => None,
        }
    }
}

/// Result of a cache write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheWrite {
    Stored { bytes: usize },
    /// Serialized record exceeded the ceiling; nothing was written.
    TooLarge { bytes: usize },
    /// Record failed validation; nothing was written.
    Invalid(ShapeError),
    /// The store rejected the write or the record could not be serialized.
    Failed,
}

/// Scrape cache over any [`KvStore`].
#[derive(Clone)]
pub struct ScrapeCache {
    store: Arc<dyn KvStore>,
    ttl: Duration,
    max_bytes: usize,
}

impl ScrapeCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store, ttl: DEFAULT_TTL, max_bytes: DEFAULT_MAX_BYTES }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Look up the cached scrape for a URL.
    pub async fn get(&self, url: &str) -> CacheLookup {
        let key = cache_key(url);
        tracing::debug!(key = %key, "checking cache");

        let stored = match self.store.get(&key).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::debug!(url = %url, "cache miss");
                return CacheLookup::Miss;
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "cache retrieval error");
                return CacheLookup::Miss;
            }
        };

        let parsed = match stored {
            Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(value) => value,
                Err(e) => {
                    tracing::error!(url = %url, error = %e, "cached entry is not valid JSON, deleting");
                    self.delete(&key).await;
                    return CacheLookup::Corrupt;
                }
            },
            native => native,
        };

        match record::validate(parsed) {
            Ok(record) => {
                if let Some(cached_at) = record.cached_at {
                    let age_ms = chrono::Utc::now().timestamp_millis().saturating_sub(cached_at);
                    tracing::debug!(url = %url, age_minutes = age_ms / 60_000, "cache hit");
                } else {
                    tracing::debug!(url = %url, "cache hit");
                }
                CacheLookup::Hit(record)
            }
            Err(reason) => {
                tracing::warn!(url = %url, %reason, "invalid cached content format, deleting");
                self.delete(&key).await;
                CacheLookup::Invalid(reason)
            }
        }
    }

    /// Write a record through to the cache, stamping `cached_at`.
    ///
    /// The caller's record is stamped in place so the returned value matches
    /// what a later read yields.
    pub async fn set(&self, url: &str, content: &mut ScrapedContent) -> CacheWrite {
        let key = cache_key(url);
        content.cached_at = Some(chrono::Utc::now().timestamp_millis());

        if let Err(reason) = content.check_invariants() {
            tracing::error!(url = %url, %reason, "refusing to cache invalid content");
            return CacheWrite::Invalid(reason);
        }

        let serialized = match serde_json::to_string(content) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "failed to serialize content for cache");
                return CacheWrite::Failed;
            }
        };

        let bytes = serialized.len();
        if bytes > self.max_bytes {
            tracing::warn!(url = %url, bytes, limit = self.max_bytes, "content too large to cache");
            return CacheWrite::TooLarge { bytes };
        }

        match self.store.set(&key, Value::String(serialized), Some(self.ttl)).await {
            Ok(()) => {
                tracing::info!(url = %url, bytes, ttl_secs = self.ttl.as_secs(), "cached content");
                CacheWrite::Stored { bytes }
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "cache storage error");
                CacheWrite::Failed
            }
        }
    }

    /// Fire-and-forget delete; failures are only logged.
    async fn delete(&self, key: &str) {
        if let Err(e) = self.store.del(key).await {
            tracing::error!(key = %key, error = %e, "cache delete failed");
        }
    }
}
