//! Key-value store seam with TTL support.
//!
//! The scrape cache only needs get/set/delete on JSON values. Values come back
//! exactly as they were written: a JSON string stays a string, an object stays
//! an object.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

use super::connection::SqliteStore;
use crate::Error;

/// A key-value store with optional per-entry expiry.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a live value. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Result<Option<Value>, Error>;

    /// Write a value, replacing any previous one under the same key.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), Error>;

    /// Delete a key, returning how many entries were removed.
    async fn del(&self, key: &str) -> Result<u64, Error>;
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        let key = key.to_string();
        let now = now_ms();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT value_json FROM kv_entries
                     WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                )?;
                let json = stmt
                    .query_row(params![key, now], |row| row.get::<_, String>(0))
                    .optional()?;
                Ok(json)
            })
            .await
            .map_err(Error::from)?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), Error> {
        let key = key.to_string();
        let json = serde_json::to_string(&value)?;
        let now = now_ms();
        let expires_at = ttl.map(|ttl| now.saturating_add(ttl.as_millis() as i64));

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO kv_entries (key, value_json, expires_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key) DO UPDATE SET
                        value_json = excluded.value_json,
                        expires_at = excluded.expires_at,
                        updated_at = excluded.updated_at",
                    params![key, json, expires_at, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn del(&self, key: &str) -> Result<u64, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

impl SqliteStore {
    /// Delete expired entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let now = now_ms();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                    params![now],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of rows currently stored, live or expired.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM kv_entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
