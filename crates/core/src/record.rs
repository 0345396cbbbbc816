//! The scraped-page record shared by the extractor, the orchestrator and the cache.
//!
//! Serialized field names follow the wire format consumers of the cache
//! already read (`metaDescription`, `cachedAt`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hard cap on `content`, counted in characters.
pub const MAX_CONTENT_CHARS: usize = 40_000;

/// Error string carried by every failed scrape.
pub const SCRAPE_FAILED: &str = "Failed to scrape URL";

/// Level-1 and level-2 heading text, each category space-joined in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headings {
    pub h1: String,
    pub h2: String,
}

/// A scraped page.
///
/// `error` is `None` for a successful scrape. A failed scrape carries an error
/// string and empty text fields, never missing ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedContent {
    pub url: String,
    pub title: String,
    pub headings: Headings,
    pub meta_description: String,
    pub content: String,
    pub error: Option<String>,
    /// Epoch milliseconds, stamped only when the record is written to the cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<i64>,
}

impl ScrapedContent {
    /// The record returned for any scrape that could not complete.
    pub fn failed(url: impl Into<String>) -> Self {
        Self { url: url.into(), error: Some(SCRAPE_FAILED.to_string()), ..Default::default() }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Check the record invariants that the type system does not already enforce.
    pub fn check_invariants(&self) -> Result<(), ShapeError> {
        let chars = self.content.chars().count();
        if chars > MAX_CONTENT_CHARS {
            return Err(ShapeError::ContentTooLong(chars));
        }

        if self.error.is_some()
            && !(self.title.is_empty()
                && self.meta_description.is_empty()
                && self.headings.h1.is_empty()
                && self.headings.h2.is_empty()
                && self.content.is_empty())
        {
            return Err(ShapeError::FailureWithContent);
        }

        Ok(())
    }
}

/// Why a value is not a valid [`ScrapedContent`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("expected a JSON object")]
    NotAnObject,

    #[error("field `{0}` is missing or not a string")]
    NotAString(&'static str),

    #[error("field `headings` is missing or not an object")]
    HeadingsNotAnObject,

    #[error("field `error` must be null or a string")]
    BadError,

    #[error("field `cachedAt` must be an integer")]
    BadCachedAt,

    #[error("content is {0} characters, limit is {MAX_CONTENT_CHARS}")]
    ContentTooLong(usize),

    #[error("failed scrape carries non-empty text fields")]
    FailureWithContent,

    #[error("record could not be decoded: {0}")]
    Decode(String),
}

/// Validate an untyped value and convert it into a record.
///
/// Distinguishes a wrong shape from a well-formed record, so callers can treat
/// the two differently from an absent value.
pub fn validate(value: Value) -> Result<ScrapedContent, ShapeError> {
    let Value::Object(map) = &value else {
        return Err(ShapeError::NotAnObject);
    };

    for field in ["url", "title", "metaDescription", "content"] {
        if !map.get(field).is_some_and(Value::is_string) {
            return Err(ShapeError::NotAString(field));
        }
    }

    let Some(Value::Object(headings)) = map.get("headings") else {
        return Err(ShapeError::HeadingsNotAnObject);
    };
    if !headings.get("h1").is_some_and(Value::is_string) {
        return Err(ShapeError::NotAString("headings.h1"));
    }
    if !headings.get("h2").is_some_and(Value::is_string) {
        return Err(ShapeError::NotAString("headings.h2"));
    }

    match map.get("error") {
        Some(Value::Null) | Some(Value::String(_)) => {}
        _ => return Err(ShapeError::BadError),
    }

    match map.get("cachedAt") {
        None | Some(Value::Null) => {}
        Some(v) if v.is_i64() => {}
        Some(_) => return Err(ShapeError::BadCachedAt),
    }

    let record: ScrapedContent = serde_json::from_value(value).map_err(|e| ShapeError::Decode(e.to_string()))?;
    record.check_invariants()?;
    Ok(record)
}
