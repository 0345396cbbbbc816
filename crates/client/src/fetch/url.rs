//! URL detection in chat messages and validation before fetching.

use std::sync::LazyLock;

use regex::Regex;

/// Matches http(s) URLs embedded in free text.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)")
        .expect("URL pattern is valid")
});

/// Error type for URL validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Return the first URL found in `message`, if any.
pub fn find_url(message: &str) -> Option<&str> {
    URL_PATTERN.find(message).map(|m| m.as_str())
}

/// Split a chat message into the first URL it contains and the question left
/// once that URL is removed and the remainder trimmed.
pub fn split_message(message: &str) -> (Option<&str>, String) {
    match find_url(message) {
        Some(url) => (Some(url), message.replacen(url, "", 1).trim().to_string()),
        None => (None, message.trim().to_string()),
    }
}

/// Parse a URL for fetching.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an http or https scheme
/// 3. Remove fragment (#...)
pub fn parse_fetch_url(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if parsed.host_str().is_none() {
        return Err(UrlError::InvalidUrl("missing host".into()));
    }

    parsed.set_fragment(None);

    Ok(parsed)
}
