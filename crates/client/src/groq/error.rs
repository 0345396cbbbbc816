//! Groq API client error types.

use std::sync::Arc;

/// Errors from the Groq chat-completions client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GroqError {
    /// No API key configured.
    #[error("missing API key: SCRAPECHAT_GROQ_API_KEY not set")]
    MissingApiKey,

    /// Authentication failed (invalid API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// Rate limited by Groq.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),

    /// The completion carried no choices.
    #[error("empty response: no choices returned")]
    EmptyResponse,
}

impl From<reqwest::Error> for GroqError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { GroqError::Timeout } else { GroqError::Network(Arc::new(err)) }
    }
}

impl From<GroqError> for scrapechat_core::Error {
    fn from(err: GroqError) -> Self {
        scrapechat_core::Error::Llm(err.to_string())
    }
}
