//! Rate Limiter Gate.
//!
//! Every request is counted against its client identity before the inner
//! handler runs. Admitted and denied responses both carry the quota headers;
//! a limiter failure is answered with 500 and no headers.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use scrapechat_core::RateLimitDecision;

use crate::app::AppState;
use crate::error::ApiError;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Identity used when the request carries no forwarding header.
const FALLBACK_IDENTITY: &str = "127.0.0.1";

/// First entry of `x-forwarded-for`, trimmed, or the loopback address.
pub fn client_identity(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or(FALLBACK_IDENTITY)
        .to_string()
}

pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let identity = client_identity(request.headers());

    let decision = match state.limiter.limit(&identity).await {
        Ok(decision) => decision,
        Err(e) => {
            tracing::error!(client = %identity, error = %e, "rate limiter failed");
            return ApiError::Internal.into_response();
        }
    };

    let mut response = if decision.success {
        next.run(request).await
    } else {
        tracing::warn!(client = %identity, reset = decision.reset, "rate limit exceeded");
        ApiError::TooManyRequests.into_response()
    };

    apply_quota_headers(response.headers_mut(), &decision);
    response
}

fn apply_quota_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
}
