//! HTTP error responses for the scrapechat server.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors the server answers with a non-200 status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The client exhausted its request quota.
    #[error("Too Many Requests")]
    TooManyRequests,

    /// Something the client cannot fix failed.
    #[error("Internal Server Error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
