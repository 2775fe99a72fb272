//! Errors surfaced by the HTTP handlers.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::SecondsFormat;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

use crate::rate_limit::Decision;
use crate::upstream::UpstreamError;

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Message is required and must be a string")]
    InvalidMessage,

    #[error("Invalid model. Available models: {}", .0.join(", "))]
    InvalidModel(Vec<String>),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Quota exhausted for the current window.
    #[error("rate limit exceeded")]
    RateLimited { decision: Decision, window: Duration },

    #[error("OpenCode API key is not configured")]
    ApiKeyMissing,

    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("Failed to generate: {0}")]
    Internal(String),
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::MissingApiKey => ApiError::ApiKeyMissing,
            UpstreamError::Status { status, message } => ApiError::Upstream {
                status: StatusCode::from_u16(status.as_u16())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            },
            UpstreamError::Transport(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidMessage | ApiError::InvalidModel(_) | ApiError::InvalidBody(_) => {
                let body = json!({ "error": self.to_string() });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::RateLimited { decision, window } => {
                rate_limited_response(&decision, window)
            }
            ApiError::ApiKeyMissing => {
                let body = json!({
                    "error": "API_KEY_MISSING",
                    "message": self.to_string(),
                });
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            }
            ApiError::Upstream { status, message } => {
                let body = json!({ "error": "API_ERROR", "message": message });
                (status, Json(body)).into_response()
            }
            ApiError::Internal(ref detail) => {
                error!(%detail, "generation failed");
                let body = json!({ "error": self.to_string() });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

fn rate_limited_response(decision: &Decision, window: Duration) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(decision.reset));

    let reset_time = decision.reset_time.to_rfc3339_opts(SecondsFormat::Millis, true);
    let body = json!({
        "error": "RATE_LIMIT_EXCEEDED",
        "message": format!(
            "You've reached the limit of {} generations per {}. Please try again after {}.",
            decision.limit,
            describe_window(window),
            decision.reset_time.format("%Y-%m-%d %H:%M:%S UTC"),
        ),
        "limit": decision.limit,
        "remaining": decision.remaining,
        "resetTime": reset_time,
    });

    (StatusCode::TOO_MANY_REQUESTS, headers, Json(body)).into_response()
}

/// Human wording for a window length, e.g. "12 hours" or "90 minutes".
pub fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    let (n, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}
