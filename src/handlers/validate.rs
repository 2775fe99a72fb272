use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use tracing::warn;
use crate::models::ValidateResponse;
use crate::state::AppState;
use crate::upstream::UpstreamError;

// Checks that the configured credential is accepted upstream
pub async fn validate_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ValidateResponse>) {
    let (status, error, message) = match state.upstream.check_credentials(state.default_model()).await {
        Ok(()) => (
            StatusCode::OK,
            None,
            "OpenCode API key is configured correctly".to_string(),
        ),
        Err(e @ UpstreamError::MissingApiKey) => {
            (StatusCode::UNAUTHORIZED, Some("API_KEY_MISSING"), e.to_string())
        }
        Err(e @ UpstreamError::Status { .. }) => {
            (StatusCode::UNAUTHORIZED, Some("API_KEY_INVALID"), e.to_string())
        }
        Err(e @ UpstreamError::Transport(_)) => {
            warn!(error = %e, "credential validation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Some("VALIDATION_ERROR"), e.to_string())
        }
    };

    (
        status,
        Json(ValidateResponse {
            valid: error.is_none(),
            error,
            message,
        }),
    )
}
