use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde_json::Value;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use crate::error::ApiError;
use crate::identity::identity_from_headers;
use crate::state::AppState;
use crate::models::{ChatMessage, GenerateRequest, GenerateResponse};
use crate::metrics::{QUOTA_RECORDS, RATE_LIMITED_TOTAL, REQUEST_TOTAL, UPSTREAM_ERRORS, UPSTREAM_LATENCY};

pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    REQUEST_TOTAL.inc();

    // parsed regardless of Content-Type, browsers send string bodies as text/plain
    let req: GenerateRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
    let message = req.message_text().ok_or(ApiError::InvalidMessage)?;

    // only an absent modelId falls back to the default, null is rejected
    let model = match &req.model_id {
        None => state.default_model(),
        Some(Value::String(m)) => m.as_str(),
        Some(_) => return Err(ApiError::InvalidModel(state.models.clone())),
    };
    if !state.is_known_model(model) {
        return Err(ApiError::InvalidModel(state.models.clone()));
    }

    // quota is spent before the credential check, same as a real upstream call
    let identity = identity_from_headers(&headers);
    let decision = state.rate_limiter.check(&identity);
    QUOTA_RECORDS.set(state.rate_limiter.tracked() as f64);

    if !decision.success {
        RATE_LIMITED_TOTAL.inc();
        info!(%identity, reset = decision.reset, "rate limit exceeded");
        return Err(ApiError::RateLimited {
            decision,
            window: state.rate_window,
        });
    }
    debug!(%identity, remaining = decision.remaining, "request admitted");

    if !state.upstream.has_api_key() {
        return Err(ApiError::ApiKeyMissing);
    }

    if !req.attachments.is_empty() {
        debug!(count = req.attachments.len(), "attachments are not forwarded");
    }

    let start_time = Instant::now();
    let result = state.upstream.generate(model, message).await;
    UPSTREAM_LATENCY.observe(start_time.elapsed().as_secs_f64());

    let completion = result.inspect_err(|_| UPSTREAM_ERRORS.inc())?;

    let now = Utc::now().timestamp_millis();
    let id = req
        .chat_id()
        .unwrap_or_else(|| Value::String(format!("chat-{now}")));

    Ok(Json(GenerateResponse {
        id,
        message: ChatMessage::new("assistant", completion.into_text()),
        model: model.to_string(),
        created: now,
    }))
}
