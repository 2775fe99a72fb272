//! Outbound client for the chat-completions API.

use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{ChatMessage, CompletionRequest, CompletionResponse};

pub const SYSTEM_PROMPT: &str =
    "You are a helpful AI coding assistant. Always provide code examples when possible.";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("OpenCode API key is not configured")]
    MissingApiKey,

    /// The API answered with a non-success status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl UpstreamClient {
    pub fn new(url: String, api_key: Option<String>, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url,
            // an empty env var counts as unset
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Generation call: fixed system prompt followed by the user's message.
    pub async fn generate(
        &self,
        model: &str,
        message: &str,
    ) -> Result<CompletionResponse, UpstreamError> {
        let messages = vec![
            ChatMessage::new("system", SYSTEM_PROMPT),
            ChatMessage::new("user", message),
        ];
        self.complete(model, messages).await
    }

    /// Cheapest possible call that proves the credential is accepted.
    pub async fn check_credentials(&self, model: &str) -> Result<(), UpstreamError> {
        self.complete(model, vec![ChatMessage::new("user", "Hi")])
            .await
            .map(|_| ())
    }

    pub async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<CompletionResponse, UpstreamError> {
        let api_key = self.api_key.as_deref().ok_or(UpstreamError::MissingApiKey)?;

        let body = CompletionRequest {
            model: model.to_string(),
            messages,
            stream: false,
        };

        debug!(model, url = %self.url, "calling chat completions");
        let res = self
            .http
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.json::<Value>().await.unwrap_or(Value::Null);
            let message = error_message(&body)
                .unwrap_or_else(|| format!("OpenCode API error: {}", status.as_u16()));
            warn!(status = status.as_u16(), %message, "upstream rejected request");
            return Err(UpstreamError::Status { status, message });
        }

        Ok(res.json::<CompletionResponse>().await?)
    }
}

// `error` is either a plain string or an object carrying `message`
fn error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
