use std::time::Duration;
use crate::rate_limit::RateLimiter;
use crate::upstream::UpstreamClient;
// app's shared state

pub struct AppState {
    pub upstream: UpstreamClient,
    pub rate_limiter: RateLimiter,
    pub rate_window: Duration, // kept for the denial message wording
    pub models: Vec<String>,   // first entry is the default model
}

impl AppState {
    pub fn default_model(&self) -> &str {
        self.models.first().map(String::as_str).unwrap_or_default()
    }

    pub fn is_known_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }
}
