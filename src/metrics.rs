use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("chat_gateway_requests_total", "Total number of generate requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter =
        register_counter!("chat_gateway_rate_limited_total", "Requests denied by the quota").unwrap();
    pub static ref UPSTREAM_ERRORS: Counter =
        register_counter!("chat_gateway_upstream_errors_total", "Failed chat completion calls").unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "chat_gateway_upstream_latency_seconds",
        "Chat completion latency in seconds"
    )
    .unwrap();
    pub static ref QUOTA_RECORDS: Gauge =
        register_gauge!("chat_gateway_quota_records", "Identities currently holding a quota record").unwrap();
}
