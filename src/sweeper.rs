use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{debug, info};

use crate::metrics::QUOTA_RECORDS;
use crate::state::AppState;

// Expired-record sweep - keeps the quota table from growing forever

pub async fn quota_sweeper(state: Arc<AppState>, sweep_interval: Duration) {
    let mut interval = interval(sweep_interval);

    info!(interval = ?sweep_interval, "quota sweeper started");

    loop {
        interval.tick().await;

        let removed = state.rate_limiter.purge_expired();
        let tracked = state.rate_limiter.tracked();
        QUOTA_RECORDS.set(tracked as f64);

        if removed > 0 {
            info!(removed, tracked, "swept expired quota records");
        } else {
            debug!(tracked, "no expired quota records");
        }
    }
}
