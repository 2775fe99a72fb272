mod config;
mod error;
mod handlers;
mod identity;
mod metrics;
mod models;
mod rate_limit;
mod state;
mod sweeper;
mod upstream;

use anyhow::Context;
use clap::Parser; // for cli
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Args;
use crate::rate_limit::RateLimiter;
use crate::state::AppState;
use crate::upstream::UpstreamClient;

// this is main async function with tokio
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "chat_gateway=info".into()),
        )
        .with_target(false)
        .init();

    // parse cli arguments
    let args = Args::parse();

    let models = args.model_list();
    if models.is_empty() {
        anyhow::bail!("at least one model id is required");
    }

    let upstream = UpstreamClient::new(
        args.upstream_url.clone(),
        args.api_key.clone(),
        args.request_timeout(),
    )
    .context("failed to build HTTP client")?;
    if !upstream.has_api_key() {
        warn!("OPENCODE_API_KEY is not set, generate requests will be refused");
    }

    // creating shared state
    let state = Arc::new(AppState {
        upstream,
        rate_limiter: RateLimiter::new(args.rate_limit, args.rate_window()),
        rate_window: args.rate_window(),
        models,
    });

    // spawn the background sweeper
    if let Some(every) = args.sweep_interval() {
        tokio::spawn(sweeper::quota_sweeper(Arc::clone(&state), every));
    }

    let app = handlers::router(Arc::clone(&state));

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(port = args.port, "gateway listening");
    info!(upstream = %state.upstream.url(), "forwarding chat completions");
    info!(
        limit = args.rate_limit,
        window = %error::describe_window(args.rate_window()),
        "rate limit configured"
    );
    info!(models = ?state.models, "accepted models");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("gateway stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
