//! apa-server – entry point.
//!
//! Startup order:
//! 1. Load configuration from the environment, then apply CLI overrides.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Build the OpenRouter provider and shared application state.
//! 4. Serve the Axum router until SIGINT/SIGTERM, then cancel in-flight
//!    provider calls and drain.

mod config;
mod error;
mod middleware;
mod prompt;
mod provider;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use apa_core::cancel;
use clap::Parser;
use tracing::{info, warn};

use crate::config::Config;
use crate::provider::OpenRouterProvider;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "apa-server", version, about = "APA Agent chat relay")]
struct Args {
    /// Address to listen on; overrides APA_BIND.
    #[arg(long)]
    bind: Option<String>,

    /// Upstream model identifier; overrides APA_MODEL.
    #[arg(long)]
    model: Option<String>,

    /// Emit JSON log lines; overrides APA_LOG_JSON.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let args = Args::parse();
    let mut cfg = Config::from_env();
    if let Some(bind) = args.bind {
        cfg.bind_address = bind;
    }
    if let Some(model) = args.model {
        cfg.model = model;
    }
    cfg.log_json |= args.log_json;

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: APA_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "apa-server starting");
    info!(config = ?cfg, "configuration loaded");

    // ── 3. Provider and state ──────────────────────────────────────────────────
    let provider = Arc::new(OpenRouterProvider::new(&cfg)?);
    info!(
        model = provider.model(),
        credential = provider.has_credential(),
        "provider ready"
    );
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let state = Arc::new(AppState::new(cfg, provider));

    // ── 4. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            cancel::cancel(&shutdown);
        })
        .await?;

    info!("apa-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; cancelling in-flight provider calls");
}
