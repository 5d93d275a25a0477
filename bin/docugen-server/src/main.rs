//! docugen-server – entry point.
//!
//! Startup order:
//! 1. Load `.env` (if present) and parse configuration from the environment.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Prepare the media directory and wire the generation pipeline.
//! 4. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let dotenv = dotenvy::dotenv();
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: DOCUGEN_LOG='{}' is not a valid tracing filter ({}); \
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

    info!(version = env!("CARGO_PKG_VERSION"), "docugen-server starting");
    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "failed to load .env"),
    }

    // ── 3. Media directory & pipeline ──────────────────────────────────────────
    tokio::fs::create_dir_all(&cfg.media_dir).await?;
    info!(media_dir = %cfg.media_dir.display(), "media directory ready");

    for (variable, value) in [
        ("OPENAI_API_KEY", &cfg.openai_api_key),
        ("ELEVENLABS_API_KEY", &cfg.elevenlabs_api_key),
    ] {
        if value.is_none() {
            warn!(variable, "credential not set; generations will fail");
        }
    }
    if cfg.pexels_api_key.is_none() {
        info!("PEXELS_API_KEY not set; videos will use placeholder images");
    }

    let addr: SocketAddr = cfg.bind_address.parse()?;
    let state = Arc::new(AppState::from_config(cfg));

    // ── 4. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let in_flight = state.pipeline.tasks().in_flight();
    if in_flight > 0 {
        warn!(in_flight, "shutting down with generations still running");
    }
    info!("docugen-server stopped");
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
        use tokio::signal::unix::{signal, SignalKind};
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

    info!("shutdown signal received; starting graceful shutdown");
}
