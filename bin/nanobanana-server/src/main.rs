//! nanobanana-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON or human-readable).
//! 3. Open the media directory and the credential store.
//! 4. Build the Gemini transport and generator.
//! 5. Start the retention sweeper in a background task.
//! 6. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod middleware;
mod models;
mod retention;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use nanobanana_core::{FileCredentialStore, Generator, HttpTransport, MediaStore};
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: NANOBANANA_LOG='{}' is not a valid tracing filter ({}); \
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

    info!(version = env!("CARGO_PKG_VERSION"), "nanobanana-server starting");

    // ── 3. Storage ─────────────────────────────────────────────────────────────
    let media = Arc::new(MediaStore::open(&cfg.upload_dir, cfg.uploads_url()).await?);
    info!(dir = %cfg.upload_dir.display(), url = %cfg.uploads_url(), "media directory ready");

    let credentials = Arc::new(FileCredentialStore::new(&cfg.credential_path));
    info!(
        mode = %cfg.credential_mode,
        path = %cfg.credential_path.display(),
        "credential source configured"
    );

    // ── 4. Gemini ──────────────────────────────────────────────────────────────
    let transport = HttpTransport::new(&cfg.gemini_base_url, cfg.request_timeout())?;
    let generator = Generator::new(Arc::new(transport), Arc::clone(&media), &cfg.gemini_model)
        .with_finish_reason_check(cfg.check_finish_reason);
    info!(
        model = %cfg.gemini_model,
        base_url = %cfg.gemini_base_url,
        timeout_secs = cfg.request_timeout_secs,
        check_finish_reason = cfg.check_finish_reason,
        "generator ready"
    );

    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        media: Arc::clone(&media),
        credentials,
        generator: Arc::new(generator),
    });

    // ── 5. Retention sweeper ───────────────────────────────────────────────────
    let sweeper = retention::spawn(media, cfg.retention());

    // ── 6. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    info!("nanobanana-server stopped");
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

    info!("shutdown signal received; starting graceful shutdown");
}
