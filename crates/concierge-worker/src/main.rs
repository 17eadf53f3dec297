//! Concierge worker binary: the voice-assistant worker process.
//!
//! Loads credentials and configuration once at startup, initializes
//! structured logging, then runs two independent tasks: the worker that
//! turns dispatched jobs into voice sessions, and the HTTP control /
//! liveness surface. Shuts down gracefully on SIGTERM/SIGINT.

mod assistant;
mod config;
mod http;

use assistant::Assistant;
use concierge_agent::{LiveKitConnector, Worker, WorkerOptions};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("CONCIERGE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    // Credentials file first, so the overrides below can see its values.
    let env_file_loaded = dotenvy::from_filename(".env.local").is_ok();

    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("concierge.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the worker cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    if env_file_loaded {
        tracing::info!("loaded credentials from .env.local");
    }
    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Assemble the worker
    let options = WorkerOptions {
        host: config.worker.host,
        port: config.worker.port,
    };
    let connector = Arc::new(LiveKitConnector::new(config.livekit.clone()));
    let handler = Arc::new(Assistant::new(
        config.session.clone(),
        config.provider_credentials(),
    ));
    let (worker, queue) = Worker::new(handler, connector);

    // Control / liveness surface
    let app = http::router(http::AppState {
        queue,
        health_enabled: config.health.enabled,
    });
    let addr = options.addr();

    tracing::info!(%addr, health = config.health.enabled, "starting concierge worker");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    worker.run(shutdown_signal()).await;

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "control surface error"),
        Err(e) => tracing::error!(error = %e, "control surface task failed"),
    }

    tracing::info!("concierge worker shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
