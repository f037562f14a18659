// SPDX-License-Identifier: BUSL-1.1
//! # starlift-coordinator — Binary Entry Point
//!
//! Starts the coordinator: loads persisted state from the data directory,
//! binds the HTTP/WebSocket listener, and flushes durable state on
//! shutdown.

use tracing_subscriber::EnvFilter;

use starlift_api::config::CoordinatorConfig;
use starlift_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = CoordinatorConfig::from_env();
    let port = config.port;
    tracing::info!(
        port,
        data_dir = %config.data_dir.display(),
        auth = config.auth_token.is_some(),
        "starting starlift coordinator"
    );

    let state = AppState::new(config);
    let app = starlift_api::app(state.clone());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("starlift coordinator listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down; flushing durable state");
    state.shutdown_flush().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
