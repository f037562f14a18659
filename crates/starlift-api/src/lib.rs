//! # starlift-api — Coordinator Control Plane & Socket Layer
//!
//! The HTTP/WebSocket face of the Starlift coordinator.
//!
//! ## Surface
//!
//! | Route | Module | Purpose |
//! |-------|--------|---------|
//! | `POST /v1/transfers/start` | [`routes::transfers`] | One-shot export-and-transfer |
//! | `POST /v1/transfers` | [`routes::transfers`] | Transfer a stored export |
//! | `GET /v1/transfers[/{id}[/log]]` | [`routes::transfers`] | Transfer state & logs |
//! | `GET /v1/exports[/{id}]`, `POST /v1/exports/upload` | [`routes::exports`] | Staged exports |
//! | `GET /v1/logs[/{id}]` | [`routes::logs`] | Transaction log |
//! | `GET /v1/tree` | [`routes::tree`] | Live platform tree |
//! | `GET /ws/instance` | [`ws::instance`] | Instance RPC/event socket |
//! | `GET /ws/client` | [`ws::client`] | Subscriber socket |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! Health probes, `/metrics`, and the WebSocket endpoints sit outside the
//! bearer-auth middleware: probes must work without credentials, and
//! sockets authenticate in their own handshakes.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod ws;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Export payloads ride in request bodies; the transport-level frame cap
/// is the real bound, this just keeps arbitrary other routes sane.
const MAX_BODY_BYTES: usize = 128 * 1024 * 1024;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = state.metrics.clone();

    let api = Router::new()
        .merge(routes::transfers::router())
        .merge(routes::exports::router())
        .merge(routes::tree::router())
        .merge(routes::logs::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .with_state(state.clone());

    // Unauthenticated surface: probes, metrics scrape, and the sockets
    // (which authenticate inside their handshakes).
    let public = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics_endpoint))
        .route("/ws/instance", get(ws::instance::instance_socket))
        .route("/ws/client", get(ws::client::client_socket))
        .with_state(state);

    Router::new().merge(public).merge(api)
}

/// Liveness probe — 200 whenever the process is serving.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the coordinator can actually do work.
///
/// Checks that the shared stores are accessible and the data directory is
/// writable (persistence would otherwise fail silently until the first
/// transfer completes).
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let _ = state.store.len();
    let _ = state.journal.persisted_len();

    let probe = state.config.data_dir.join(".readiness");
    if let Err(err) = std::fs::create_dir_all(&state.config.data_dir)
        .and_then(|()| std::fs::write(&probe, b"ok"))
    {
        tracing::warn!(%err, "data directory is not writable");
        return (StatusCode::SERVICE_UNAVAILABLE, "data directory not writable")
            .into_response();
    }
    let _ = std::fs::remove_file(&probe);

    (StatusCode::OK, "ready").into_response()
}

/// GET /metrics — Prometheus text exposition.
async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.set_coordinator_gauges(
        state.orchestrator.active_len(),
        state.store.len(),
        state.gateway.connected_instances().len(),
        state.fanout.client_count(),
    );
    match state.metrics.gather_and_encode() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => {
            tracing::error!(%err, "metrics encoding failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable").into_response()
        }
    }
}
