//! # Transaction Log API
//!
//! Queries over the durable audit trail: summaries (active transfers
//! unioned with the persisted window) and full per-transfer records.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use starlift_core::TransferId;

use crate::error::ApiError;
use crate::routes::transfers::ListParams;
use crate::state::AppState;

/// Build the logs router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/logs", get(list_logs))
        .route("/v1/logs/:id", get(get_log))
}

/// GET /v1/logs — Transaction-log summaries, newest first.
#[utoipa::path(
    get,
    path = "/v1/logs",
    params(("limit" = Option<usize>, Query, description = "Max summaries (default 50, max 500)")),
    responses((status = 200, description = "Transaction log summaries")),
    tag = "logs"
)]
pub(crate) async fn list_logs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Value> {
    let logs = state
        .orchestrator
        .transfer_summaries(params.effective_limit());
    Json(json!({"logs": logs}))
}

/// GET /v1/logs/:id — Full transaction log for one transfer.
#[utoipa::path(
    get,
    path = "/v1/logs/{id}",
    params(("id" = String, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Transaction log record"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "logs"
)]
pub(crate) async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let transfer_id =
        TransferId::new(id.as_str()).map_err(|err| ApiError::Validation(err.to_string()))?;
    state
        .orchestrator
        .transaction_log(&transfer_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no transaction log for {id}")))
}
