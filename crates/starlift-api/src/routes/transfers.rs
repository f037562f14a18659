// SPDX-License-Identifier: BUSL-1.1
//! # Transfer API
//!
//! Starting transfers (from a live platform or from a stored export) and
//! querying their state. Starting a transfer is synchronous up to the
//! point where the target has accepted the import — the response carries
//! the transfer id, and everything after (validation, cleanup) is
//! observable via the transfer/log channels and the endpoints here.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use starlift_core::{ExportId, InstanceRef, TransferId};
use starlift_orchestrator::{StartTransferRequest, TransferStarted, UploadImportRequest};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for transfer listings.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct ListParams {
    /// Maximum number of summaries to return (default 50, max 500).
    pub limit: Option<usize>,
}

impl ListParams {
    const DEFAULT_LIMIT: usize = 50;
    const MAX_LIMIT: usize = 500;

    pub(crate) fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT)
    }
}

/// Request to transfer an already-stored export.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransferExportRequest {
    /// The stored export to ship.
    pub export_id: String,
    /// Destination instance, by id or name.
    pub target_instance_id: InstanceRef,
}

/// Build the transfers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/transfers",
            get(list_transfers).post(transfer_export),
        )
        .route("/v1/transfers/start", post(start_transfer))
        .route("/v1/transfers/:id", get(get_transfer))
        .route("/v1/transfers/:id/log", get(get_transfer_log))
}

/// POST /v1/transfers/start — One-shot export-and-transfer of a live
/// platform.
#[utoipa::path(
    post,
    path = "/v1/transfers/start",
    responses(
        (status = 200, description = "Transfer started"),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 502, description = "Instance refused", body = crate::error::ErrorBody),
    ),
    tag = "transfers"
)]
pub(crate) async fn start_transfer(
    State(state): State<AppState>,
    Json(request): Json<StartTransferRequest>,
) -> Result<Json<Value>, ApiError> {
    let started = state.orchestrator.start_platform_transfer(request).await?;
    Ok(Json(started_body(started)))
}

/// POST /v1/transfers — Transfer an already-stored export.
#[utoipa::path(
    post,
    path = "/v1/transfers",
    request_body = TransferExportRequest,
    responses(
        (status = 200, description = "Transfer started"),
        (status = 404, description = "Export not found", body = crate::error::ErrorBody),
    ),
    tag = "transfers"
)]
pub(crate) async fn transfer_export(
    State(state): State<AppState>,
    Json(request): Json<TransferExportRequest>,
) -> Result<Json<Value>, ApiError> {
    let export_id = ExportId::new(request.export_id)
        .map_err(|err| ApiError::Validation(err.to_string()))?;
    let started = state
        .orchestrator
        .transfer_existing_export(export_id, request.target_instance_id)
        .await?;
    Ok(Json(started_body(started)))
}

/// GET /v1/transfers — Transfer summaries, newest first.
#[utoipa::path(
    get,
    path = "/v1/transfers",
    params(("limit" = Option<usize>, Query, description = "Max summaries (default 50, max 500)")),
    responses((status = 200, description = "Transfer summaries")),
    tag = "transfers"
)]
pub(crate) async fn list_transfers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Value> {
    let transfers = state
        .orchestrator
        .transfer_summaries(params.effective_limit());
    Json(json!({"transfers": transfers}))
}

/// GET /v1/transfers/:id — The live transfer record.
#[utoipa::path(
    get,
    path = "/v1/transfers/{id}",
    params(("id" = String, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Transfer record"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "transfers"
)]
pub(crate) async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let transfer_id = parse_transfer_id(&id)?;
    let transfer = state
        .orchestrator
        .get_transfer(&transfer_id)
        .ok_or_else(|| ApiError::NotFound(format!("transfer {id} not found")))?;
    serde_json::to_value(&transfer)
        .map(Json)
        .map_err(|err| ApiError::Internal(err.to_string()))
}

/// GET /v1/transfers/:id/log — Full transaction log (live or persisted).
#[utoipa::path(
    get,
    path = "/v1/transfers/{id}/log",
    params(("id" = String, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Transaction log record"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "transfers"
)]
pub(crate) async fn get_transfer_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let transfer_id = parse_transfer_id(&id)?;
    state
        .orchestrator
        .transaction_log(&transfer_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no transaction log for {id}")))
}

/// POST /v1/exports/upload lives in the exports module but reuses the
/// orchestrator's upload path; declared here to keep the saga entry
/// points together.
pub(crate) async fn upload_import(
    State(state): State<AppState>,
    Json(request): Json<UploadImportRequest>,
) -> Result<Json<Value>, ApiError> {
    let imported = state.orchestrator.import_uploaded_export(request).await?;
    Ok(Json(json!({
        "success": true,
        "exportId": imported.export_id,
        "targetInstanceId": imported.target_instance_id,
    })))
}

fn started_body(started: TransferStarted) -> Value {
    json!({"success": true, "transferId": started.transfer_id})
}

fn parse_transfer_id(raw: &str) -> Result<TransferId, ApiError> {
    TransferId::new(raw).map_err(|err| ApiError::Validation(err.to_string()))
}
