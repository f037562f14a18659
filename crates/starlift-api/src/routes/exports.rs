//! # Export API
//!
//! Stored-export enumeration and download, plus the uploaded-payload
//! one-shot import. Listings return metadata only; the payload is served
//! by the download endpoint (payloads can be large — the list view must
//! stay cheap).

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use starlift_core::ExportId;

use crate::error::ApiError;
use crate::routes::transfers::upload_import;
use crate::state::AppState;

/// Build the exports router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/exports", get(list_exports))
        .route("/v1/exports/upload", post(upload_import))
        .route("/v1/exports/:id", get(get_export))
}

/// GET /v1/exports — Stored export metadata, newest first.
#[utoipa::path(
    get,
    path = "/v1/exports",
    responses((status = 200, description = "Stored exports")),
    tag = "exports"
)]
pub(crate) async fn list_exports(State(state): State<AppState>) -> Json<Value> {
    let exports: Vec<Value> = state
        .store
        .list()
        .into_iter()
        .map(|record| {
            json!({
                "exportId": record.export_id,
                "platformName": record.platform_name,
                "sourceInstanceId": record.source_instance_id,
                "timestamp": record.timestamp,
                "size": record.size,
            })
        })
        .collect();
    Json(json!({"exports": exports}))
}

/// GET /v1/exports/:id — Download a stored export, payload included.
#[utoipa::path(
    get,
    path = "/v1/exports/{id}",
    params(("id" = String, Path, description = "Export id")),
    responses(
        (status = 200, description = "Export record with payload"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "exports"
)]
pub(crate) async fn get_export(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let export_id =
        ExportId::new(id.as_str()).map_err(|err| ApiError::Validation(err.to_string()))?;
    let record = state
        .store
        .get(&export_id)
        .ok_or_else(|| ApiError::NotFound(format!("export {id} not found")))?;
    serde_json::to_value(&record)
        .map(Json)
        .map_err(|err| ApiError::Internal(err.to_string()))
}
