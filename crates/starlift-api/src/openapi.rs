//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented control-plane routes into one OpenAPI
//! spec served at `/openapi.json`. The WebSocket endpoints are not part
//! of the spec — they are documented in the proto crate.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the control plane.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Starlift Coordinator API",
        version = "0.3.2",
        description = "Control plane of the Starlift coordinator: start and follow platform transfers between game-server instances, browse staged exports, query the transaction log, and fetch live platform trees.",
        license(name = "BUSL-1.1")
    ),
    paths(
        crate::routes::transfers::start_transfer,
        crate::routes::transfers::transfer_export,
        crate::routes::transfers::list_transfers,
        crate::routes::transfers::get_transfer,
        crate::routes::transfers::get_transfer_log,
        crate::routes::exports::list_exports,
        crate::routes::exports::get_export,
        crate::routes::tree::get_tree,
        crate::routes::logs::list_logs,
        crate::routes::logs::get_log,
    ),
    components(schemas(
        crate::routes::transfers::TransferExportRequest,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "transfers", description = "Platform transfer saga entry points and state"),
        (name = "exports", description = "Staged export payloads"),
        (name = "logs", description = "Durable transaction log"),
        (name = "tree", description = "Live instance/platform tree"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_generates_with_all_paths() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Starlift Coordinator API");
        for path in [
            "/v1/transfers",
            "/v1/transfers/start",
            "/v1/transfers/{id}",
            "/v1/transfers/{id}/log",
            "/v1/exports",
            "/v1/exports/{id}",
            "/v1/tree",
            "/v1/logs",
            "/v1/logs/{id}",
        ] {
            assert!(
                spec.paths.paths.contains_key(path),
                "spec missing path {path}"
            );
        }
    }

    #[test]
    fn spec_serializes_to_json() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("openapi"));
        assert!(json.contains("Starlift"));
    }
}
