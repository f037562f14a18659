//! # Platform Tree API
//!
//! On-demand tree snapshots for operator views. Subscribed clients get
//! pushed (rate-limited) snapshots instead; this endpoint always builds a
//! fresh one.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use starlift_registry::TreeSnapshot;

use crate::state::AppState;

/// Query parameters for tree snapshots.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct TreeParams {
    /// The force whose tree to build (default `player`).
    pub force: Option<String>,
}

/// Build the tree router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/tree", get(get_tree))
}

/// GET /v1/tree — Live instance/platform tree for one force.
#[utoipa::path(
    get,
    path = "/v1/tree",
    params(("force" = Option<String>, Query, description = "Force name (default player)")),
    responses((status = 200, description = "Tree snapshot")),
    tag = "tree"
)]
pub(crate) async fn get_tree(
    State(state): State<AppState>,
    Query(params): Query<TreeParams>,
) -> Json<TreeSnapshot> {
    let force = params.force.as_deref().unwrap_or("player");
    Json(state.tree.build_tree(force).await)
}
