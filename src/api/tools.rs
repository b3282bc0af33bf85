//! Tool catalog API endpoints.

use axum::{
    extract::{Path as AxumPath, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::tools::ToolSpec;

/// Create tool routes.
pub fn routes() -> Router<Arc<super::routes::AppState>> {
    Router::new()
        .route("/", get(list_tools))
        .route("/:id/toggle", post(toggle_tool))
}

#[derive(Debug, Deserialize)]
pub struct ToggleToolRequest {
    pub active: bool,
}

/// GET /api/tools - List the tool catalog.
async fn list_tools(
    State(state): State<Arc<super::routes::AppState>>,
) -> Result<Json<Vec<ToolSpec>>, ApiError> {
    Ok(Json(state.catalog.list().await))
}

/// POST /api/tools/:id/toggle - Activate or deactivate a catalog entry.
///
/// Deactivation does not touch agent tool lists; the entry is skipped at
/// execution time instead.
async fn toggle_tool(
    State(state): State<Arc<super::routes::AppState>>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<ToggleToolRequest>,
) -> Result<Json<ToolSpec>, ApiError> {
    let tool = state.catalog.set_active(&id, req.active).await?;
    tracing::info!(
        "Tool '{}' {}",
        tool.id,
        if tool.active { "activated" } else { "deactivated" }
    );
    Ok(Json(tool))
}
