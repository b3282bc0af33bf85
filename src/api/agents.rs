//! Agent management API endpoints.
//!
//! Provides endpoints for the dashboard's agent operations:
//! - List agents
//! - Create agent
//! - Get agent details
//! - Update agent
//! - Delete agent
//! - Execute a task

use axum::{
    extract::{Extension, Path as AxumPath, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::agents::{Agent, AgentPatch, AgentStatus, HistoryEntry};
use crate::engine::TaskOutcome;
use crate::error::ApiError;

/// Create agent routes.
pub fn routes() -> Router<Arc<super::routes::AppState>> {
    Router::new()
        .route("/", get(list_agents))
        .route("/", post(create_agent))
        .route("/:id", get(get_agent))
        .route("/:id", put(update_agent))
        .route("/:id", delete(delete_agent))
        .route("/:id/execute", post(execute_task))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRequest {
    pub name: String,
    pub objective: String,
    #[serde(default)]
    pub active_tools: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAgentRequest {
    pub name: Option<String>,
    pub objective: Option<String>,
    pub status: Option<AgentStatus>,
    pub current_task: Option<String>,
    pub active_tools: Option<Vec<String>>,
}

impl From<UpdateAgentRequest> for AgentPatch {
    fn from(req: UpdateAgentRequest) -> Self {
        Self {
            name: req.name,
            objective: req.objective,
            status: req.status,
            current_task: req.current_task,
            active_tools: req.active_tools,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExecuteTaskRequest {
    pub task: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub id: Uuid,
    pub name: String,
    pub objective: String,
    pub status: AgentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    pub progress: u8,
    pub active_tools: Vec<String>,
    pub history: Vec<HistoryEntry>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Agent> for AgentResponse {
    fn from(a: Agent) -> Self {
        Self {
            id: a.id,
            name: a.name,
            objective: a.objective,
            status: a.status,
            current_task: a.current_task,
            progress: a.progress,
            active_tools: a.active_tools,
            history: a.history,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/agents - List the caller's agents.
async fn list_agents(
    State(state): State<Arc<super::routes::AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<AgentResponse>>, ApiError> {
    let agents = state.registry.list(auth.id).await;
    let responses: Vec<AgentResponse> = agents.into_iter().map(Into::into).collect();
    Ok(Json(responses))
}

/// POST /api/agents - Create a new agent.
async fn create_agent(
    State(state): State<Arc<super::routes::AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateAgentRequest>,
) -> Result<(StatusCode, Json<AgentResponse>), ApiError> {
    let agent = state
        .registry
        .create(auth.id, req.name, req.objective, req.active_tools)
        .await?;

    Ok((StatusCode::CREATED, Json(agent.into())))
}

/// GET /api/agents/:id - Get agent details.
async fn get_agent(
    State(state): State<Arc<super::routes::AppState>>,
    Extension(auth): Extension<AuthUser>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<Json<AgentResponse>, ApiError> {
    let agent = state.registry.get(auth.id, id).await?;
    Ok(Json(agent.into()))
}

/// PUT /api/agents/:id - Update an agent.
async fn update_agent(
    State(state): State<Arc<super::routes::AppState>>,
    Extension(auth): Extension<AuthUser>,
    AxumPath(id): AxumPath<Uuid>,
    Json(req): Json<UpdateAgentRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    let agent = state.registry.update(auth.id, id, req.into()).await?;
    Ok(Json(agent.into()))
}

/// DELETE /api/agents/:id - Delete an agent and its history.
async fn delete_agent(
    State(state): State<Arc<super::routes::AppState>>,
    Extension(auth): Extension<AuthUser>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.registry.delete(auth.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/agents/:id/execute - Run a task against an agent.
///
/// A tool failure is reported inside the outcome body, not as an HTTP error.
async fn execute_task(
    State(state): State<Arc<super::routes::AppState>>,
    Extension(auth): Extension<AuthUser>,
    AxumPath(id): AxumPath<Uuid>,
    Json(req): Json<ExecuteTaskRequest>,
) -> Result<Json<TaskOutcome>, ApiError> {
    let outcome = state.engine.execute_task(auth.id, id, &req.task).await?;
    Ok(Json(outcome))
}
