//! Subscription API endpoints.
//!
//! Subscribing again supersedes the current plan; the previous record is
//! kept in the ledger's history.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::subscription::{Plan, Subscription, SubscriptionStatus};

/// Create subscription routes.
pub fn routes() -> Router<Arc<super::routes::AppState>> {
    Router::new()
        .route("/", post(create_subscription))
        .route("/current", get(current_subscription))
        .route("/current", delete(cancel_subscription))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Plan name: "trial", "monthly" or "yearly".
    pub plan: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub start_date: chrono::DateTime<chrono::Utc>,
    pub end_date: chrono::DateTime<chrono::Utc>,
    pub max_agents: u32,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(s: Subscription) -> Self {
        Self {
            id: s.id,
            plan: s.plan,
            status: s.status,
            start_date: s.start_date,
            end_date: s.end_date,
            max_agents: s.max_agents,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/subscriptions - Subscribe the caller to a plan.
async fn create_subscription(
    State(state): State<Arc<super::routes::AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), ApiError> {
    let plan = Plan::parse(&req.plan)?;
    let subscription = state.ledger.create(auth.id, plan).await?;

    Ok((StatusCode::CREATED, Json(subscription.into())))
}

/// GET /api/subscriptions/current - The caller's current subscription.
async fn current_subscription(
    State(state): State<Arc<super::routes::AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let subscription = state
        .ledger
        .current_for(auth.id)
        .await
        .ok_or(ApiError::NotFound("Subscription"))?;
    Ok(Json(subscription.into()))
}

/// DELETE /api/subscriptions/current - Cancel the caller's subscription.
async fn cancel_subscription(
    State(state): State<Arc<super::routes::AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let cancelled = state.ledger.cancel(auth.id).await?;
    Ok(Json(cancelled.into()))
}
