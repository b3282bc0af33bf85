//! JWT auth for the dashboard.
//!
//! - Clients register or log in with email + password
//! - The server returns a JWT carrying the user id
//! - All other API endpoints require `Authorization: Bearer <jwt>`
//!
//! # Security notes
//! - Login uses a single generic error message for both unknown email and
//!   wrong password to prevent account enumeration.
//! - Use a strong `JWT_SECRET` in production.

use axum::{
    body::Body,
    extract::{Extension, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use uuid::Uuid;

use super::routes::AppState;
use super::types::{AuthResponse, LoginRequest, RegisterRequest};
use crate::error::ApiError;
use crate::users::{PublicUser, User};

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    /// Subject: the user id
    sub: Uuid,
    /// Issued-at unix seconds
    iat: i64,
    /// Expiration unix seconds
    exp: i64,
}

/// The authenticated caller, inserted as a request extension by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

fn issue_jwt(secret: &str, ttl_hours: i64, user: &User) -> anyhow::Result<String> {
    let now = Utc::now();
    let exp = now + Duration::hours(ttl_hours.max(1));
    let claims = Claims {
        sub: user.id,
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

fn verify_jwt(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let validation = Validation::default();
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/auth/register - Create an account and return `{ user, token }`.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let user = state
        .users
        .register(&req.email, &req.name, &req.password)
        .await?;

    let token = issue_jwt(&state.config.jwt_secret, state.config.jwt_ttl_hours, &user)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            token,
        }),
    ))
}

/// POST /api/auth/login - Verify credentials and return `{ user, token }`.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state
        .users
        .verify_credentials(&req.email, &req.password)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let token = issue_jwt(&state.config.jwt_secret, state.config.jwt_ttl_hours, &user)?;

    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

/// GET /api/auth/me - The authenticated user's account.
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .users
        .get(auth.id)
        .await
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user.into()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Require a valid bearer token and resolve it to an [`AuthUser`].
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .unwrap_or("");

    if token.is_empty() {
        return ApiError::Unauthorized("Authentication required".to_string()).into_response();
    }

    let claims = match verify_jwt(token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(_) => {
            return ApiError::Unauthorized("Invalid or expired token".to_string()).into_response();
        }
    };

    // The token may outlive the account; resolve the user on every request.
    let user = match state.users.get(claims.sub).await {
        Some(user) => user,
        None => {
            return ApiError::Unauthorized("Invalid token".to_string()).into_response();
        }
    };

    req.extensions_mut().insert(AuthUser {
        id: user.id,
        email: user.email,
    });
    next.run(req).await
}
