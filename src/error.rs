//! Shared error taxonomy for the core services and the HTTP surface.
//!
//! Every registry and ledger operation returns one of these variants so that
//! any caller (HTTP handler, internal scheduler, test) gets identical
//! guarantees. The HTTP mapping lives here too: each variant has a fixed
//! status code and serializes as a `{ "message": ... }` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error kinds surfaced by the core services.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Input failed shape or length validation. Names the offending field.
    #[error("Validation failed on '{field}': {message}")]
    Validation { field: &'static str, message: String },

    /// No active subscription for the acting user.
    #[error("An active subscription is required")]
    SubscriptionRequired,

    /// The user already owns as many agents as their plan permits.
    #[error("Agent quota exceeded: plan allows at most {limit} agents")]
    QuotaExceeded { limit: u32 },

    /// Missing resource, or a resource owned by someone else. Ownership and
    /// existence are indistinguishable to the caller.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Unexpected failure in a collaborator.
    #[error("An unexpected error occurred")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Shorthand for a validation failure on a named field.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::SubscriptionRequired | Self::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Internal(err) = &self {
            tracing::error!("Internal error: {:#}", err);
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::validation("name", "too short").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::SubscriptionRequired.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::QuotaExceeded { limit: 2 }.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::NotFound("Agent").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Unauthorized("Invalid token".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_messages_name_the_field() {
        let err = ApiError::validation("objective", "must be at least 10 characters");
        assert!(err.to_string().contains("objective"));
    }
}
