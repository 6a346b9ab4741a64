//! # API Error Type
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Every error becomes a JSON `{"message": ...}` body with a conventional
//! status code; internal error details are logged via `tracing` and never
//! echoed to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kudos_ledger::LedgerError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// JSON error response body. All error responses use this shape.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request content failed validation (400).
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403).
    #[error("{0}")]
    Forbidden(String),

    /// Resource does not exist, or is hidden from this caller (404).
    #[error("{0}")]
    NotFound(String),

    /// Conflict with current state, e.g. the per-card like cap (409).
    #[error("{0}")]
    Conflict(String),

    /// Internal fault (500). The message is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),

    /// A dependency this deployment does not configure, e.g. OAuth login
    /// without a provider (503).
    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Convenience constructor for a 404 on a card, used wherever hidden
    /// cards must be indistinguishable from absent ones.
    pub fn card_not_found(id: impl std::fmt::Display) -> Self {
        ApiError::NotFound(format!("card {id} not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal server error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}

impl From<kudos_core::ValidationError> for ApiError {
    fn from(err: kudos_core::ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

/// Ledger rejections map per operation semantics: budget and eligibility
/// failures are client errors, the spend cap is a state conflict, and a
/// hidden card stays indistinguishable from a missing one.
impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match &err {
            LedgerError::LikeCapReached { .. } => ApiError::Conflict(err.to_string()),
            LedgerError::CardHidden => ApiError::NotFound("card not found".to_string()),
            LedgerError::InactiveUser => ApiError::Forbidden(err.to_string()),
            LedgerError::InsufficientBudget { .. }
            | LedgerError::SelfCard
            | LedgerError::SelfLike
            | LedgerError::RecipientLike => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<kudos_auth::AuthError> for ApiError {
    fn from(err: kudos_auth::AuthError) -> Self {
        use kudos_auth::AuthError;
        match &err {
            AuthError::OAuthState => ApiError::Unauthorized(err.to_string()),
            AuthError::OAuthExchange(_) | AuthError::OAuthUserInfo(_) => {
                ApiError::Unauthorized("oauth sign-in failed".to_string())
            }
            AuthError::Hashing(_) | AuthError::MalformedHash(_) | AuthError::OAuthConfig(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(format!("database error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_parts(err: ApiError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn validation_maps_to_400() {
        let (status, body) = response_parts(ApiError::Validation("bad points".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "bad points");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let (status, body) = response_parts(ApiError::Internal("db connection refused".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("db connection"));
        assert_eq!(body.message, "An internal error occurred");
    }

    #[test]
    fn ledger_cap_maps_to_conflict() {
        let err = ApiError::from(LedgerError::LikeCapReached { cap: 30, spent: 30 });
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn ledger_hidden_card_maps_to_not_found() {
        let err = ApiError::from(LedgerError::CardHidden);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(!err.to_string().contains("hidden"));
    }

    #[test]
    fn ledger_budget_maps_to_bad_request() {
        let err = ApiError::from(LedgerError::InsufficientBudget {
            required: 2,
            available: 0,
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
