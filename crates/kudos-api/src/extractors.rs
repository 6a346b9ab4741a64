//! # Request Extractors
//!
//! - [`Validate`] + [`extract_validated_json`] — request bodies are taken
//!   as `Result<Json<T>, JsonRejection>` so malformed JSON becomes our
//!   own 400 body instead of axum's default, then run through the type's
//!   `validate()` before the handler sees them.
//! - [`CurrentUser`] — the authenticated caller, injected by the auth
//!   middleware as a request extension.

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::Json;
use kudos_core::UserId;

use crate::error::ApiError;

/// Structural validation for request bodies, run after deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON body, mapping both deserialization failures and
/// `validate()` failures to 400 responses.
pub fn extract_validated_json<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    let Json(value) = body.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    value.validate().map_err(ApiError::Validation)?;
    Ok(value)
}

/// The authenticated caller, resolved by the session middleware.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: UserId,
    pub is_admin: bool,
}

impl CurrentUser {
    /// Guard an admin-only operation.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("admin privileges required".to_string()))
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
    }
}
