//! # Session Middleware
//!
//! Resolves the caller's session from `Authorization: Bearer <token>` or
//! the `kudos_session` cookie (bearer wins when both are present), checks
//! expiry, revocation, and account activation, and injects [`CurrentUser`]
//! into request extensions for handlers to extract.

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::config::SESSION_COOKIE;
use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::state::AppState;

/// Extract the presented session token, if any: the bearer token first,
/// then the session cookie.
pub fn bearer_or_cookie_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    for value in headers.get_all(COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some((name, token)) = pair.trim().split_once('=') {
                if name == SESSION_COOKIE && !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Resolve the caller or return the 401 to respond with.
fn resolve_caller(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    let token = bearer_or_cookie_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))?;

    let directory = state.directory.read();
    let session = directory
        .sessions
        .get(&token)
        .ok_or_else(|| ApiError::Unauthorized("invalid session".to_string()))?;
    if !session.is_valid(Utc::now()) {
        return Err(ApiError::Unauthorized("session expired".to_string()));
    }
    let user = directory
        .users
        .get(&session.user_id)
        .ok_or_else(|| ApiError::Unauthorized("invalid session".to_string()))?;
    if !user.is_active {
        return Err(ApiError::Unauthorized("account is deactivated".to_string()));
    }

    Ok(CurrentUser {
        id: user.id,
        is_admin: user.is_admin,
    })
}

/// Middleware enforcing an authenticated session on everything behind it.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_caller(&state, request.headers()) {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn bearer_token_wins_over_cookie() {
        let map = headers(&[
            ("authorization", "Bearer from-header"),
            ("cookie", "kudos_session=from-cookie"),
        ]);
        assert_eq!(bearer_or_cookie_token(&map).as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_is_parsed_among_others() {
        let map = headers(&[("cookie", "theme=dark; kudos_session=tok123; lang=ja")]);
        assert_eq!(bearer_or_cookie_token(&map).as_deref(), Some("tok123"));
    }

    #[test]
    fn missing_credentials_yield_none() {
        let map = headers(&[("cookie", "theme=dark")]);
        assert_eq!(bearer_or_cookie_token(&map), None);
        assert_eq!(bearer_or_cookie_token(&HeaderMap::new()), None);
    }

    #[test]
    fn empty_bearer_is_ignored() {
        let map = headers(&[("authorization", "Bearer ")]);
        assert_eq!(bearer_or_cookie_token(&map), None);
    }
}
