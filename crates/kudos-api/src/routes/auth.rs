//! # Auth API
//!
//! Registration, password login, logout, OAuth sign-in, and the password
//! reset flow. Successful logins answer with the session token in the
//! body *and* as an HttpOnly cookie — browser clients ride the cookie,
//! script clients use the bearer header.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use kudos_core::{validate_display_name, EmailAddress, ExternalIdentity, UserId, UserRecord};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::SESSION_COOKIE;
use crate::error::ApiError;
use crate::extractors::{extract_validated_json, CurrentUser, Validate};
use crate::middleware::auth::bearer_or_cookie_token;
use crate::routes::users::UserView;
use crate::state::{AppState, PendingOAuthRecord, ResetTokenRecord, SessionRecord};

/// Self-registration request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        if self.password.len() < 8 {
            return Err("password must be at least 8 characters".to_string());
        }
        if self.password.len() > 128 {
            return Err("password must not exceed 128 characters".to_string());
        }
        Ok(())
    }
}

/// Password login request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err("email and password are required".to_string());
        }
        Ok(())
    }
}

/// OAuth callback request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OAuthCallbackRequest {
    pub code: String,
    pub state: String,
}

impl Validate for OAuthCallbackRequest {
    fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() || self.state.trim().is_empty() {
            return Err("code and state are required".to_string());
        }
        Ok(())
    }
}

/// Password reset request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetRequest {
    pub email: String,
}

impl Validate for ResetRequest {
    fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() {
            return Err("email is required".to_string());
        }
        Ok(())
    }
}

/// Password reset confirmation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetConfirmRequest {
    pub token: String,
    pub new_password: String,
}

impl Validate for ResetConfirmRequest {
    fn validate(&self) -> Result<(), String> {
        if self.token.trim().is_empty() {
            return Err("token is required".to_string());
        }
        if self.new_password.len() < 8 {
            return Err("password must be at least 8 characters".to_string());
        }
        Ok(())
    }
}

/// Session issued on successful login.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

/// OAuth authorization bootstrap.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthorizeUrlResponse {
    pub auth_url: String,
    pub state: String,
}

/// Routes that must stay reachable without a session.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/oauth/authorize-url", get(oauth_authorize_url))
        .route("/api/auth/oauth/callback", post(oauth_callback))
        .route("/api/auth/password-reset/request", post(password_reset_request))
        .route("/api/auth/password-reset/confirm", post(password_reset_confirm))
}

/// Routes behind the session middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

fn session_cookie(state: &AppState, session: &SessionRecord) -> String {
    format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.token, state.config.session_ttl_secs
    )
}

/// Mint a session for `user` and build the login response carrying it in
/// both the body and the session cookie.
fn issue_session(state: &AppState, user: &UserRecord, status: StatusCode) -> (SessionRecord, Response) {
    let session = state.create_session(user.id);
    let cookie = session_cookie(state, &session);
    let departments = state
        .directory
        .read()
        .user_departments
        .get(&user.id)
        .cloned()
        .unwrap_or_default();
    let body = SessionResponse {
        token: session.token.clone(),
        expires_at: session.expires_at,
        user: UserView::from_record(user, departments),
    };
    let response = (status, [(SET_COOKIE, cookie)], Json(body)).into_response();
    (session, response)
}

/// Mirror a freshly minted session to the database.
async fn persist_session(state: &AppState, session: &SessionRecord) -> Result<(), ApiError> {
    if let Some(pool) = &state.db_pool {
        crate::db::sessions::insert_session(pool, session).await?;
    }
    Ok(())
}

/// POST /api/auth/register — Self-registration.
///
/// The very first account on a fresh deployment becomes the admin;
/// everyone after that is provisioned as a regular user.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = SessionResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = extract_validated_json(body)?;
    let email = EmailAddress::new(&req.email)?;
    let display_name = validate_display_name(&req.display_name)?;
    let password_hash = kudos_auth::hash_password(&req.password)?;

    let user = {
        let mut directory = state.directory.write();
        if directory.user_by_email(email.as_str()).is_some() {
            return Err(ApiError::Conflict("email already registered".to_string()));
        }
        let user = UserRecord {
            id: UserId::new(),
            email,
            display_name,
            weekly_points: state.config.weekly_budget,
            weekly_points_received: 0,
            total_points_received: 0,
            is_admin: directory.users.is_empty(),
            is_active: true,
            password_hash: Some(password_hash),
            external_identity: None,
            created_at: Utc::now(),
            last_login_at: Some(Utc::now()),
        };
        directory.users.insert(user.id, user.clone());
        user
    };

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::users::insert(pool, &user).await {
            tracing::error!(user_id = %user.id, error = %e, "failed to persist registration");
            return Err(ApiError::Internal(
                "user recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    let (session, response) = issue_session(&state, &user, StatusCode::CREATED);
    persist_session(&state, &session).await?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok(response)
}

/// POST /api/auth/login — Password login.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = extract_validated_json(body)?;
    let email = EmailAddress::new(&req.email)
        .map_err(|_| ApiError::Unauthorized("invalid email or password".to_string()))?;

    // Resolve and verify outside any lock: Argon2 verification is slow by
    // design and must not stall the directory.
    let user = state
        .directory
        .read()
        .user_by_email(email.as_str())
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("invalid email or password".to_string()))?;

    let stored = user
        .password_hash
        .as_deref()
        .ok_or_else(|| ApiError::Unauthorized("invalid email or password".to_string()))?;
    if !kudos_auth::verify_password(&req.password, stored)? {
        return Err(ApiError::Unauthorized("invalid email or password".to_string()));
    }
    if !user.is_active {
        return Err(ApiError::Unauthorized("account is deactivated".to_string()));
    }

    let now = Utc::now();
    {
        let mut directory = state.directory.write();
        if let Some(record) = directory.users.get_mut(&user.id) {
            record.last_login_at = Some(now);
        }
    }
    if let Some(pool) = &state.db_pool {
        crate::db::sessions::touch_last_login(pool, user.id, now).await?;
    }

    let (session, response) = issue_session(&state, &user, StatusCode::OK);
    persist_session(&state, &session).await?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok(response)
}

/// POST /api/auth/logout — Revoke the presented session.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Session revoked")),
    tag = "auth"
)]
async fn logout(
    State(state): State<AppState>,
    caller: CurrentUser,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = bearer_or_cookie_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))?;

    {
        let mut directory = state.directory.write();
        if let Some(session) = directory.sessions.get_mut(&token) {
            session.revoked = true;
        }
    }
    if let Some(pool) = &state.db_pool {
        crate::db::sessions::revoke_session(pool, &token).await?;
    }

    tracing::info!(user_id = %caller.id, "user logged out");
    // Expire the cookie client-side as well.
    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0");
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)]).into_response())
}

/// GET /api/auth/me — The authenticated user's own profile.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses((status = 200, description = "Current user", body = UserView)),
    tag = "auth"
)]
async fn me(State(state): State<AppState>, caller: CurrentUser) -> Result<Json<UserView>, ApiError> {
    let directory = state.directory.read();
    let user = directory
        .users
        .get(&caller.id)
        .ok_or_else(|| ApiError::Unauthorized("invalid session".to_string()))?;
    let departments = directory
        .user_departments
        .get(&caller.id)
        .cloned()
        .unwrap_or_default();
    Ok(Json(UserView::from_record(user, departments)))
}

/// GET /api/auth/oauth/authorize-url — Start an OAuth sign-in.
#[utoipa::path(
    get,
    path = "/api/auth/oauth/authorize-url",
    responses(
        (status = 200, description = "Authorization URL", body = AuthorizeUrlResponse),
        (status = 503, description = "OAuth not configured", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
async fn oauth_authorize_url(
    State(state): State<AppState>,
) -> Result<Json<AuthorizeUrlResponse>, ApiError> {
    let provider = state
        .oauth
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("oauth login is not configured".to_string()))?;

    let pending = provider.begin();
    let now = Utc::now();
    {
        let mut directory = state.directory.write();
        directory.purge_expired(now);
        directory.pending_oauth.insert(
            pending.state.clone(),
            PendingOAuthRecord {
                pkce_verifier: pending.pkce_verifier.clone(),
                expires_at: now + Duration::seconds(state.config.oauth_state_ttl_secs),
            },
        );
    }

    Ok(Json(AuthorizeUrlResponse {
        auth_url: pending.auth_url,
        state: pending.state,
    }))
}

/// POST /api/auth/oauth/callback — Complete an OAuth sign-in.
///
/// Links the external identity to an existing account by (provider,
/// subject), falling back to the verified email, and provisions a fresh
/// account otherwise.
#[utoipa::path(
    post,
    path = "/api/auth/oauth/callback",
    request_body = OAuthCallbackRequest,
    responses(
        (status = 200, description = "Session issued", body = SessionResponse),
        (status = 401, description = "Unknown state or failed exchange", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
async fn oauth_callback(
    State(state): State<AppState>,
    body: Result<Json<OAuthCallbackRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = extract_validated_json(body)?;
    let provider = state
        .oauth
        .as_ref()
        .cloned()
        .ok_or_else(|| ApiError::Unavailable("oauth login is not configured".to_string()))?;

    // Pop the pending authorization; single use, expired ones purged.
    let pending = {
        let mut directory = state.directory.write();
        directory.purge_expired(Utc::now());
        directory.pending_oauth.remove(&req.state)
    }
    .ok_or_else(|| ApiError::Unauthorized("unknown or expired oauth state".to_string()))?;

    let claims = provider.exchange(&req.code, pending.pkce_verifier).await?;

    let now = Utc::now();
    let (user, created) = {
        let mut directory = state.directory.write();
        let existing = directory
            .user_by_external_identity(&claims.provider, &claims.subject)
            .map(|u| u.id);
        match existing {
            Some(id) => {
                let user = directory
                    .users
                    .get_mut(&id)
                    .ok_or_else(|| ApiError::Internal("linked user row missing".to_string()))?;
                user.last_login_at = Some(now);
                (user.clone(), false)
            }
            None => {
                let email_str = claims
                    .email
                    .clone()
                    .ok_or_else(|| ApiError::Unauthorized("oauth account has no email".to_string()))?;
                let email = EmailAddress::new(&email_str)
                    .map_err(|_| ApiError::Unauthorized("oauth account email is invalid".to_string()))?;
                if let Some(existing) = directory.user_by_email(email.as_str()).map(|u| u.id) {
                    // Same email, first OAuth login: link the identity.
                    let user = directory
                        .users
                        .get_mut(&existing)
                        .ok_or_else(|| ApiError::Internal("linked user row missing".to_string()))?;
                    user.external_identity = Some(ExternalIdentity {
                        provider: claims.provider.clone(),
                        subject: claims.subject.clone(),
                    });
                    user.last_login_at = Some(now);
                    (user.clone(), false)
                } else {
                    let display_name = claims
                        .display_name
                        .clone()
                        .unwrap_or_else(|| email.as_str().split('@').next().unwrap_or("user").to_string());
                    let user = UserRecord {
                        id: UserId::new(),
                        email,
                        display_name,
                        weekly_points: state.config.weekly_budget,
                        weekly_points_received: 0,
                        total_points_received: 0,
                        is_admin: false,
                        is_active: true,
                        password_hash: None,
                        external_identity: Some(ExternalIdentity {
                            provider: claims.provider.clone(),
                            subject: claims.subject.clone(),
                        }),
                        created_at: now,
                        last_login_at: Some(now),
                    };
                    directory.users.insert(user.id, user.clone());
                    (user, true)
                }
            }
        }
    };

    if !user.is_active {
        return Err(ApiError::Unauthorized("account is deactivated".to_string()));
    }

    if let Some(pool) = &state.db_pool {
        if created {
            crate::db::users::insert(pool, &user).await?;
        } else {
            crate::db::users::update(pool, &user).await?;
        }
    }

    let (session, response) = issue_session(&state, &user, StatusCode::OK);
    persist_session(&state, &session).await?;
    tracing::info!(user_id = %user.id, provider = %claims.provider, created, "oauth sign-in");
    Ok(response)
}

/// POST /api/auth/password-reset/request — Start a password reset.
///
/// Always answers 202 so the endpoint cannot be used to probe which
/// emails exist.
#[utoipa::path(
    post,
    path = "/api/auth/password-reset/request",
    request_body = ResetRequest,
    responses((status = 202, description = "Reset token issued if the account exists")),
    tag = "auth"
)]
async fn password_reset_request(
    State(state): State<AppState>,
    body: Result<Json<ResetRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let req = extract_validated_json(body)?;

    let user = EmailAddress::new(&req.email)
        .ok()
        .and_then(|email| state.directory.read().user_by_email(email.as_str()).cloned());

    if let Some(user) = user {
        if user.is_active {
            let record = ResetTokenRecord {
                token: kudos_auth::generate_token(),
                user_id: user.id,
                expires_at: Utc::now() + Duration::seconds(state.config.reset_token_ttl_secs),
                consumed: false,
            };
            {
                let mut directory = state.directory.write();
                directory.purge_expired(Utc::now());
                directory.reset_tokens.insert(record.token.clone(), record.clone());
            }
            if let Some(pool) = &state.db_pool {
                crate::db::sessions::insert_reset_token(pool, &record).await?;
            }
            state.reset_sink.deliver(user.email.as_str(), &record.token);
        }
    }

    Ok(StatusCode::ACCEPTED)
}

/// POST /api/auth/password-reset/confirm — Finish a password reset.
///
/// Consumes the token, re-hashes the password, and revokes every session
/// the user holds.
#[utoipa::path(
    post,
    path = "/api/auth/password-reset/confirm",
    request_body = ResetConfirmRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Unknown or expired token", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
async fn password_reset_confirm(
    State(state): State<AppState>,
    body: Result<Json<ResetConfirmRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let req = extract_validated_json(body)?;
    let hash = kudos_auth::hash_password(&req.new_password)?;

    let user_id = {
        let mut directory = state.directory.write();
        directory.purge_expired(Utc::now());
        let record = directory
            .reset_tokens
            .get_mut(&req.token)
            .filter(|r| !r.consumed && r.expires_at > Utc::now())
            .ok_or_else(|| ApiError::Unauthorized("unknown or expired reset token".to_string()))?;
        record.consumed = true;
        let user_id = record.user_id;
        let user = directory
            .users
            .get_mut(&user_id)
            .ok_or_else(|| ApiError::Unauthorized("unknown or expired reset token".to_string()))?;
        user.password_hash = Some(hash.clone());
        directory.revoke_user_sessions(user_id);
        user_id
    };

    if let Some(pool) = &state.db_pool {
        crate::db::sessions::consume_reset_token(pool, &req.token).await?;
        crate::db::sessions::update_password_hash(pool, user_id, &hash).await?;
        crate::db::sessions::revoke_user_sessions(pool, user_id).await?;
    }

    tracing::info!(user_id = %user_id, "password reset completed");
    Ok(StatusCode::NO_CONTENT)
}
