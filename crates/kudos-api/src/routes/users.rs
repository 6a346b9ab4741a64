//! # User API
//!
//! Listing, profiles, admin provisioning, profile edits, soft
//! deactivation, and department assignment. Accounts are never
//! hard-deleted: `DELETE` clears `is_active` and revokes the user's
//! sessions, keeping cards and likes referentially intact.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use kudos_core::{
    validate_display_name, DepartmentId, EmailAddress, UserId, UserRecord,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extractors::{extract_validated_json, CurrentUser, Validate};
use crate::state::AppState;

/// Public view of a user account. The password hash never appears here;
/// `weekly_points` (the spending budget) is included because budgets are
/// deliberately visible in an internal recognition tool.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    #[schema(value_type = String)]
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub weekly_points: u32,
    pub weekly_points_received: u64,
    pub total_points_received: u64,
    pub is_admin: bool,
    pub is_active: bool,
    #[schema(value_type = Vec<String>)]
    pub departments: Vec<DepartmentId>,
    pub created_at: DateTime<Utc>,
}

impl UserView {
    /// Build the view, attaching department memberships.
    pub fn from_record(user: &UserRecord, departments: Vec<DepartmentId>) -> Self {
        Self {
            id: user.id,
            email: user.email.as_str().to_string(),
            display_name: user.display_name.clone(),
            weekly_points: user.weekly_points,
            weekly_points_received: user.weekly_points_received,
            total_points_received: user.total_points_received,
            is_admin: user.is_admin,
            is_active: user.is_active,
            departments,
            created_at: user.created_at,
        }
    }
}

/// Admin provisioning request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: String,
    /// Optional initial password; omit for OAuth-only accounts.
    pub password: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(password) = &self.password {
            if password.len() < 8 {
                return Err("password must be at least 8 characters".to_string());
            }
        }
        Ok(())
    }
}

/// Profile edit request. All fields optional; admin-only fields are
/// rejected for non-admin callers in the handler.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(password) = &self.password {
            if password.len() < 8 {
                return Err("password must be at least 8 characters".to_string());
            }
        }
        Ok(())
    }
}

/// Department assignment request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignDepartmentsRequest {
    #[schema(value_type = Vec<String>)]
    pub department_ids: Vec<DepartmentId>,
}

impl Validate for AssignDepartmentsRequest {
    fn validate(&self) -> Result<(), String> {
        if self.department_ids.len() > 32 {
            return Err("too many departments".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    /// Admins may include deactivated accounts.
    #[serde(default)]
    pub include_inactive: bool,
}

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/:id",
            get(get_user).patch(update_user).delete(deactivate_user),
        )
        .route("/api/users/:id/departments", put(assign_departments))
}

fn view_of(state: &AppState, user: &UserRecord) -> UserView {
    let directory = state.directory.read();
    let departments = directory
        .user_departments
        .get(&user.id)
        .cloned()
        .unwrap_or_default();
    UserView::from_record(user, departments)
}

/// GET /api/users — List users.
#[utoipa::path(
    get,
    path = "/api/users",
    responses((status = 200, description = "User list", body = [UserView])),
    tag = "users"
)]
async fn list_users(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let include_inactive = query.include_inactive && caller.is_admin;
    let directory = state.directory.read();
    let mut users: Vec<UserView> = directory
        .users
        .values()
        .filter(|u| u.is_active || include_inactive)
        .map(|u| {
            let departments = directory
                .user_departments
                .get(&u.id)
                .cloned()
                .unwrap_or_default();
            UserView::from_record(u, departments)
        })
        .collect();
    users.sort_by(|a, b| a.display_name.cmp(&b.display_name).then(a.id.cmp(&b.id)));
    Ok(Json(users))
}

/// POST /api/users — Admin provisioning.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserView),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
async fn create_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    caller.require_admin()?;
    let req = extract_validated_json(body)?;

    let email = EmailAddress::new(&req.email)?;
    let display_name = validate_display_name(&req.display_name)?;
    let password_hash = match &req.password {
        Some(password) => Some(kudos_auth::hash_password(password)?),
        None => None,
    };

    let user = UserRecord {
        id: UserId::new(),
        email,
        display_name,
        weekly_points: state.config.weekly_budget,
        weekly_points_received: 0,
        total_points_received: 0,
        is_admin: req.is_admin,
        is_active: true,
        password_hash,
        external_identity: None,
        created_at: Utc::now(),
        last_login_at: None,
    };

    {
        let mut directory = state.directory.write();
        if directory.user_by_email(user.email.as_str()).is_some() {
            return Err(ApiError::Conflict("email already registered".to_string()));
        }
        directory.users.insert(user.id, user.clone());
    }

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::users::insert(pool, &user).await {
            tracing::error!(user_id = %user.id, error = %e, "failed to persist user");
            return Err(ApiError::Internal(
                "user recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    let view = view_of(&state, &user);
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/users/:id — Get one user.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
async fn get_user(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserView>, ApiError> {
    let id = UserId::from_uuid(id);
    let user = state
        .directory
        .read()
        .users
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
    Ok(Json(view_of(&state, &user)))
}

/// PATCH /api/users/:id — Edit a profile (self or admin).
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserView),
        (status = 403, description = "Not yours to edit", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
async fn update_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserView>, ApiError> {
    let id = UserId::from_uuid(id);
    let req = extract_validated_json(body)?;

    if caller.id != id && !caller.is_admin {
        return Err(ApiError::Forbidden("cannot edit another user's profile".to_string()));
    }
    if req.is_admin.is_some() && !caller.is_admin {
        return Err(ApiError::Forbidden("only admins may change the admin flag".to_string()));
    }

    let display_name = match &req.display_name {
        Some(name) => Some(validate_display_name(name)?),
        None => None,
    };
    let password_hash = match &req.password {
        Some(password) => Some(kudos_auth::hash_password(password)?),
        None => None,
    };

    let updated = {
        let mut directory = state.directory.write();
        let user = directory
            .users
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
        if let Some(name) = display_name {
            user.display_name = name;
        }
        if let Some(hash) = password_hash {
            user.password_hash = Some(hash);
        }
        if let Some(is_admin) = req.is_admin {
            user.is_admin = is_admin;
        }
        user.clone()
    };

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::users::update(pool, &updated).await {
            tracing::error!(user_id = %id, error = %e, "failed to persist user update");
            return Err(ApiError::Internal(
                "user updated in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(view_of(&state, &updated)))
}

/// DELETE /api/users/:id — Soft-deactivate (admin).
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deactivated"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
async fn deactivate_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    caller.require_admin()?;
    let id = UserId::from_uuid(id);

    let updated = {
        let mut directory = state.directory.write();
        let user = directory
            .users
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
        user.is_active = false;
        let updated = user.clone();
        directory.revoke_user_sessions(id);
        updated
    };

    if let Some(pool) = &state.db_pool {
        crate::db::users::update(pool, &updated).await?;
        crate::db::sessions::revoke_user_sessions(pool, id).await?;
    }

    tracing::info!(user_id = %id, "user deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/users/:id/departments — Replace department memberships (admin).
#[utoipa::path(
    put,
    path = "/api/users/{id}/departments",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = AssignDepartmentsRequest,
    responses(
        (status = 200, description = "Departments assigned", body = UserView),
        (status = 404, description = "Unknown user or department", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
async fn assign_departments(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
    body: Result<Json<AssignDepartmentsRequest>, JsonRejection>,
) -> Result<Json<UserView>, ApiError> {
    caller.require_admin()?;
    let id = UserId::from_uuid(id);
    let req = extract_validated_json(body)?;

    let user = {
        let mut directory = state.directory.write();
        let user = directory
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
        for department in &req.department_ids {
            if !directory.departments.contains_key(department) {
                return Err(ApiError::NotFound(format!("department {department} not found")));
            }
        }
        directory.user_departments.insert(id, req.department_ids.clone());
        user
    };

    if let Some(pool) = &state.db_pool {
        crate::db::orgs::replace_user_departments(pool, id, &req.department_ids).await?;
    }

    Ok(Json(view_of(&state, &user)))
}
