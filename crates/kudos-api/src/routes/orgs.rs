//! # Teams & Departments API
//!
//! Organizational grouping: teams (card recipients with their own point
//! counters) and the department tree. Creation and membership are admin
//! operations; listing is open to every signed-in user for recipient
//! pickers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use kudos_core::{
    validate_group_name, DepartmentId, DepartmentRecord, TeamId, TeamMemberRecord, TeamRecord,
    UserId,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extractors::{extract_validated_json, CurrentUser, Validate};
use crate::state::AppState;

/// Team creation request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTeamRequest {
    pub name: String,
    pub description: Option<String>,
}

impl Validate for CreateTeamRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(description) = &self.description {
            if description.chars().count() > 500 {
                return Err("description must not exceed 500 characters".to_string());
            }
        }
        Ok(())
    }
}

/// Membership request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    #[schema(value_type = String)]
    pub user_id: Uuid,
}

impl Validate for AddMemberRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Department creation request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDepartmentRequest {
    pub name: String,
    #[schema(value_type = Option<String>)]
    pub parent_id: Option<Uuid>,
}

impl Validate for CreateDepartmentRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Team on the wire.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamView {
    #[schema(value_type = String)]
    pub id: TeamId,
    pub name: String,
    pub description: Option<String>,
    pub weekly_points_received: u64,
    pub total_points_received: u64,
    pub member_count: usize,
    pub created_at: DateTime<Utc>,
}

impl TeamView {
    fn build(team: &TeamRecord, member_count: usize) -> Self {
        Self {
            id: team.id,
            name: team.name.clone(),
            description: team.description.clone(),
            weekly_points_received: team.weekly_points_received,
            total_points_received: team.total_points_received,
            member_count,
            created_at: team.created_at,
        }
    }
}

/// Team detail with member list.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamDetailView {
    #[serde(flatten)]
    pub team: TeamView,
    #[schema(value_type = Vec<String>)]
    pub members: Vec<UserId>,
}

/// Department on the wire.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DepartmentView {
    #[schema(value_type = String)]
    pub id: DepartmentId,
    pub name: String,
    #[schema(value_type = Option<String>)]
    pub parent_id: Option<DepartmentId>,
    pub created_at: DateTime<Utc>,
}

impl From<&DepartmentRecord> for DepartmentView {
    fn from(department: &DepartmentRecord) -> Self {
        Self {
            id: department.id,
            name: department.name.clone(),
            parent_id: department.parent_id,
            created_at: department.created_at,
        }
    }
}

/// Build the teams/departments router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/teams", get(list_teams).post(create_team))
        .route("/api/teams/:id", get(get_team))
        .route("/api/teams/:id/members", post(add_member))
        .route(
            "/api/teams/:id/members/:user_id",
            axum::routing::delete(remove_member),
        )
        .route("/api/departments", get(list_departments).post(create_department))
}

/// GET /api/teams — List teams.
#[utoipa::path(
    get,
    path = "/api/teams",
    responses((status = 200, description = "Teams", body = [TeamView])),
    tag = "orgs"
)]
async fn list_teams(
    State(state): State<AppState>,
    _caller: CurrentUser,
) -> Result<Json<Vec<TeamView>>, ApiError> {
    let directory = state.directory.read();
    let mut teams: Vec<TeamView> = directory
        .teams
        .values()
        .map(|team| TeamView::build(team, directory.team_member_ids(team.id).len()))
        .collect();
    teams.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(Json(teams))
}

/// POST /api/teams — Create a team (admin).
#[utoipa::path(
    post,
    path = "/api/teams",
    request_body = CreateTeamRequest,
    responses((status = 201, description = "Team created", body = TeamView)),
    tag = "orgs"
)]
async fn create_team(
    State(state): State<AppState>,
    caller: CurrentUser,
    body: Result<Json<CreateTeamRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TeamView>), ApiError> {
    caller.require_admin()?;
    let req = extract_validated_json(body)?;
    let name = validate_group_name(&req.name)?;

    let team = TeamRecord {
        id: TeamId::new(),
        name,
        description: req.description.clone(),
        weekly_points_received: 0,
        total_points_received: 0,
        created_at: Utc::now(),
    };

    {
        let mut directory = state.directory.write();
        if directory.teams.values().any(|t| t.name == team.name) {
            return Err(ApiError::Conflict("team name already in use".to_string()));
        }
        directory.teams.insert(team.id, team.clone());
    }

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::orgs::insert_team(pool, &team).await {
            tracing::error!(team_id = %team.id, error = %e, "failed to persist team");
            return Err(ApiError::Internal(
                "team recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    tracing::info!(team_id = %team.id, "team created");
    Ok((StatusCode::CREATED, Json(TeamView::build(&team, 0))))
}

/// GET /api/teams/:id — Team detail with member list.
#[utoipa::path(
    get,
    path = "/api/teams/{id}",
    params(("id" = Uuid, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Team detail", body = TeamDetailView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "orgs"
)]
async fn get_team(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TeamDetailView>, ApiError> {
    let id = TeamId::from_uuid(id);
    let directory = state.directory.read();
    let team = directory
        .teams
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("team {id} not found")))?;
    let mut members = directory.team_member_ids(id);
    members.sort();
    Ok(Json(TeamDetailView {
        team: TeamView::build(team, members.len()),
        members,
    }))
}

/// POST /api/teams/:id/members — Add a member (admin).
#[utoipa::path(
    post,
    path = "/api/teams/{id}/members",
    params(("id" = Uuid, Path, description = "Team ID")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added", body = TeamDetailView),
        (status = 409, description = "Already a member", body = crate::error::ErrorBody),
    ),
    tag = "orgs"
)]
async fn add_member(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
    body: Result<Json<AddMemberRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TeamDetailView>), ApiError> {
    caller.require_admin()?;
    let team_id = TeamId::from_uuid(id);
    let req = extract_validated_json(body)?;
    let user_id = UserId::from_uuid(req.user_id);

    let member = TeamMemberRecord {
        team_id,
        user_id,
        joined_at: Utc::now(),
    };

    {
        let mut directory = state.directory.write();
        if !directory.teams.contains_key(&team_id) {
            return Err(ApiError::NotFound(format!("team {team_id} not found")));
        }
        if !directory.users.contains_key(&user_id) {
            return Err(ApiError::NotFound(format!("user {user_id} not found")));
        }
        if directory
            .team_members
            .iter()
            .any(|m| m.team_id == team_id && m.user_id == user_id)
        {
            return Err(ApiError::Conflict("already a team member".to_string()));
        }
        directory.team_members.push(member.clone());
    }

    if let Some(pool) = &state.db_pool {
        crate::db::orgs::insert_team_member(pool, &member).await?;
    }

    let directory = state.directory.read();
    let team = directory
        .teams
        .get(&team_id)
        .ok_or_else(|| ApiError::NotFound(format!("team {team_id} not found")))?;
    let mut members = directory.team_member_ids(team_id);
    members.sort();
    Ok((
        StatusCode::CREATED,
        Json(TeamDetailView {
            team: TeamView::build(team, members.len()),
            members,
        }),
    ))
}

/// DELETE /api/teams/:id/members/:user_id — Remove a member (admin).
#[utoipa::path(
    delete,
    path = "/api/teams/{id}/members/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Team ID"),
        ("user_id" = Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 404, description = "Not a member", body = crate::error::ErrorBody),
    ),
    tag = "orgs"
)]
async fn remove_member(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    caller.require_admin()?;
    let team_id = TeamId::from_uuid(id);
    let user_id = UserId::from_uuid(user_id);

    {
        let mut directory = state.directory.write();
        let before = directory.team_members.len();
        directory
            .team_members
            .retain(|m| !(m.team_id == team_id && m.user_id == user_id));
        if directory.team_members.len() == before {
            return Err(ApiError::NotFound("membership not found".to_string()));
        }
    }

    if let Some(pool) = &state.db_pool {
        crate::db::orgs::delete_team_member(pool, team_id, user_id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/departments — List the department tree (flat).
#[utoipa::path(
    get,
    path = "/api/departments",
    responses((status = 200, description = "Departments", body = [DepartmentView])),
    tag = "orgs"
)]
async fn list_departments(
    State(state): State<AppState>,
    _caller: CurrentUser,
) -> Result<Json<Vec<DepartmentView>>, ApiError> {
    let directory = state.directory.read();
    let mut departments: Vec<DepartmentView> =
        directory.departments.values().map(DepartmentView::from).collect();
    departments.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(Json(departments))
}

/// POST /api/departments — Create a department node (admin).
#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = DepartmentView),
        (status = 404, description = "Unknown parent", body = crate::error::ErrorBody),
    ),
    tag = "orgs"
)]
async fn create_department(
    State(state): State<AppState>,
    caller: CurrentUser,
    body: Result<Json<CreateDepartmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DepartmentView>), ApiError> {
    caller.require_admin()?;
    let req = extract_validated_json(body)?;
    let name = validate_group_name(&req.name)?;
    let parent_id = req.parent_id.map(DepartmentId::from_uuid);

    let department = DepartmentRecord {
        id: DepartmentId::new(),
        name,
        parent_id,
        created_at: Utc::now(),
    };

    {
        let mut directory = state.directory.write();
        if let Some(parent) = parent_id {
            if !directory.departments.contains_key(&parent) {
                return Err(ApiError::NotFound(format!("department {parent} not found")));
            }
        }
        directory.departments.insert(department.id, department.clone());
    }

    if let Some(pool) = &state.db_pool {
        crate::db::orgs::insert_department(pool, &department).await?;
    }

    tracing::info!(department_id = %department.id, "department created");
    Ok((StatusCode::CREATED, Json(DepartmentView::from(&department))))
}
