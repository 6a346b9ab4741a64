//! Team, department, and membership persistence operations.

use chrono::{DateTime, Utc};
use kudos_core::{
    DepartmentId, DepartmentRecord, TeamId, TeamMemberRecord, TeamRecord, UserDepartmentRecord,
    UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a team row.
pub async fn insert_team(pool: &PgPool, team: &TeamRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO teams (id, name, description, weekly_points_received,
                            total_points_received, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(team.id.as_uuid())
    .bind(&team.name)
    .bind(&team.description)
    .bind(team.weekly_points_received as i64)
    .bind(team.total_points_received as i64)
    .bind(team.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert a team membership row.
pub async fn insert_team_member(pool: &PgPool, member: &TeamMemberRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO team_members (team_id, user_id, joined_at) VALUES ($1, $2, $3)
         ON CONFLICT (team_id, user_id) DO NOTHING",
    )
    .bind(member.team_id.as_uuid())
    .bind(member.user_id.as_uuid())
    .bind(member.joined_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove a team membership row.
pub async fn delete_team_member(
    pool: &PgPool,
    team: TeamId,
    user: UserId,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
        .bind(team.as_uuid())
        .bind(user.as_uuid())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Insert a department row.
pub async fn insert_department(
    pool: &PgPool,
    department: &DepartmentRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO departments (id, name, parent_id, created_at) VALUES ($1, $2, $3, $4)")
        .bind(department.id.as_uuid())
        .bind(&department.name)
        .bind(department.parent_id.map(|p| *p.as_uuid()))
        .bind(department.created_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replace a user's department memberships.
pub async fn replace_user_departments(
    pool: &PgPool,
    user: UserId,
    departments: &[DepartmentId],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM user_departments WHERE user_id = $1")
        .bind(user.as_uuid())
        .execute(&mut *tx)
        .await?;
    for department in departments {
        sqlx::query("INSERT INTO user_departments (user_id, department_id) VALUES ($1, $2)")
            .bind(user.as_uuid())
            .bind(department.as_uuid())
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await
}

// -- startup hydration --------------------------------------------------------

/// Load all teams.
pub async fn load_teams(pool: &PgPool) -> Result<Vec<TeamRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TeamRow>(
        "SELECT id, name, description, weekly_points_received, total_points_received, created_at
         FROM teams ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(TeamRow::into_record).collect())
}

/// Load all team memberships.
pub async fn load_team_members(pool: &PgPool) -> Result<Vec<TeamMemberRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TeamMemberRow>(
        "SELECT team_id, user_id, joined_at FROM team_members",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(TeamMemberRow::into_record).collect())
}

/// Load all departments.
pub async fn load_departments(pool: &PgPool) -> Result<Vec<DepartmentRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DepartmentRow>(
        "SELECT id, name, parent_id, created_at FROM departments ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(DepartmentRow::into_record).collect())
}

/// Load all user-department memberships.
pub async fn load_user_departments(pool: &PgPool) -> Result<Vec<UserDepartmentRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, UserDepartmentRow>(
        "SELECT user_id, department_id FROM user_departments",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(UserDepartmentRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    weekly_points_received: i64,
    total_points_received: i64,
    created_at: DateTime<Utc>,
}

impl TeamRow {
    fn into_record(self) -> TeamRecord {
        TeamRecord {
            id: TeamId::from_uuid(self.id),
            name: self.name,
            description: self.description,
            weekly_points_received: self.weekly_points_received.max(0) as u64,
            total_points_received: self.total_points_received.max(0) as u64,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TeamMemberRow {
    team_id: Uuid,
    user_id: Uuid,
    joined_at: DateTime<Utc>,
}

impl TeamMemberRow {
    fn into_record(self) -> TeamMemberRecord {
        TeamMemberRecord {
            team_id: TeamId::from_uuid(self.team_id),
            user_id: UserId::from_uuid(self.user_id),
            joined_at: self.joined_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DepartmentRow {
    id: Uuid,
    name: String,
    parent_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl DepartmentRow {
    fn into_record(self) -> DepartmentRecord {
        DepartmentRecord {
            id: DepartmentId::from_uuid(self.id),
            name: self.name,
            parent_id: self.parent_id.map(DepartmentId::from_uuid),
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserDepartmentRow {
    user_id: Uuid,
    department_id: Uuid,
}

impl UserDepartmentRow {
    fn into_record(self) -> UserDepartmentRecord {
        UserDepartmentRecord {
            user_id: UserId::from_uuid(self.user_id),
            department_id: DepartmentId::from_uuid(self.department_id),
        }
    }
}
