//! User persistence operations.
//!
//! Point-counter updates that pair with other rows (likes, card grants)
//! live in [`crate::db::ledger`]; this module covers single-row writes.

use chrono::{DateTime, Utc};
use kudos_core::{EmailAddress, ExternalIdentity, UserId, UserRecord};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a new user row.
pub async fn insert(pool: &PgPool, user: &UserRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, email, display_name, weekly_points, weekly_points_received,
                            total_points_received, is_admin, is_active, password_hash,
                            external_provider, external_subject, created_at, last_login_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(user.id.as_uuid())
    .bind(user.email.as_str())
    .bind(&user.display_name)
    .bind(user.weekly_points as i32)
    .bind(user.weekly_points_received as i64)
    .bind(user.total_points_received as i64)
    .bind(user.is_admin)
    .bind(user.is_active)
    .bind(&user.password_hash)
    .bind(user.external_identity.as_ref().map(|e| e.provider.as_str()))
    .bind(user.external_identity.as_ref().map(|e| e.subject.as_str()))
    .bind(user.created_at)
    .bind(user.last_login_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update an existing user row in full. Returns whether a row matched.
pub async fn update(pool: &PgPool, user: &UserRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET email = $2, display_name = $3, weekly_points = $4,
                          weekly_points_received = $5, total_points_received = $6,
                          is_admin = $7, is_active = $8, password_hash = $9,
                          external_provider = $10, external_subject = $11,
                          last_login_at = $12
         WHERE id = $1",
    )
    .bind(user.id.as_uuid())
    .bind(user.email.as_str())
    .bind(&user.display_name)
    .bind(user.weekly_points as i32)
    .bind(user.weekly_points_received as i64)
    .bind(user.total_points_received as i64)
    .bind(user.is_admin)
    .bind(user.is_active)
    .bind(&user.password_hash)
    .bind(user.external_identity.as_ref().map(|e| e.provider.as_str()))
    .bind(user.external_identity.as_ref().map(|e| e.subject.as_str()))
    .bind(user.last_login_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all users into the directory on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<UserRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, display_name, weekly_points, weekly_points_received,
                total_points_received, is_admin, is_active, password_hash,
                external_provider, external_subject, created_at, last_login_at
         FROM users ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(UserRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    display_name: String,
    weekly_points: i32,
    weekly_points_received: i64,
    total_points_received: i64,
    is_admin: bool,
    is_active: bool,
    password_hash: Option<String>,
    external_provider: Option<String>,
    external_subject: Option<String>,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl UserRow {
    fn into_record(self) -> Option<UserRecord> {
        let email = match EmailAddress::new(&self.email) {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "skipping user row with invalid email");
                return None;
            }
        };
        let external_identity = match (self.external_provider, self.external_subject) {
            (Some(provider), Some(subject)) => Some(ExternalIdentity { provider, subject }),
            _ => None,
        };
        Some(UserRecord {
            id: UserId::from_uuid(self.id),
            email,
            display_name: self.display_name,
            weekly_points: self.weekly_points.max(0) as u32,
            weekly_points_received: self.weekly_points_received.max(0) as u64,
            total_points_received: self.total_points_received.max(0) as u64,
            is_admin: self.is_admin,
            is_active: self.is_active,
            password_hash: self.password_hash,
            external_identity,
            created_at: self.created_at,
            last_login_at: self.last_login_at,
        })
    }
}
