//! Session and password-reset-token persistence operations.
//!
//! Pending OAuth authorizations are deliberately not persisted: they live
//! ten minutes and losing them on restart only means the user restarts the
//! sign-in redirect.

use chrono::{DateTime, Utc};
use kudos_core::UserId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::{ResetTokenRecord, SessionRecord};

/// Insert a session row.
pub async fn insert_session(pool: &PgPool, session: &SessionRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO sessions (token, user_id, created_at, expires_at, revoked)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(&session.token)
    .bind(session.user_id.as_uuid())
    .bind(session.created_at)
    .bind(session.expires_at)
    .bind(session.revoked)
    .execute(pool)
    .await?;
    Ok(())
}

/// Revoke one session by token.
pub async fn revoke_session(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE sessions SET revoked = TRUE WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Revoke every session of a user (password reset, deactivation).
pub async fn revoke_user_sessions(pool: &PgPool, user: UserId) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE sessions SET revoked = TRUE WHERE user_id = $1")
        .bind(user.as_uuid())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Update a user's last login timestamp.
pub async fn touch_last_login(
    pool: &PgPool,
    user: UserId,
    at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
        .bind(user.as_uuid())
        .bind(at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert a password reset token.
pub async fn insert_reset_token(pool: &PgPool, token: &ResetTokenRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO password_reset_tokens (token, user_id, expires_at, consumed)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(&token.token)
    .bind(token.user_id.as_uuid())
    .bind(token.expires_at)
    .bind(token.consumed)
    .execute(pool)
    .await?;
    Ok(())
}

/// Mark a reset token consumed.
pub async fn consume_reset_token(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE password_reset_tokens SET consumed = TRUE WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Update a user's password hash.
pub async fn update_password_hash(
    pool: &PgPool,
    user: UserId,
    hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(user.as_uuid())
        .bind(hash)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load live sessions on startup. Expired and revoked rows are dropped
/// in the same statement — no point hydrating them.
pub async fn load_sessions(pool: &PgPool) -> Result<Vec<SessionRecord>, sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE revoked OR expires_at <= NOW()")
        .execute(pool)
        .await?;
    let rows = sqlx::query_as::<_, SessionRow>(
        "SELECT token, user_id, created_at, expires_at, revoked FROM sessions",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(SessionRow::into_record).collect())
}

/// Load outstanding reset tokens on startup.
pub async fn load_reset_tokens(pool: &PgPool) -> Result<Vec<ResetTokenRecord>, sqlx::Error> {
    sqlx::query("DELETE FROM password_reset_tokens WHERE consumed OR expires_at <= NOW()")
        .execute(pool)
        .await?;
    let rows = sqlx::query_as::<_, ResetTokenRow>(
        "SELECT token, user_id, expires_at, consumed FROM password_reset_tokens",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(ResetTokenRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    token: String,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

impl SessionRow {
    fn into_record(self) -> SessionRecord {
        SessionRecord {
            token: self.token,
            user_id: UserId::from_uuid(self.user_id),
            created_at: self.created_at,
            expires_at: self.expires_at,
            revoked: self.revoked,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ResetTokenRow {
    token: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    consumed: bool,
}

impl ResetTokenRow {
    fn into_record(self) -> ResetTokenRecord {
        ResetTokenRecord {
            token: self.token,
            user_id: UserId::from_uuid(self.user_id),
            expires_at: self.expires_at,
            consumed: self.consumed,
        }
    }
}
