//! Notification persistence operations.

use chrono::{DateTime, Utc};
use kudos_core::{CardId, NotificationId, NotificationKind, NotificationRecord, UserId};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a notification row.
pub async fn insert(pool: &PgPool, notification: &NotificationRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO notifications (id, user_id, kind, card_id, actor_id, read_at, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(notification.id.as_uuid())
    .bind(notification.user_id.as_uuid())
    .bind(notification.kind.as_str())
    .bind(notification.card_id.as_uuid())
    .bind(notification.actor_id.as_uuid())
    .bind(notification.read_at)
    .bind(notification.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Mark one notification read.
pub async fn mark_read(
    pool: &PgPool,
    id: NotificationId,
    read_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET read_at = $2 WHERE id = $1")
        .bind(id.as_uuid())
        .bind(read_at)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Mark all of a user's notifications read.
pub async fn mark_all_read(
    pool: &PgPool,
    user: UserId,
    read_at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notifications SET read_at = $2 WHERE user_id = $1 AND read_at IS NULL",
    )
    .bind(user.as_uuid())
    .bind(read_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Delete all of a user's notifications (server-side clear).
pub async fn clear_for_user(pool: &PgPool, user: UserId) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
        .bind(user.as_uuid())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Load all notifications on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<NotificationRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, NotificationRow>(
        "SELECT id, user_id, kind, card_id, actor_id, read_at, created_at
         FROM notifications ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().filter_map(NotificationRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    card_id: Uuid,
    actor_id: Uuid,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_record(self) -> Option<NotificationRecord> {
        let kind: NotificationKind = match self.kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "skipping notification with unknown kind");
                return None;
            }
        };
        Some(NotificationRecord {
            id: NotificationId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            kind,
            card_id: CardId::from_uuid(self.card_id),
            actor_id: UserId::from_uuid(self.actor_id),
            read_at: self.read_at,
            created_at: self.created_at,
        })
    }
}
