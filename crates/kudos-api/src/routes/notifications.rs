//! # Notifications API
//!
//! Server-side notification rows: list, mark-read, mark-all-read, and
//! clear. Clearing deletes rows on the server, so a cleared feed stays
//! cleared on every device — there is no per-browser local hiding.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use kudos_core::{CardId, NotificationId, NotificationKind, NotificationRecord, UserId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::state::AppState;

/// A notification on the wire.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationView {
    #[schema(value_type = String)]
    pub id: NotificationId,
    #[schema(value_type = String)]
    pub kind: NotificationKind,
    #[schema(value_type = String)]
    pub card_id: CardId,
    #[schema(value_type = String)]
    pub actor_id: UserId,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&NotificationRecord> for NotificationView {
    fn from(record: &NotificationRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            card_id: record.card_id,
            actor_id: record.actor_id,
            read_at: record.read_at,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<usize>,
}

/// Result of a bulk operation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkResult {
    pub affected: u64,
}

/// Build the notifications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list_notifications).delete(clear_notifications))
        .route("/api/notifications/:id/read", post(mark_read))
        .route("/api/notifications/read-all", post(mark_all_read))
}

/// GET /api/notifications — The caller's feed, newest first.
#[utoipa::path(
    get,
    path = "/api/notifications",
    responses((status = 200, description = "Notifications", body = [NotificationView])),
    tag = "notifications"
)]
async fn list_notifications(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<NotificationView>>, ApiError> {
    let limit = query.limit.unwrap_or(100).min(500);
    let directory = state.directory.read();
    let mut notifications: Vec<&NotificationRecord> = directory
        .notifications
        .values()
        .filter(|n| n.user_id == caller.id)
        .filter(|n| !query.unread_only || n.is_unread())
        .collect();
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    notifications.truncate(limit);
    Ok(Json(notifications.into_iter().map(NotificationView::from).collect()))
}

/// POST /api/notifications/:id/read — Mark one notification read.
#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked read", body = NotificationView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "notifications"
)]
async fn mark_read(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationView>, ApiError> {
    let id = NotificationId::from_uuid(id);
    let now = Utc::now();

    let record = {
        let mut directory = state.directory.write();
        let record = directory
            .notifications
            .get_mut(&id)
            .filter(|n| n.user_id == caller.id)
            .ok_or_else(|| ApiError::NotFound(format!("notification {id} not found")))?;
        if record.read_at.is_none() {
            record.read_at = Some(now);
        }
        record.clone()
    };

    if let Some(pool) = &state.db_pool {
        crate::db::notifications::mark_read(pool, id, record.read_at.unwrap_or(now)).await?;
    }

    Ok(Json(NotificationView::from(&record)))
}

/// POST /api/notifications/read-all — Mark the whole feed read.
#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    responses((status = 200, description = "Feed marked read", body = BulkResult)),
    tag = "notifications"
)]
async fn mark_all_read(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<BulkResult>, ApiError> {
    let now = Utc::now();
    let affected = {
        let mut directory = state.directory.write();
        let mut affected = 0u64;
        for record in directory
            .notifications
            .values_mut()
            .filter(|n| n.user_id == caller.id && n.is_unread())
        {
            record.read_at = Some(now);
            affected += 1;
        }
        affected
    };

    if let Some(pool) = &state.db_pool {
        crate::db::notifications::mark_all_read(pool, caller.id, now).await?;
    }

    Ok(Json(BulkResult { affected }))
}

/// DELETE /api/notifications — Clear the feed server-side.
#[utoipa::path(
    delete,
    path = "/api/notifications",
    responses((status = 200, description = "Feed cleared", body = BulkResult)),
    tag = "notifications"
)]
async fn clear_notifications(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<BulkResult>, ApiError> {
    let affected = {
        let mut directory = state.directory.write();
        let before = directory.notifications.len();
        directory.notifications.retain(|_, n| n.user_id != caller.id);
        (before - directory.notifications.len()) as u64
    };

    if let Some(pool) = &state.db_pool {
        crate::db::notifications::clear_for_user(pool, caller.id).await?;
    }

    tracing::debug!(user_id = %caller.id, affected, "notifications cleared");
    Ok(Json(BulkResult { affected }))
}
