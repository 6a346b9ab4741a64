//! # Dashboard API
//!
//! Read-only statistics: the caller's own point summary, the counterpart
//! interaction ranking (top 30 by linear scan, see `kudos-ledger`), and
//! the received-points leaderboards.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use kudos_core::{CardRecord, LikeRecord, UserId};
use kudos_ledger::{rank_counterparts, CounterpartStanding};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::state::AppState;

/// The caller's own point summary.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub weekly_points: u32,
    pub weekly_points_received: u64,
    pub total_points_received: u64,
    pub cards_sent: u64,
    pub cards_received: u64,
    pub likes_given: u64,
    pub likes_received: u64,
    pub unread_notifications: u64,
}

/// One counterpart ranking row (wire shape of the ledger's standing).
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CounterpartView {
    #[schema(value_type = String)]
    pub user_id: UserId,
    pub cards_sent: u64,
    pub cards_received: u64,
    pub likes: u64,
    pub points_exchanged: u64,
}

impl From<CounterpartStanding> for CounterpartView {
    fn from(standing: CounterpartStanding) -> Self {
        Self {
            user_id: standing.user_id,
            cards_sent: standing.cards_sent,
            cards_received: standing.cards_received,
            likes: standing.likes,
            points_exchanged: standing.points_exchanged,
        }
    }
}

/// One leaderboard row.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntry {
    #[schema(value_type = String)]
    pub user_id: UserId,
    pub display_name: String,
    pub points: u64,
}

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    /// Defaults to the caller. Inspecting someone else's ranking is
    /// admin-only.
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    /// `weekly` (default) or `total`.
    pub by: Option<String>,
    pub limit: Option<usize>,
}

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/me", get(summary))
        .route("/api/dashboard/ranking", get(ranking))
        .route("/api/dashboard/leaderboard", get(leaderboard))
}

/// GET /api/dashboard/me — Point summary for the caller.
#[utoipa::path(
    get,
    path = "/api/dashboard/me",
    responses((status = 200, description = "Summary", body = DashboardSummary)),
    tag = "dashboard"
)]
async fn summary(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<DashboardSummary>, ApiError> {
    let directory = state.directory.read();
    let user = directory
        .users
        .get(&caller.id)
        .ok_or_else(|| ApiError::Unauthorized("invalid session".to_string()))?;

    let team_ids = directory.user_team_ids(caller.id);
    let mut cards_sent = 0u64;
    let mut cards_received = 0u64;
    let mut likes_received = 0u64;
    for card in directory.cards.values().filter(|c| !c.hidden) {
        let received = card.recipient.as_user() == Some(caller.id)
            || card.additional_recipients.contains(&caller.id)
            || card
                .recipient
                .as_team()
                .is_some_and(|team| team_ids.contains(&team));
        if card.sender_id == caller.id {
            cards_sent += 1;
            likes_received += directory
                .likes
                .values()
                .filter(|l| l.card_id == card.id)
                .count() as u64;
        } else if received {
            cards_received += 1;
        }
    }
    let likes_given = directory
        .likes
        .values()
        .filter(|l| l.user_id == caller.id)
        .count() as u64;
    let unread_notifications = directory
        .notifications
        .values()
        .filter(|n| n.user_id == caller.id && n.is_unread())
        .count() as u64;

    Ok(Json(DashboardSummary {
        weekly_points: user.weekly_points,
        weekly_points_received: user.weekly_points_received,
        total_points_received: user.total_points_received,
        cards_sent,
        cards_received,
        likes_given,
        likes_received,
        unread_notifications,
    }))
}

/// GET /api/dashboard/ranking — Counterpart interaction ranking.
#[utoipa::path(
    get,
    path = "/api/dashboard/ranking",
    responses((status = 200, description = "Top counterparts", body = [CounterpartView])),
    tag = "dashboard"
)]
async fn ranking(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(query): Query<RankingQuery>,
) -> Result<Json<Vec<CounterpartView>>, ApiError> {
    let subject = match query.user_id {
        Some(id) => {
            let id = UserId::from_uuid(id);
            if id != caller.id && !caller.is_admin {
                return Err(ApiError::Forbidden(
                    "only admins may inspect another user's ranking".to_string(),
                ));
            }
            id
        }
        None => caller.id,
    };

    let directory = state.directory.read();
    let cards: Vec<CardRecord> = directory.cards.values().cloned().collect();
    let likes: Vec<LikeRecord> = directory.likes.values().cloned().collect();
    drop(directory);

    let standings = rank_counterparts(subject, &cards, &likes);
    Ok(Json(standings.into_iter().map(CounterpartView::from).collect()))
}

/// GET /api/dashboard/leaderboard — Received-points leaderboard.
#[utoipa::path(
    get,
    path = "/api/dashboard/leaderboard",
    responses((status = 200, description = "Leaderboard", body = [LeaderboardEntry])),
    tag = "dashboard"
)]
async fn leaderboard(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let by_total = match query.by.as_deref() {
        None | Some("weekly") => false,
        Some("total") => true,
        Some(other) => {
            return Err(ApiError::Validation(format!(
                "unknown leaderboard key: {other} (expected weekly or total)"
            )))
        }
    };
    let limit = query.limit.unwrap_or(30).min(100);

    let directory = state.directory.read();
    let mut entries: Vec<LeaderboardEntry> = directory
        .users
        .values()
        .filter(|u| u.is_active)
        .map(|u| LeaderboardEntry {
            user_id: u.id,
            display_name: u.display_name.clone(),
            points: if by_total {
                u.total_points_received
            } else {
                u.weekly_points_received
            },
        })
        .collect();
    entries.sort_by(|a, b| b.points.cmp(&a.points).then(a.user_id.cmp(&b.user_id)));
    entries.truncate(limit);
    Ok(Json(entries))
}
