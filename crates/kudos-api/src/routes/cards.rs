//! # Card API
//!
//! Thanks-card creation and timeline, admin moderation, and the three
//! interaction surfaces: likes (point-moving, capped), emoji reactions
//! (one per user per card), and comments (author-editable).
//!
//! Every point mutation happens inside one directory write lock via the
//! `apply_*` methods on [`Directory`], then is mirrored to Postgres
//! transactionally. Hidden cards answer 404 to everyone but admins so
//! moderation is indistinguishable from deletion.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use kudos_core::{
    CardId, CardMessage, CardRecord, CommentBody, CommentId, CommentRecord, EmojiTag, LikeId,
    LikeRecord, NotificationKind, NotificationRecord, PointAmount, ReactionId, ReactionRecord,
    Recipient, TeamId, UserId,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::ledger::RecipientRow;
use crate::error::ApiError;
use crate::extractors::{extract_validated_json, CurrentUser, Validate};
use crate::state::{AppState, Directory};

/// Wire shape of a card recipient.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RecipientRequest {
    User(Uuid),
    Team(Uuid),
}

impl From<RecipientRequest> for Recipient {
    fn from(value: RecipientRequest) -> Self {
        match value {
            RecipientRequest::User(id) => Recipient::User(UserId::from_uuid(id)),
            RecipientRequest::Team(id) => Recipient::Team(TeamId::from_uuid(id)),
        }
    }
}

/// Card creation request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCardRequest {
    pub recipient: RecipientRequest,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub additional_recipients: Vec<Uuid>,
    pub message: String,
    /// Point allocation, 0–140.
    #[serde(default)]
    pub points: u32,
    /// Whether the card appears on the shared timeline.
    #[serde(default = "default_public")]
    pub public: bool,
}

fn default_public() -> bool {
    true
}

impl Validate for CreateCardRequest {
    fn validate(&self) -> Result<(), String> {
        if self.additional_recipients.len() > 20 {
            return Err("at most 20 additional recipients".to_string());
        }
        // Full message/point validation happens via the domain
        // constructors in the handler; cheap structural checks here.
        if self.message.trim().is_empty() {
            return Err("card message must not be empty".to_string());
        }
        Ok(())
    }
}

/// Reaction request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReactionRequest {
    pub emoji: String,
}

impl Validate for ReactionRequest {
    fn validate(&self) -> Result<(), String> {
        if self.emoji.trim().is_empty() {
            return Err("emoji must not be empty".to_string());
        }
        Ok(())
    }
}

/// Comment creation / edit request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentRequest {
    pub body: String,
}

impl Validate for CommentRequest {
    fn validate(&self) -> Result<(), String> {
        if self.body.trim().is_empty() {
            return Err("comment must not be empty".to_string());
        }
        Ok(())
    }
}

/// Timeline query filters.
#[derive(Debug, Deserialize)]
pub struct ListCardsQuery {
    pub sender: Option<Uuid>,
    pub recipient_user: Option<Uuid>,
    pub recipient_team: Option<Uuid>,
    /// Admin-only: include hidden cards.
    #[serde(default)]
    pub include_hidden: bool,
    pub limit: Option<usize>,
}

/// Summary view of a card with interaction counts.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CardView {
    #[schema(value_type = String)]
    pub id: CardId,
    #[schema(value_type = String)]
    pub sender_id: UserId,
    #[schema(value_type = Object)]
    pub recipient: Recipient,
    #[schema(value_type = Vec<String>)]
    pub additional_recipients: Vec<UserId>,
    pub message: String,
    pub points: u32,
    pub public: bool,
    pub hidden: bool,
    pub like_count: u64,
    pub reaction_count: u64,
    pub comment_count: u64,
    pub created_at: DateTime<Utc>,
}

impl CardView {
    fn build(directory: &Directory, card: &CardRecord) -> Self {
        let like_count = directory.likes.values().filter(|l| l.card_id == card.id).count() as u64;
        let reaction_count = directory
            .reactions
            .keys()
            .filter(|(card_id, _)| *card_id == card.id)
            .count() as u64;
        let comment_count = directory
            .comments
            .values()
            .filter(|c| c.card_id == card.id)
            .count() as u64;
        Self {
            id: card.id,
            sender_id: card.sender_id,
            recipient: card.recipient,
            additional_recipients: card.additional_recipients.clone(),
            message: card.message.as_str().to_string(),
            points: card.points.value(),
            public: card.public,
            hidden: card.hidden,
            like_count,
            reaction_count,
            comment_count,
            created_at: card.created_at,
        }
    }
}

/// A like on the wire.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LikeView {
    #[schema(value_type = String)]
    pub id: LikeId,
    #[schema(value_type = String)]
    pub card_id: CardId,
    #[schema(value_type = String)]
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<&LikeRecord> for LikeView {
    fn from(like: &LikeRecord) -> Self {
        Self {
            id: like.id,
            card_id: like.card_id,
            user_id: like.user_id,
            created_at: like.created_at,
        }
    }
}

/// A reaction on the wire.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReactionView {
    #[schema(value_type = String)]
    pub user_id: UserId,
    pub emoji: String,
    pub updated_at: DateTime<Utc>,
}

/// A comment on the wire.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentView {
    #[schema(value_type = String)]
    pub id: CommentId,
    #[schema(value_type = String)]
    pub card_id: CardId,
    #[schema(value_type = String)]
    pub author_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            id: comment.id,
            card_id: comment.card_id,
            author_id: comment.author_id,
            body: comment.body.as_str().to_string(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

/// Detail view: the card plus its full interaction lists.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CardDetailView {
    #[serde(flatten)]
    pub card: CardView,
    pub likes: Vec<LikeView>,
    pub reactions: Vec<ReactionView>,
    pub comments: Vec<CommentView>,
}

/// Build the cards router (likes, reactions, and comments ride on it).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cards", post(create_card).get(list_cards))
        .route("/api/cards/:id", get(get_card))
        .route("/api/cards/:id/hide", post(hide_card))
        .route("/api/cards/:id/unhide", post(unhide_card))
        .route("/api/cards/:id/likes", post(create_like))
        .route("/api/cards/:id/likes/:like_id", axum::routing::delete(delete_like))
        .route("/api/cards/:id/reaction", put(put_reaction).delete(delete_reaction))
        .route("/api/cards/:id/comments", post(create_comment))
        .route(
            "/api/comments/:id",
            axum::routing::patch(update_comment).delete(delete_comment),
        )
}

/// Everyone who should be notified that this card arrived.
fn card_audience(directory: &Directory, card: &CardRecord) -> Vec<UserId> {
    let mut audience = match card.recipient {
        Recipient::User(id) => vec![id],
        Recipient::Team(id) => directory.team_member_ids(id),
    };
    audience.extend(card.additional_recipients.iter().copied());
    audience.sort();
    audience.dedup();
    audience
}

/// The card's sender and primary user recipient — the parties notified
/// about likes, comments, and reactions.
fn card_parties(card: &CardRecord) -> Vec<UserId> {
    let mut parties = vec![card.sender_id];
    if let Some(user) = card.recipient.as_user() {
        parties.push(user);
    }
    parties
}

/// Mirror a batch of notifications to the database.
async fn persist_notifications(
    state: &AppState,
    notifications: &[NotificationRecord],
) -> Result<(), ApiError> {
    if let Some(pool) = &state.db_pool {
        for notification in notifications {
            crate::db::notifications::insert(pool, notification).await?;
        }
    }
    Ok(())
}

/// Fetch a card enforcing visibility for the caller; hidden and
/// invisible cards 404.
fn visible_card(
    directory: &Directory,
    id: CardId,
    caller: &CurrentUser,
) -> Result<CardRecord, ApiError> {
    let card = directory
        .cards
        .get(&id)
        .ok_or_else(|| ApiError::card_not_found(id))?;
    if !directory.card_visible_to(card, caller.id, caller.is_admin) {
        return Err(ApiError::card_not_found(id));
    }
    Ok(card.clone())
}

/// POST /api/cards — Send a thanks card.
#[utoipa::path(
    post,
    path = "/api/cards",
    request_body = CreateCardRequest,
    responses(
        (status = 201, description = "Card sent", body = CardView),
        (status = 400, description = "Validation or budget failure", body = crate::error::ErrorBody),
    ),
    tag = "cards"
)]
async fn create_card(
    State(state): State<AppState>,
    caller: CurrentUser,
    body: Result<Json<CreateCardRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CardView>), ApiError> {
    let req = extract_validated_json(body)?;

    let message = CardMessage::new(&req.message)?;
    let points = PointAmount::new(req.points)?;
    let recipient: Recipient = req.recipient.into();
    let mut additional: Vec<UserId> = req
        .additional_recipients
        .iter()
        .copied()
        .map(UserId::from_uuid)
        .collect();
    additional.sort();
    additional.dedup();
    if let Some(primary) = recipient.as_user() {
        additional.retain(|id| *id != primary);
    }

    kudos_ledger::validate_card_recipients(caller.id, &recipient, &additional)?;

    let card = CardRecord {
        id: CardId::new(),
        sender_id: caller.id,
        recipient,
        additional_recipients: additional,
        message,
        points,
        public: req.public,
        hidden: false,
        created_at: Utc::now(),
    };

    // One write lock across validation, the grant, and notifications.
    let (snapshot, notifications) = {
        let mut directory = state.directory.write();
        for extra in &card.additional_recipients {
            if !directory.users.contains_key(extra) {
                return Err(ApiError::NotFound(format!("user {extra} not found")));
            }
        }
        directory.apply_card_grant(card.clone())?;

        let audience = card_audience(&directory, &card);
        let notifications: Vec<NotificationRecord> = audience
            .into_iter()
            .filter_map(|user| {
                directory.push_notification(user, NotificationKind::CardReceived, card.id, caller.id)
            })
            .collect();

        (ledger_snapshot(&directory, &card)?, notifications)
    };

    if let Some(pool) = &state.db_pool {
        let recipient_row = snapshot.recipient_row();
        if let Err(e) =
            crate::db::ledger::persist_card_grant(pool, &card, &snapshot.sender, recipient_row).await
        {
            tracing::error!(card_id = %card.id, error = %e, "failed to persist card grant");
            return Err(ApiError::Internal(
                "card recorded in-memory but database persist failed".to_string(),
            ));
        }
    }
    persist_notifications(&state, &notifications).await?;

    let directory = state.directory.read();
    let view = CardView::build(&directory, &card);
    tracing::info!(card_id = %card.id, sender = %caller.id, points = card.points.value(), "card sent");
    Ok((StatusCode::CREATED, Json(view)))
}

/// Post-mutation snapshot of the rows a ledger write touched, for the
/// transactional database mirror.
struct LedgerSnapshot {
    sender: kudos_core::UserRecord,
    recipient_user: Option<kudos_core::UserRecord>,
    recipient_team: Option<kudos_core::TeamRecord>,
}

impl LedgerSnapshot {
    fn recipient_row(&self) -> RecipientRow<'_> {
        match (&self.recipient_user, &self.recipient_team) {
            (Some(user), _) => RecipientRow::User(user),
            (_, Some(team)) => RecipientRow::Team(team),
            _ => unreachable!("snapshot always holds one recipient"),
        }
    }
}

fn ledger_snapshot(directory: &Directory, card: &CardRecord) -> Result<LedgerSnapshot, ApiError> {
    let sender = directory
        .users
        .get(&card.sender_id)
        .cloned()
        .ok_or_else(|| ApiError::Internal("card sender missing after grant".to_string()))?;
    let (recipient_user, recipient_team) = match card.recipient {
        Recipient::User(id) => (
            Some(directory.users.get(&id).cloned().ok_or_else(|| {
                ApiError::Internal("card recipient missing after grant".to_string())
            })?),
            None,
        ),
        Recipient::Team(id) => (
            None,
            Some(directory.teams.get(&id).cloned().ok_or_else(|| {
                ApiError::Internal("card team missing after grant".to_string())
            })?),
        ),
    };
    Ok(LedgerSnapshot {
        sender,
        recipient_user,
        recipient_team,
    })
}

/// GET /api/cards — Timeline, newest first.
#[utoipa::path(
    get,
    path = "/api/cards",
    responses((status = 200, description = "Visible cards", body = [CardView])),
    tag = "cards"
)]
async fn list_cards(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(query): Query<ListCardsQuery>,
) -> Result<Json<Vec<CardView>>, ApiError> {
    let include_hidden = query.include_hidden && caller.is_admin;
    let limit = query.limit.unwrap_or(100).min(500);
    let directory = state.directory.read();

    let mut cards: Vec<&CardRecord> = directory
        .cards
        .values()
        .filter(|card| directory.card_visible_to(card, caller.id, include_hidden))
        .filter(|card| match query.sender {
            Some(sender) => card.sender_id == UserId::from_uuid(sender),
            None => true,
        })
        .filter(|card| match query.recipient_user {
            Some(user) => {
                let user = UserId::from_uuid(user);
                card.recipient.as_user() == Some(user)
                    || card.additional_recipients.contains(&user)
            }
            None => true,
        })
        .filter(|card| match query.recipient_team {
            Some(team) => card.recipient.as_team() == Some(TeamId::from_uuid(team)),
            None => true,
        })
        .collect();
    cards.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    cards.truncate(limit);

    Ok(Json(cards.into_iter().map(|c| CardView::build(&directory, c)).collect()))
}

/// GET /api/cards/:id — Card detail with interactions.
#[utoipa::path(
    get,
    path = "/api/cards/{id}",
    params(("id" = Uuid, Path, description = "Card ID")),
    responses(
        (status = 200, description = "Card detail", body = CardDetailView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "cards"
)]
async fn get_card(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CardDetailView>, ApiError> {
    let id = CardId::from_uuid(id);
    let directory = state.directory.read();
    let card = visible_card(&directory, id, &caller)?;

    let mut likes: Vec<LikeView> = directory
        .likes
        .values()
        .filter(|l| l.card_id == id)
        .map(LikeView::from)
        .collect();
    likes.sort_by_key(|l| l.created_at);

    let mut reactions: Vec<ReactionView> = directory
        .reactions
        .values()
        .filter(|r| r.card_id == id)
        .map(|r| ReactionView {
            user_id: r.user_id,
            emoji: r.emoji.as_str().to_string(),
            updated_at: r.updated_at,
        })
        .collect();
    reactions.sort_by_key(|r| r.updated_at);

    let mut comments: Vec<CommentView> = directory
        .comments
        .values()
        .filter(|c| c.card_id == id)
        .map(CommentView::from)
        .collect();
    comments.sort_by_key(|c| c.created_at);

    Ok(Json(CardDetailView {
        card: CardView::build(&directory, &card),
        likes,
        reactions,
        comments,
    }))
}

async fn set_hidden(
    state: AppState,
    caller: CurrentUser,
    id: Uuid,
    hidden: bool,
) -> Result<Json<CardView>, ApiError> {
    caller.require_admin()?;
    let id = CardId::from_uuid(id);

    let card = {
        let mut directory = state.directory.write();
        let card = directory
            .cards
            .get_mut(&id)
            .ok_or_else(|| ApiError::card_not_found(id))?;
        card.hidden = hidden;
        card.clone()
    };

    if let Some(pool) = &state.db_pool {
        crate::db::cards::set_hidden(pool, id, hidden).await?;
    }

    tracing::info!(card_id = %id, hidden, "card moderation flag changed");
    let directory = state.directory.read();
    Ok(Json(CardView::build(&directory, &card)))
}

/// POST /api/cards/:id/hide — Hide a card (admin).
#[utoipa::path(
    post,
    path = "/api/cards/{id}/hide",
    params(("id" = Uuid, Path, description = "Card ID")),
    responses((status = 200, description = "Card hidden", body = CardView)),
    tag = "cards"
)]
async fn hide_card(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CardView>, ApiError> {
    set_hidden(state, caller, id, true).await
}

/// POST /api/cards/:id/unhide — Unhide a card (admin).
#[utoipa::path(
    post,
    path = "/api/cards/{id}/unhide",
    params(("id" = Uuid, Path, description = "Card ID")),
    responses((status = 200, description = "Card unhidden", body = CardView)),
    tag = "cards"
)]
async fn unhide_card(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CardView>, ApiError> {
    set_hidden(state, caller, id, false).await
}

/// POST /api/cards/:id/likes — Like a card (costs 2 points).
#[utoipa::path(
    post,
    path = "/api/cards/{id}/likes",
    params(("id" = Uuid, Path, description = "Card ID")),
    responses(
        (status = 201, description = "Like recorded", body = LikeView),
        (status = 400, description = "Budget or eligibility failure", body = crate::error::ErrorBody),
        (status = 409, description = "Per-card cap reached", body = crate::error::ErrorBody),
    ),
    tag = "likes"
)]
async fn create_like(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<LikeView>), ApiError> {
    let card_id = CardId::from_uuid(id);

    let (like, card, liker, snapshot, notifications) = {
        let mut directory = state.directory.write();
        let like = directory.apply_like(card_id, caller.id)?;
        let card = directory
            .cards
            .get(&card_id)
            .cloned()
            .ok_or_else(|| ApiError::card_not_found(card_id))?;
        let liker = directory
            .users
            .get(&caller.id)
            .cloned()
            .ok_or_else(|| ApiError::Internal("liker missing after like".to_string()))?;
        let notifications: Vec<NotificationRecord> = card_parties(&card)
            .into_iter()
            .filter_map(|user| {
                directory.push_notification(user, NotificationKind::CardLiked, card_id, caller.id)
            })
            .collect();
        let snapshot = ledger_snapshot(&directory, &card)?;
        (like, card, liker, snapshot, notifications)
    };

    if let Some(pool) = &state.db_pool {
        let recipient_row = snapshot.recipient_row();
        if let Err(e) =
            crate::db::ledger::persist_like(pool, &like, &liker, &snapshot.sender, recipient_row)
                .await
        {
            tracing::error!(card_id = %card_id, error = %e, "failed to persist like");
            return Err(ApiError::Internal(
                "like recorded in-memory but database persist failed".to_string(),
            ));
        }
    }
    persist_notifications(&state, &notifications).await?;

    tracing::debug!(card_id = %card.id, liker = %caller.id, "card liked");
    Ok((StatusCode::CREATED, Json(LikeView::from(&like))))
}

/// DELETE /api/cards/:id/likes/:like_id — Remove a like (refunds points).
#[utoipa::path(
    delete,
    path = "/api/cards/{id}/likes/{like_id}",
    params(
        ("id" = Uuid, Path, description = "Card ID"),
        ("like_id" = Uuid, Path, description = "Like ID"),
    ),
    responses(
        (status = 204, description = "Like removed"),
        (status = 403, description = "Not your like", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "likes"
)]
async fn delete_like(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path((id, like_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let card_id = CardId::from_uuid(id);
    let like_id = LikeId::from_uuid(like_id);

    let (liker, snapshot) = {
        let mut directory = state.directory.write();
        directory.apply_unlike(card_id, like_id, caller.id)?;
        let card = directory
            .cards
            .get(&card_id)
            .cloned()
            .ok_or_else(|| ApiError::card_not_found(card_id))?;
        let liker = directory
            .users
            .get(&caller.id)
            .cloned()
            .ok_or_else(|| ApiError::Internal("liker missing after unlike".to_string()))?;
        (liker, ledger_snapshot(&directory, &card)?)
    };

    if let Some(pool) = &state.db_pool {
        let recipient_row = snapshot.recipient_row();
        if let Err(e) =
            crate::db::ledger::persist_unlike(pool, like_id, &liker, &snapshot.sender, recipient_row)
                .await
        {
            tracing::error!(card_id = %card_id, error = %e, "failed to persist unlike");
            return Err(ApiError::Internal(
                "unlike applied in-memory but database persist failed".to_string(),
            ));
        }
    }

    tracing::debug!(card_id = %card_id, liker = %caller.id, "like removed");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/cards/:id/reaction — Add or replace the caller's reaction.
#[utoipa::path(
    put,
    path = "/api/cards/{id}/reaction",
    params(("id" = Uuid, Path, description = "Card ID")),
    request_body = ReactionRequest,
    responses(
        (status = 200, description = "Reaction set", body = ReactionView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "reactions"
)]
async fn put_reaction(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
    body: Result<Json<ReactionRequest>, JsonRejection>,
) -> Result<Json<ReactionView>, ApiError> {
    let card_id = CardId::from_uuid(id);
    let req = extract_validated_json(body)?;
    let emoji = EmojiTag::new(&req.emoji)?;

    let (reaction, notifications) = {
        let mut directory = state.directory.write();
        let card = visible_card(&directory, card_id, &caller)?;
        if card.hidden {
            return Err(ApiError::card_not_found(card_id));
        }
        let now = Utc::now();
        let reaction = match directory.reactions.get(&(card_id, caller.id)) {
            Some(existing) => ReactionRecord {
                id: existing.id,
                card_id,
                user_id: caller.id,
                emoji,
                created_at: existing.created_at,
                updated_at: now,
            },
            None => ReactionRecord {
                id: ReactionId::new(),
                card_id,
                user_id: caller.id,
                emoji,
                created_at: now,
                updated_at: now,
            },
        };
        let fresh = directory
            .reactions
            .insert((card_id, caller.id), reaction.clone())
            .is_none();
        // Only the first reaction notifies; emoji swaps stay quiet.
        let notifications: Vec<NotificationRecord> = if fresh {
            card_parties(&card)
                .into_iter()
                .filter_map(|user| {
                    directory.push_notification(
                        user,
                        NotificationKind::CardReaction,
                        card_id,
                        caller.id,
                    )
                })
                .collect()
        } else {
            Vec::new()
        };
        (reaction, notifications)
    };

    if let Some(pool) = &state.db_pool {
        crate::db::cards::upsert_reaction(pool, &reaction).await?;
    }
    persist_notifications(&state, &notifications).await?;

    Ok(Json(ReactionView {
        user_id: reaction.user_id,
        emoji: reaction.emoji.as_str().to_string(),
        updated_at: reaction.updated_at,
    }))
}

/// DELETE /api/cards/:id/reaction — Remove the caller's reaction.
#[utoipa::path(
    delete,
    path = "/api/cards/{id}/reaction",
    params(("id" = Uuid, Path, description = "Card ID")),
    responses(
        (status = 204, description = "Reaction removed"),
        (status = 404, description = "No reaction to remove", body = crate::error::ErrorBody),
    ),
    tag = "reactions"
)]
async fn delete_reaction(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let card_id = CardId::from_uuid(id);

    {
        let mut directory = state.directory.write();
        if directory.reactions.remove(&(card_id, caller.id)).is_none() {
            return Err(ApiError::NotFound("no reaction on this card".to_string()));
        }
    }

    if let Some(pool) = &state.db_pool {
        crate::db::cards::delete_reaction(pool, card_id, caller.id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/cards/:id/comments — Comment on a card.
#[utoipa::path(
    post,
    path = "/api/cards/{id}/comments",
    params(("id" = Uuid, Path, description = "Card ID")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CommentView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "comments"
)]
async fn create_comment(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
    body: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let card_id = CardId::from_uuid(id);
    let req = extract_validated_json(body)?;
    let comment_body = CommentBody::new(&req.body)?;

    let (comment, notifications) = {
        let mut directory = state.directory.write();
        let card = visible_card(&directory, card_id, &caller)?;
        if card.hidden {
            return Err(ApiError::card_not_found(card_id));
        }
        let now = Utc::now();
        let comment = CommentRecord {
            id: CommentId::new(),
            card_id,
            author_id: caller.id,
            body: comment_body,
            created_at: now,
            updated_at: now,
        };
        directory.comments.insert(comment.id, comment.clone());
        let notifications: Vec<NotificationRecord> = card_parties(&card)
            .into_iter()
            .filter_map(|user| {
                directory.push_notification(user, NotificationKind::CardCommented, card_id, caller.id)
            })
            .collect();
        (comment, notifications)
    };

    if let Some(pool) = &state.db_pool {
        crate::db::cards::insert_comment(pool, &comment).await?;
    }
    persist_notifications(&state, &notifications).await?;

    Ok((StatusCode::CREATED, Json(CommentView::from(&comment))))
}

/// PATCH /api/comments/:id — Edit your comment.
#[utoipa::path(
    patch,
    path = "/api/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentView),
        (status = 403, description = "Not your comment", body = crate::error::ErrorBody),
    ),
    tag = "comments"
)]
async fn update_comment(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
    body: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<Json<CommentView>, ApiError> {
    let id = CommentId::from_uuid(id);
    let req = extract_validated_json(body)?;
    let comment_body = CommentBody::new(&req.body)?;

    let comment = {
        let mut directory = state.directory.write();
        let comment = directory
            .comments
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound(format!("comment {id} not found")))?;
        if comment.author_id != caller.id {
            return Err(ApiError::Forbidden("only the author can edit a comment".to_string()));
        }
        comment.body = comment_body;
        comment.updated_at = Utc::now();
        comment.clone()
    };

    if let Some(pool) = &state.db_pool {
        crate::db::cards::update_comment(pool, &comment).await?;
    }

    Ok(Json(CommentView::from(&comment)))
}

/// DELETE /api/comments/:id — Delete your comment.
#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Not your comment", body = crate::error::ErrorBody),
    ),
    tag = "comments"
)]
async fn delete_comment(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let id = CommentId::from_uuid(id);

    {
        let mut directory = state.directory.write();
        let comment = directory
            .comments
            .get(&id)
            .ok_or_else(|| ApiError::NotFound(format!("comment {id} not found")))?;
        if comment.author_id != caller.id {
            return Err(ApiError::Forbidden("only the author can delete a comment".to_string()));
        }
        directory.comments.remove(&id);
    }

    if let Some(pool) = &state.db_pool {
        crate::db::cards::delete_comment(pool, id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
