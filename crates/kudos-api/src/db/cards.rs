//! Card, like, reaction, and comment persistence operations.
//!
//! Inserts that move points (cards with an allocation, likes) are handled
//! transactionally in [`crate::db::ledger`]; the plain writes live here.

use chrono::{DateTime, Utc};
use kudos_core::{
    CardId, CardMessage, CardRecord, CommentBody, CommentId, CommentRecord, EmojiTag, LikeId,
    LikeRecord, PointAmount, ReactionRecord, ReactionId, Recipient, TeamId, UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a card row. Card creation goes through
/// [`crate::db::ledger::persist_card_grant`], which calls this inside its
/// transaction; the executor is generic for that reason.
pub async fn insert_card<'e, E>(executor: E, card: &CardRecord) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let (recipient_kind, recipient_id) = match card.recipient {
        Recipient::User(id) => ("user", *id.as_uuid()),
        Recipient::Team(id) => ("team", *id.as_uuid()),
    };
    let additional: Vec<Uuid> = card
        .additional_recipients
        .iter()
        .map(|id| *id.as_uuid())
        .collect();

    sqlx::query(
        "INSERT INTO cards (id, sender_id, recipient_kind, recipient_id, additional_recipients,
                            message, points, is_public, hidden, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(card.id.as_uuid())
    .bind(card.sender_id.as_uuid())
    .bind(recipient_kind)
    .bind(recipient_id)
    .bind(&additional)
    .bind(card.message.as_str())
    .bind(card.points.value() as i32)
    .bind(card.public)
    .bind(card.hidden)
    .bind(card.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Set a card's hidden flag. Returns whether a row matched.
pub async fn set_hidden(pool: &PgPool, id: CardId, hidden: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE cards SET hidden = $2 WHERE id = $1")
        .bind(id.as_uuid())
        .bind(hidden)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Upsert a reaction: one row per (card, user), emoji replaced in place.
pub async fn upsert_reaction(pool: &PgPool, reaction: &ReactionRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO reactions (id, card_id, user_id, emoji, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (card_id, user_id)
         DO UPDATE SET emoji = EXCLUDED.emoji, updated_at = EXCLUDED.updated_at",
    )
    .bind(reaction.id.as_uuid())
    .bind(reaction.card_id.as_uuid())
    .bind(reaction.user_id.as_uuid())
    .bind(reaction.emoji.as_str())
    .bind(reaction.created_at)
    .bind(reaction.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete a user's reaction on a card.
pub async fn delete_reaction(
    pool: &PgPool,
    card: CardId,
    user: UserId,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM reactions WHERE card_id = $1 AND user_id = $2")
        .bind(card.as_uuid())
        .bind(user.as_uuid())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Insert a comment row.
pub async fn insert_comment(pool: &PgPool, comment: &CommentRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO comments (id, card_id, author_id, body, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(comment.id.as_uuid())
    .bind(comment.card_id.as_uuid())
    .bind(comment.author_id.as_uuid())
    .bind(comment.body.as_str())
    .bind(comment.created_at)
    .bind(comment.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update a comment's body.
pub async fn update_comment(pool: &PgPool, comment: &CommentRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE comments SET body = $2, updated_at = $3 WHERE id = $1")
        .bind(comment.id.as_uuid())
        .bind(comment.body.as_str())
        .bind(comment.updated_at)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a comment row.
pub async fn delete_comment(pool: &PgPool, id: CommentId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id.as_uuid())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// -- startup hydration --------------------------------------------------------

/// Load all cards.
pub async fn load_cards(pool: &PgPool) -> Result<Vec<CardRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CardRow>(
        "SELECT id, sender_id, recipient_kind, recipient_id, additional_recipients,
                message, points, is_public, hidden, created_at
         FROM cards ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().filter_map(CardRow::into_record).collect())
}

/// Load all likes.
pub async fn load_likes(pool: &PgPool) -> Result<Vec<LikeRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LikeRow>(
        "SELECT id, card_id, user_id, created_at FROM likes ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(LikeRow::into_record).collect())
}

/// Load all reactions.
pub async fn load_reactions(pool: &PgPool) -> Result<Vec<ReactionRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ReactionRow>(
        "SELECT id, card_id, user_id, emoji, created_at, updated_at FROM reactions",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().filter_map(ReactionRow::into_record).collect())
}

/// Load all comments.
pub async fn load_comments(pool: &PgPool) -> Result<Vec<CommentRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CommentRow>(
        "SELECT id, card_id, author_id, body, created_at, updated_at
         FROM comments ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().filter_map(CommentRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct CardRow {
    id: Uuid,
    sender_id: Uuid,
    recipient_kind: String,
    recipient_id: Uuid,
    additional_recipients: Vec<Uuid>,
    message: String,
    points: i32,
    is_public: bool,
    hidden: bool,
    created_at: DateTime<Utc>,
}

impl CardRow {
    fn into_record(self) -> Option<CardRecord> {
        let recipient = match self.recipient_kind.as_str() {
            "user" => Recipient::User(UserId::from_uuid(self.recipient_id)),
            "team" => Recipient::Team(TeamId::from_uuid(self.recipient_id)),
            other => {
                tracing::warn!(id = %self.id, kind = %other, "skipping card with unknown recipient kind");
                return None;
            }
        };
        let message = match CardMessage::new(&self.message) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "skipping card with invalid message");
                return None;
            }
        };
        let points = match PointAmount::new(self.points.max(0) as u32) {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "skipping card with invalid points");
                return None;
            }
        };
        Some(CardRecord {
            id: CardId::from_uuid(self.id),
            sender_id: UserId::from_uuid(self.sender_id),
            recipient,
            additional_recipients: self
                .additional_recipients
                .into_iter()
                .map(UserId::from_uuid)
                .collect(),
            message,
            points,
            public: self.is_public,
            hidden: self.hidden,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LikeRow {
    id: Uuid,
    card_id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
}

impl LikeRow {
    fn into_record(self) -> LikeRecord {
        LikeRecord {
            id: LikeId::from_uuid(self.id),
            card_id: CardId::from_uuid(self.card_id),
            user_id: UserId::from_uuid(self.user_id),
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReactionRow {
    id: Uuid,
    card_id: Uuid,
    user_id: Uuid,
    emoji: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReactionRow {
    fn into_record(self) -> Option<ReactionRecord> {
        let emoji = match EmojiTag::new(&self.emoji) {
            Ok(emoji) => emoji,
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "skipping reaction with invalid emoji");
                return None;
            }
        };
        Some(ReactionRecord {
            id: ReactionId::from_uuid(self.id),
            card_id: CardId::from_uuid(self.card_id),
            user_id: UserId::from_uuid(self.user_id),
            emoji,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    card_id: Uuid,
    author_id: Uuid,
    body: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CommentRow {
    fn into_record(self) -> Option<CommentRecord> {
        let body = match CommentBody::new(&self.body) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "skipping comment with invalid body");
                return None;
            }
        };
        Some(CommentRecord {
            id: CommentId::from_uuid(self.id),
            card_id: CardId::from_uuid(self.card_id),
            author_id: UserId::from_uuid(self.author_id),
            body,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
