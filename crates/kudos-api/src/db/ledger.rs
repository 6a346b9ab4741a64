//! Transactional persistence for ledger mutations.
//!
//! Every mutation that moves points touches several rows (the like row
//! plus two or three counter rows, or the card row plus two). Each
//! function here wraps those writes in one transaction so the database
//! mirror can never hold half a point movement.

use kudos_core::{CardRecord, LikeId, LikeRecord, TeamRecord, UserRecord};
use sqlx::{PgPool, Postgres, Transaction};

use crate::db::cards::insert_card;

/// The recipient-side row touched by a grant/like, post-mutation.
pub enum RecipientRow<'a> {
    User(&'a UserRecord),
    Team(&'a TeamRecord),
}

async fn update_user_counters(
    tx: &mut Transaction<'_, Postgres>,
    user: &UserRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET weekly_points = $2, weekly_points_received = $3,
                          total_points_received = $4
         WHERE id = $1",
    )
    .bind(user.id.as_uuid())
    .bind(user.weekly_points as i32)
    .bind(user.weekly_points_received as i64)
    .bind(user.total_points_received as i64)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn update_recipient_counters(
    tx: &mut Transaction<'_, Postgres>,
    recipient: &RecipientRow<'_>,
) -> Result<(), sqlx::Error> {
    match recipient {
        RecipientRow::User(user) => update_user_counters(tx, user).await,
        RecipientRow::Team(team) => {
            sqlx::query(
                "UPDATE teams SET weekly_points_received = $2, total_points_received = $3
                 WHERE id = $1",
            )
            .bind(team.id.as_uuid())
            .bind(team.weekly_points_received as i64)
            .bind(team.total_points_received as i64)
            .execute(&mut **tx)
            .await?;
            Ok(())
        }
    }
}

/// Persist a card creation and its point movement.
pub async fn persist_card_grant(
    pool: &PgPool,
    card: &CardRecord,
    sender: &UserRecord,
    recipient: RecipientRow<'_>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    insert_card(&mut *tx, card).await?;
    update_user_counters(&mut tx, sender).await?;
    update_recipient_counters(&mut tx, &recipient).await?;
    tx.commit().await
}

/// Persist a like and its 2-point movement.
pub async fn persist_like(
    pool: &PgPool,
    like: &LikeRecord,
    liker: &UserRecord,
    card_sender: &UserRecord,
    recipient: RecipientRow<'_>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO likes (id, card_id, user_id, created_at) VALUES ($1, $2, $3, $4)")
        .bind(like.id.as_uuid())
        .bind(like.card_id.as_uuid())
        .bind(like.user_id.as_uuid())
        .bind(like.created_at)
        .execute(&mut *tx)
        .await?;
    update_user_counters(&mut tx, liker).await?;
    update_user_counters(&mut tx, card_sender).await?;
    update_recipient_counters(&mut tx, &recipient).await?;
    tx.commit().await
}

/// Persist a like deletion and its refund.
pub async fn persist_unlike(
    pool: &PgPool,
    like_id: LikeId,
    liker: &UserRecord,
    card_sender: &UserRecord,
    recipient: RecipientRow<'_>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM likes WHERE id = $1")
        .bind(like_id.as_uuid())
        .execute(&mut *tx)
        .await?;
    update_user_counters(&mut tx, liker).await?;
    update_user_counters(&mut tx, card_sender).await?;
    update_recipient_counters(&mut tx, &recipient).await?;
    tx.commit().await
}

/// Persist the weekly reset as two bulk updates.
pub async fn persist_weekly_reset(pool: &PgPool, budget: u32) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE users SET weekly_points = $1, weekly_points_received = 0 WHERE is_active",
    )
    .bind(budget as i32)
    .execute(&mut *tx)
    .await?;
    sqlx::query("UPDATE teams SET weekly_points_received = 0")
        .execute(&mut *tx)
        .await?;
    tx.commit().await
}
