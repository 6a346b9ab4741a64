//! # Database Persistence Layer
//!
//! Postgres persistence via SQLx. The database is **optional**: when
//! `DATABASE_URL` is set, every mutation is mirrored to Postgres in the
//! handling request (multi-row ledger mutations inside one transaction)
//! and the in-memory directory is hydrated from Postgres at startup. When
//! absent, the API operates memory-only — suitable for development and
//! tests.
//!
//! Row mapping follows one convention throughout: a private
//! `#[derive(sqlx::FromRow)]` row struct per table with an `into_record`
//! conversion, so the record types in `kudos-core` never grow SQLx
//! derives.

pub mod cards;
pub mod ledger;
pub mod notifications;
pub mod orgs;
pub mod sessions;
pub mod users;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::state::Directory;

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running memory-only. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Load every table into the in-memory directory at startup.
pub async fn hydrate(pool: &PgPool, directory: &mut Directory) -> Result<(), sqlx::Error> {
    for user in users::load_all(pool).await? {
        directory.users.insert(user.id, user);
    }
    for team in orgs::load_teams(pool).await? {
        directory.teams.insert(team.id, team);
    }
    directory.team_members = orgs::load_team_members(pool).await?;
    for department in orgs::load_departments(pool).await? {
        directory.departments.insert(department.id, department);
    }
    for membership in orgs::load_user_departments(pool).await? {
        directory
            .user_departments
            .entry(membership.user_id)
            .or_default()
            .push(membership.department_id);
    }
    for card in cards::load_cards(pool).await? {
        directory.cards.insert(card.id, card);
    }
    for like in cards::load_likes(pool).await? {
        directory.likes.insert(like.id, like);
    }
    for reaction in cards::load_reactions(pool).await? {
        directory
            .reactions
            .insert((reaction.card_id, reaction.user_id), reaction);
    }
    for comment in cards::load_comments(pool).await? {
        directory.comments.insert(comment.id, comment);
    }
    for notification in notifications::load_all(pool).await? {
        directory.notifications.insert(notification.id, notification);
    }
    for session in sessions::load_sessions(pool).await? {
        directory.sessions.insert(session.token.clone(), session);
    }
    for token in sessions::load_reset_tokens(pool).await? {
        directory.reset_tokens.insert(token.token.clone(), token);
    }

    tracing::info!(
        users = directory.users.len(),
        cards = directory.cards.len(),
        likes = directory.likes.len(),
        sessions = directory.sessions.len(),
        "directory hydrated from database"
    );
    Ok(())
}
