//! # Application State
//!
//! Shared state for the Axum application. The serving copy of every table
//! is an in-memory map inside [`Directory`], guarded by a single
//! `parking_lot::RwLock`; Postgres (when configured) is a write-through
//! mirror updated in the same request and used to hydrate the maps at
//! startup.
//!
//! One lock for the whole directory is deliberate: every ledger mutation
//! (card grant, like, refund, reset) reads and writes several records, and
//! holding one write guard across the read–decide–apply sequence is what
//! makes the per-card like cap and the weekly budget race-free. Lock
//! guards are never held across `.await` — database mirroring happens
//! after the guard is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use kudos_auth::OAuthProvider;
use kudos_core::{
    CardId, CardRecord, CommentId, CommentRecord, DepartmentId, DepartmentRecord, LikeId,
    LikeRecord, NotificationId, NotificationKind, NotificationRecord, ReactionRecord, Recipient,
    TeamId, TeamMemberRecord, TeamRecord, UserId, UserRecord,
};
use kudos_ledger::{RecipientCounters, LIKE_COST};
use parking_lot::RwLock;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::error::ApiError;

/// A server-side session row: opaque token → user, with expiry and
/// revocation.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl SessionRecord {
    /// Whether the session is usable at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// A single-use password reset token.
#[derive(Debug, Clone)]
pub struct ResetTokenRecord {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

/// A started OAuth authorization waiting for its callback: CSRF state →
/// PKCE verifier.
#[derive(Debug, Clone)]
pub struct PendingOAuthRecord {
    pub pkce_verifier: String,
    pub expires_at: DateTime<Utc>,
}

/// The in-memory serving copy of every table.
#[derive(Debug, Default)]
pub struct Directory {
    pub users: HashMap<UserId, UserRecord>,
    pub cards: HashMap<CardId, CardRecord>,
    pub likes: HashMap<LikeId, LikeRecord>,
    /// Keyed by (card, user) — at most one reaction per pair.
    pub reactions: HashMap<(CardId, UserId), ReactionRecord>,
    pub comments: HashMap<CommentId, CommentRecord>,
    pub teams: HashMap<TeamId, TeamRecord>,
    pub team_members: Vec<TeamMemberRecord>,
    pub departments: HashMap<DepartmentId, DepartmentRecord>,
    /// user → departments the user belongs to.
    pub user_departments: HashMap<UserId, Vec<DepartmentId>>,
    pub notifications: HashMap<NotificationId, NotificationRecord>,
    pub sessions: HashMap<String, SessionRecord>,
    pub reset_tokens: HashMap<String, ResetTokenRecord>,
    pub pending_oauth: HashMap<String, PendingOAuthRecord>,
}

impl Directory {
    // -- lookups -------------------------------------------------------------

    /// Find a user by normalized email.
    pub fn user_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.users.values().find(|u| u.email.as_str() == email)
    }

    /// Find a user by linked external identity.
    pub fn user_by_external_identity(&self, provider: &str, subject: &str) -> Option<&UserRecord> {
        self.users.values().find(|u| {
            u.external_identity
                .as_ref()
                .is_some_and(|ext| ext.provider == provider && ext.subject == subject)
        })
    }

    /// Member IDs of a team.
    pub fn team_member_ids(&self, team: TeamId) -> Vec<UserId> {
        self.team_members
            .iter()
            .filter(|m| m.team_id == team)
            .map(|m| m.user_id)
            .collect()
    }

    /// Teams a user belongs to.
    pub fn user_team_ids(&self, user: UserId) -> Vec<TeamId> {
        self.team_members
            .iter()
            .filter(|m| m.user_id == user)
            .map(|m| m.team_id)
            .collect()
    }

    /// Whether `user` may see `card`: public cards are visible to anyone,
    /// private ones to the sender and recipients (including recipient-team
    /// members). Hidden cards are visible only when `include_hidden`.
    pub fn card_visible_to(&self, card: &CardRecord, user: UserId, include_hidden: bool) -> bool {
        if card.hidden && !include_hidden {
            return false;
        }
        if card.public || card.involves_user(user) {
            return true;
        }
        match card.recipient.as_team() {
            Some(team) => self.team_member_ids(team).contains(&user),
            None => false,
        }
    }

    /// The liker's cumulative point spend on one card.
    pub fn like_spend_on_card(&self, card: CardId, user: UserId) -> u32 {
        let count = self
            .likes
            .values()
            .filter(|l| l.card_id == card && l.user_id == user)
            .count() as u32;
        count * LIKE_COST
    }

    // -- ledger write path ---------------------------------------------------
    //
    // Each apply_* method runs the read–decide–apply sequence on cloned
    // records and writes back only on success, all under the caller's
    // single write guard.

    /// Apply the point movement for a freshly validated card and insert it.
    pub fn apply_card_grant(&mut self, card: CardRecord) -> Result<(), ApiError> {
        let mut sender = self
            .users
            .get(&card.sender_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("user {} not found", card.sender_id)))?;

        match card.recipient {
            Recipient::User(recipient_id) => {
                let mut recipient = self
                    .users
                    .get(&recipient_id)
                    .cloned()
                    .ok_or_else(|| ApiError::NotFound(format!("user {recipient_id} not found")))?;
                kudos_ledger::grant_card(
                    &mut sender,
                    RecipientCounters::User(&mut recipient),
                    card.points,
                )?;
                self.users.insert(recipient_id, recipient);
            }
            Recipient::Team(team_id) => {
                let mut team = self
                    .teams
                    .get(&team_id)
                    .cloned()
                    .ok_or_else(|| ApiError::NotFound(format!("team {team_id} not found")))?;
                kudos_ledger::grant_card(
                    &mut sender,
                    RecipientCounters::Team(&mut team),
                    card.points,
                )?;
                self.teams.insert(team_id, team);
            }
        }
        self.users.insert(card.sender_id, sender);
        self.cards.insert(card.id, card);
        Ok(())
    }

    /// Apply a like by `liker` on `card_id`: eligibility, cap, budget,
    /// and the 2-point movement, then insert the like row.
    pub fn apply_like(&mut self, card_id: CardId, liker_id: UserId) -> Result<LikeRecord, ApiError> {
        let card = self
            .cards
            .get(&card_id)
            .cloned()
            .ok_or_else(|| ApiError::card_not_found(card_id))?;

        let team_members = match card.recipient.as_team() {
            Some(team) => self.team_member_ids(team),
            None => Vec::new(),
        };
        kudos_ledger::validate_like_eligibility(&card, liker_id, &team_members)?;

        let spent = self.like_spend_on_card(card_id, liker_id);

        let mut liker = self
            .users
            .get(&liker_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("user {liker_id} not found")))?;
        let mut sender = self
            .users
            .get(&card.sender_id)
            .cloned()
            .ok_or_else(|| ApiError::Internal(format!("card sender {} missing", card.sender_id)))?;

        match card.recipient {
            Recipient::User(recipient_id) => {
                let mut recipient = self.users.get(&recipient_id).cloned().ok_or_else(|| {
                    ApiError::Internal(format!("card recipient {recipient_id} missing"))
                })?;
                kudos_ledger::apply_like(
                    &mut liker,
                    &mut sender,
                    RecipientCounters::User(&mut recipient),
                    spent,
                )?;
                self.users.insert(recipient_id, recipient);
            }
            Recipient::Team(team_id) => {
                let mut team = self
                    .teams
                    .get(&team_id)
                    .cloned()
                    .ok_or_else(|| ApiError::Internal(format!("card team {team_id} missing")))?;
                kudos_ledger::apply_like(
                    &mut liker,
                    &mut sender,
                    RecipientCounters::Team(&mut team),
                    spent,
                )?;
                self.teams.insert(team_id, team);
            }
        }
        self.users.insert(liker_id, liker);
        self.users.insert(card.sender_id, sender);

        let like = LikeRecord {
            id: LikeId::new(),
            card_id,
            user_id: liker_id,
            created_at: Utc::now(),
        };
        self.likes.insert(like.id, like.clone());
        Ok(like)
    }

    /// Delete a like owned by `caller` and reverse its point movement.
    /// Returns the removed row for the database mirror.
    pub fn apply_unlike(
        &mut self,
        card_id: CardId,
        like_id: LikeId,
        caller: UserId,
    ) -> Result<LikeRecord, ApiError> {
        let like = self
            .likes
            .get(&like_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("like {like_id} not found")))?;
        if like.card_id != card_id {
            return Err(ApiError::NotFound(format!("like {like_id} not found")));
        }
        if like.user_id != caller {
            return Err(ApiError::Forbidden("only the liker can remove a like".to_string()));
        }
        let card = self
            .cards
            .get(&card_id)
            .cloned()
            .ok_or_else(|| ApiError::card_not_found(card_id))?;

        let mut liker = self
            .users
            .get(&caller)
            .cloned()
            .ok_or_else(|| ApiError::Internal(format!("liker {caller} missing")))?;
        let mut sender = self
            .users
            .get(&card.sender_id)
            .cloned()
            .ok_or_else(|| ApiError::Internal(format!("card sender {} missing", card.sender_id)))?;

        match card.recipient {
            Recipient::User(recipient_id) => {
                let mut recipient = self.users.get(&recipient_id).cloned().ok_or_else(|| {
                    ApiError::Internal(format!("card recipient {recipient_id} missing"))
                })?;
                kudos_ledger::refund_like(
                    &mut liker,
                    &mut sender,
                    RecipientCounters::User(&mut recipient),
                );
                self.users.insert(recipient_id, recipient);
            }
            Recipient::Team(team_id) => {
                let mut team = self
                    .teams
                    .get(&team_id)
                    .cloned()
                    .ok_or_else(|| ApiError::Internal(format!("card team {team_id} missing")))?;
                kudos_ledger::refund_like(
                    &mut liker,
                    &mut sender,
                    RecipientCounters::Team(&mut team),
                );
                self.teams.insert(team_id, team);
            }
        }
        self.users.insert(caller, liker);
        self.users.insert(card.sender_id, sender);
        self.likes.remove(&like_id);
        Ok(like)
    }

    /// Weekly reset over every active user and every team. Returns
    /// (users reset, teams reset).
    pub fn apply_weekly_reset(&mut self, budget: u32) -> (usize, usize) {
        let mut users = 0;
        for user in self.users.values_mut().filter(|u| u.is_active) {
            kudos_ledger::reset_user_week(user, budget);
            users += 1;
        }
        let mut teams = 0;
        for team in self.teams.values_mut() {
            kudos_ledger::reset_team_week(team);
            teams += 1;
        }
        (users, teams)
    }

    // -- notifications -------------------------------------------------------

    /// Create a notification row, skipping self-notifications.
    pub fn push_notification(
        &mut self,
        user_id: UserId,
        kind: NotificationKind,
        card_id: CardId,
        actor_id: UserId,
    ) -> Option<NotificationRecord> {
        if user_id == actor_id {
            return None;
        }
        let record = NotificationRecord {
            id: NotificationId::new(),
            user_id,
            kind,
            card_id,
            actor_id,
            read_at: None,
            created_at: Utc::now(),
        };
        self.notifications.insert(record.id, record.clone());
        Some(record)
    }

    // -- session / token housekeeping ---------------------------------------

    /// Drop expired sessions, reset tokens, and pending authorizations.
    /// Called opportunistically from the auth paths.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) {
        self.sessions.retain(|_, s| s.expires_at > now && !s.revoked);
        self.reset_tokens.retain(|_, t| t.expires_at > now && !t.consumed);
        self.pending_oauth.retain(|_, p| p.expires_at > now);
    }

    /// Revoke every session belonging to `user` (password reset, admin
    /// deactivation). Returns the revoked tokens for the database mirror.
    pub fn revoke_user_sessions(&mut self, user: UserId) -> Vec<String> {
        let mut revoked = Vec::new();
        for session in self.sessions.values_mut() {
            if session.user_id == user && !session.revoked {
                session.revoked = true;
                revoked.push(session.token.clone());
            }
        }
        revoked
    }
}

/// Delivery seam for password reset tokens. Production wires an email
/// sender here; the default sink writes to the structured log so an
/// operator can relay the token.
pub trait ResetTokenSink: Send + Sync {
    fn deliver(&self, email: &str, token: &str);
}

/// Default [`ResetTokenSink`]: the token goes to the log, nowhere else.
#[derive(Debug, Default)]
pub struct TracingResetSink;

impl ResetTokenSink for TracingResetSink {
    fn deliver(&self, email: &str, token: &str) {
        tracing::info!(%email, %token, "password reset token issued");
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: Option<PgPool>,
    pub oauth: Option<Arc<OAuthProvider>>,
    pub reset_sink: Arc<dyn ResetTokenSink>,
    pub directory: Arc<RwLock<Directory>>,
}

impl AppState {
    /// In-memory state with default configuration — what tests and the
    /// bare development server use.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None, None)
    }

    /// State with explicit configuration and optional database pool and
    /// OAuth provider.
    pub fn with_config(
        config: AppConfig,
        db_pool: Option<PgPool>,
        oauth: Option<OAuthProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            db_pool,
            oauth: oauth.map(Arc::new),
            reset_sink: Arc::new(TracingResetSink),
            directory: Arc::new(RwLock::new(Directory::default())),
        }
    }

    /// Mint and store a session for `user`. Returns the session record;
    /// the token inside is the bearer credential.
    pub fn create_session(&self, user: UserId) -> SessionRecord {
        let now = Utc::now();
        let session = SessionRecord {
            token: kudos_auth::generate_token(),
            user_id: user,
            created_at: now,
            expires_at: now + Duration::seconds(self.config.session_ttl_secs),
            revoked: false,
        };
        let mut directory = self.directory.write();
        directory.purge_expired(now);
        directory.sessions.insert(session.token.clone(), session.clone());
        session
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kudos_core::{CardMessage, EmailAddress, PointAmount};

    pub(crate) fn seed_user(directory: &mut Directory, points: u32, active: bool) -> UserId {
        let id = UserId::new();
        directory.users.insert(
            id,
            UserRecord {
                id,
                email: EmailAddress::new(format!("{id}@example.com")).unwrap(),
                display_name: "user".to_string(),
                weekly_points: points,
                weekly_points_received: 0,
                total_points_received: 0,
                is_admin: false,
                is_active: active,
                password_hash: None,
                external_identity: None,
                created_at: Utc::now(),
                last_login_at: None,
            },
        );
        id
    }

    fn seed_card(directory: &mut Directory, sender: UserId, recipient: UserId) -> CardId {
        let card = CardRecord {
            id: CardId::new(),
            sender_id: sender,
            recipient: Recipient::User(recipient),
            additional_recipients: Vec::new(),
            message: CardMessage::new("thanks").unwrap(),
            points: PointAmount::ZERO,
            public: true,
            hidden: false,
            created_at: Utc::now(),
        };
        let id = card.id;
        directory.cards.insert(id, card);
        id
    }

    #[test]
    fn like_and_unlike_roundtrip_points() {
        let mut directory = Directory::default();
        let sender = seed_user(&mut directory, 140, true);
        let recipient = seed_user(&mut directory, 140, true);
        let liker = seed_user(&mut directory, 140, true);
        let card = seed_card(&mut directory, sender, recipient);

        let like = directory.apply_like(card, liker).unwrap();
        assert_eq!(directory.users[&liker].weekly_points, 138);
        assert_eq!(directory.users[&sender].total_points_received, 1);
        assert_eq!(directory.users[&recipient].total_points_received, 1);

        directory.apply_unlike(card, like.id, liker).unwrap();
        assert_eq!(directory.users[&liker].weekly_points, 140);
        assert_eq!(directory.users[&sender].total_points_received, 0);
        assert_eq!(directory.users[&recipient].total_points_received, 0);
        assert!(directory.likes.is_empty());
    }

    #[test]
    fn unlike_by_non_owner_is_forbidden() {
        let mut directory = Directory::default();
        let sender = seed_user(&mut directory, 140, true);
        let recipient = seed_user(&mut directory, 140, true);
        let liker = seed_user(&mut directory, 140, true);
        let other = seed_user(&mut directory, 140, true);
        let card = seed_card(&mut directory, sender, recipient);

        let like = directory.apply_like(card, liker).unwrap();
        let err = directory.apply_unlike(card, like.id, other).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        // Nothing reversed.
        assert_eq!(directory.users[&liker].weekly_points, 138);
    }

    #[test]
    fn spend_cap_counts_existing_likes() {
        let mut directory = Directory::default();
        let sender = seed_user(&mut directory, 140, true);
        let recipient = seed_user(&mut directory, 140, true);
        let liker = seed_user(&mut directory, 140, true);
        let card = seed_card(&mut directory, sender, recipient);

        for _ in 0..15 {
            directory.apply_like(card, liker).unwrap();
        }
        let err = directory.apply_like(card, liker).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(directory.users[&liker].weekly_points, 140 - 30);
    }

    #[test]
    fn weekly_reset_skips_inactive_users() {
        let mut directory = Directory::default();
        let active = seed_user(&mut directory, 3, true);
        let inactive = seed_user(&mut directory, 3, false);
        let (users, _) = directory.apply_weekly_reset(140);
        assert_eq!(users, 1);
        assert_eq!(directory.users[&active].weekly_points, 140);
        assert_eq!(directory.users[&inactive].weekly_points, 3);
    }

    #[test]
    fn self_notifications_are_skipped() {
        let mut directory = Directory::default();
        let user = seed_user(&mut directory, 140, true);
        let recipient = seed_user(&mut directory, 140, true);
        let card = seed_card(&mut directory, user, recipient);
        assert!(directory
            .push_notification(user, NotificationKind::CardLiked, card, user)
            .is_none());
        assert!(directory.notifications.is_empty());
    }

    #[test]
    fn purge_drops_expired_sessions() {
        let state = AppState::new();
        let user = seed_user(&mut state.directory.write(), 140, true);
        let session = state.create_session(user);
        {
            let mut directory = state.directory.write();
            directory.sessions.get_mut(&session.token).unwrap().expires_at =
                Utc::now() - Duration::seconds(1);
            directory.purge_expired(Utc::now());
            assert!(directory.sessions.is_empty());
        }
    }

    #[test]
    fn revoking_user_sessions_leaves_others() {
        let state = AppState::new();
        let (alice, bob) = {
            let mut directory = state.directory.write();
            (seed_user(&mut directory, 140, true), seed_user(&mut directory, 140, true))
        };
        state.create_session(alice);
        state.create_session(alice);
        let bob_session = state.create_session(bob);
        let revoked = state.directory.write().revoke_user_sessions(alice);
        assert_eq!(revoked.len(), 2);
        let directory = state.directory.read();
        assert!(directory.sessions[&bob_session.token].is_valid(Utc::now()));
    }
}
