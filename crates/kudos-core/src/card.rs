//! # Card Domain Types
//!
//! The thanks card and its attached interactions: likes, emoji reactions,
//! and comments. Value types here enforce the content rules from the
//! product model at construction time:
//!
//! - [`CardMessage`] — 1–140 characters after trimming. The limit counts
//!   Unicode scalar values, not bytes, so Japanese text gets the same 140
//!   characters as ASCII.
//! - [`PointAmount`] — the sender-chosen allocation, 0–140.
//! - [`EmojiTag`] — a short emoji reaction, at most one per (user, card).
//! - [`CommentBody`] — 1–500 characters after trimming.
//!
//! Records ([`CardRecord`], [`LikeRecord`], [`ReactionRecord`],
//! [`CommentRecord`]) are plain data; all point arithmetic lives in
//! `kudos-ledger`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{CardId, CommentId, LikeId, ReactionId, TeamId, UserId};

/// Maximum card message length in characters.
pub const MAX_MESSAGE_CHARS: usize = 140;

/// Maximum point allocation a sender may attach to a card.
pub const MAX_CARD_POINTS: u32 = 140;

/// Maximum comment length in characters.
pub const MAX_COMMENT_CHARS: usize = 500;

/// Maximum emoji reaction tag length in characters. Generous enough for
/// multi-scalar emoji (ZWJ sequences, skin-tone modifiers).
pub const MAX_EMOJI_CHARS: usize = 16;

/// Helper macro to implement `Deserialize` for value newtypes that must
/// validate their contents. Deserializes the raw representation, then
/// routes through the type's `new()` constructor so that invalid values
/// are rejected at deserialization time — not silently accepted.
macro_rules! impl_validating_deserialize {
    ($ty:ident, $raw:ty) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = <$raw>::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// CardMessage
// ---------------------------------------------------------------------------

/// The text of a thanks card, trimmed, 1–140 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CardMessage(String);

impl_validating_deserialize!(CardMessage, String);

impl CardMessage {
    /// Create a card message, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyMessage`] when nothing remains after
    /// trimming, [`ValidationError::MessageTooLong`] past 140 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let trimmed = value.into().trim().to_string();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        let chars = trimmed.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(ValidationError::MessageTooLong {
                max: MAX_MESSAGE_CHARS,
                got: chars,
            });
        }
        Ok(Self(trimmed))
    }

    /// Access the message text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CardMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PointAmount
// ---------------------------------------------------------------------------

/// A sender-chosen point allocation, 0–140 inclusive.
///
/// Zero is a valid allocation — a card does not have to carry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PointAmount(u32);

impl_validating_deserialize!(PointAmount, u32);

impl PointAmount {
    /// The zero allocation.
    pub const ZERO: PointAmount = PointAmount(0);

    /// Create a point allocation, validating the 0–140 range.
    ///
    /// # Errors
    ///
    /// [`ValidationError::PointsOutOfRange`] above [`MAX_CARD_POINTS`].
    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if value > MAX_CARD_POINTS {
            return Err(ValidationError::PointsOutOfRange {
                max: MAX_CARD_POINTS,
                got: value,
            });
        }
        Ok(Self(value))
    }

    /// Access the raw point value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Whether this allocation carries no points.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for PointAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EmojiTag
// ---------------------------------------------------------------------------

/// An emoji reaction tag.
///
/// The service does not maintain an emoji allow-list; any short non-empty,
/// whitespace-free string is accepted, which also covers `:shortcode:`
/// style clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EmojiTag(String);

impl_validating_deserialize!(EmojiTag, String);

impl EmojiTag {
    /// Create a reaction tag.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidEmoji`] when empty, containing
    /// whitespace, or longer than [`MAX_EMOJI_CHARS`] characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidEmoji("empty".to_string()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidEmoji(trimmed.to_string()));
        }
        if trimmed.chars().count() > MAX_EMOJI_CHARS {
            return Err(ValidationError::InvalidEmoji("over-long".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Access the tag text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// CommentBody
// ---------------------------------------------------------------------------

/// A comment on a card, trimmed, 1–500 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CommentBody(String);

impl_validating_deserialize!(CommentBody, String);

impl CommentBody {
    /// Create a comment body, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyComment`] when nothing remains after
    /// trimming, [`ValidationError::CommentTooLong`] past 500 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let trimmed = value.into().trim().to_string();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyComment);
        }
        let chars = trimmed.chars().count();
        if chars > MAX_COMMENT_CHARS {
            return Err(ValidationError::CommentTooLong {
                max: MAX_COMMENT_CHARS,
                got: chars,
            });
        }
        Ok(Self(trimmed))
    }

    /// Access the comment text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// The primary recipient of a card: a single user or a whole team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    /// A user recipient; the point allocation credits their counters.
    User(UserId),
    /// A team recipient; the point allocation credits the team counter.
    Team(TeamId),
}

impl Recipient {
    /// The user ID when the recipient is a user.
    pub fn as_user(&self) -> Option<UserId> {
        match self {
            Recipient::User(id) => Some(*id),
            Recipient::Team(_) => None,
        }
    }

    /// The team ID when the recipient is a team.
    pub fn as_team(&self) -> Option<TeamId> {
        match self {
            Recipient::User(_) => None,
            Recipient::Team(id) => Some(*id),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A thanks card. Immutable after creation except the `hidden` flag,
/// which only admins may toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: CardId,
    pub sender_id: UserId,
    pub recipient: Recipient,
    /// Secondary recipients. They see the card and are notified, but the
    /// point allocation credits only the primary recipient.
    pub additional_recipients: Vec<UserId>,
    pub message: CardMessage,
    pub points: PointAmount,
    /// Visible on the shared timeline when true; otherwise only sender
    /// and recipients see it.
    pub public: bool,
    /// Admin-set moderation flag. Hidden cards drop off all timelines and
    /// reject new interactions.
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
}

impl CardRecord {
    /// Whether `user` sent this card or is one of its recipients.
    ///
    /// Team membership is resolved by the caller — records do not reach
    /// into other stores.
    pub fn involves_user(&self, user: UserId) -> bool {
        self.sender_id == user
            || self.recipient.as_user() == Some(user)
            || self.additional_recipients.contains(&user)
    }
}

/// A single like on a card. Each like costs the liker 2 points; a user
/// may hold many likes on one card up to the per-card spend cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeRecord {
    pub id: LikeId,
    pub card_id: CardId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// An emoji reaction. At most one per (user, card); re-reacting replaces
/// the emoji in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub id: ReactionId,
    pub card_id: CardId,
    pub user_id: UserId,
    pub emoji: EmojiTag,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A free-text comment, editable and deletable by its author only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub card_id: CardId,
    pub author_id: UserId,
    pub body: CommentBody,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
