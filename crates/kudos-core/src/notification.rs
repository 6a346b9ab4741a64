//! # Notification Records
//!
//! Server-side notification rows. Every interaction that should surface in
//! a recipient's feed creates one of these at mutation time; listing,
//! read-marking, and clearing are all server-side operations, so the state
//! a user sees is the same on every device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{CardId, NotificationId, UserId};

/// What happened. The variant names double as the wire `kind` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The user received a card (as primary or additional recipient, or
    /// as a member of the recipient team).
    CardReceived,
    /// A card the user sent was liked.
    CardLiked,
    /// A card the user sent was commented on.
    CardCommented,
    /// A card the user sent received an emoji reaction.
    CardReaction,
}

impl NotificationKind {
    /// Stable string form used in persistence and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::CardReceived => "card_received",
            NotificationKind::CardLiked => "card_liked",
            NotificationKind::CardCommented => "card_commented",
            NotificationKind::CardReaction => "card_reaction",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card_received" => Ok(NotificationKind::CardReceived),
            "card_liked" => Ok(NotificationKind::CardLiked),
            "card_commented" => Ok(NotificationKind::CardCommented),
            "card_reaction" => Ok(NotificationKind::CardReaction),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// A single notification row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    /// The user this notification is for.
    pub user_id: UserId,
    pub kind: NotificationKind,
    /// The card the interaction happened on.
    pub card_id: CardId,
    /// The user who triggered the interaction.
    pub actor_id: UserId,
    /// Set when the user marks the notification read; `None` means unread.
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Whether the notification has not been marked read.
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrips_through_str() {
        for kind in [
            NotificationKind::CardReceived,
            NotificationKind::CardLiked,
            NotificationKind::CardCommented,
            NotificationKind::CardReaction,
        ] {
            let parsed: NotificationKind = kind.as_str().parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn kind_serde_uses_snake_case() {
        let json = serde_json::to_string(&NotificationKind::CardLiked).unwrap();
        assert_eq!(json, "\"card_liked\"");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!("card_poked".parse::<NotificationKind>().is_err());
    }
}
