//! # kudos-core — Foundational Domain Types
//!
//! Domain-primitive newtypes and record structs shared by every crate in
//! the kudos stack. Identifier newtypes make it a compile error to pass a
//! [`CardId`] where a [`UserId`] is expected; validated value types
//! ([`EmailAddress`], [`CardMessage`], [`PointAmount`], [`EmojiTag`],
//! [`CommentBody`]) reject invalid content at construction time and at
//! deserialization time, so a handler can never observe an over-long card
//! message or an out-of-range point allocation.
//!
//! ## Layout
//!
//! - [`identity`] — UUID-backed identifier newtypes and [`EmailAddress`].
//! - [`user`] — [`UserRecord`] and external identity linkage.
//! - [`card`] — [`CardRecord`], [`LikeRecord`], [`ReactionRecord`],
//!   [`CommentRecord`] and their validated value types.
//! - [`org`] — teams, departments, and membership rows.
//! - [`notification`] — server-side notification records.
//! - [`error`] — [`ValidationError`], the structured validation hierarchy.

pub mod card;
pub mod error;
pub mod identity;
pub mod notification;
pub mod org;
pub mod user;

pub use card::{
    CardMessage, CardRecord, CommentBody, CommentRecord, EmojiTag, LikeRecord, PointAmount,
    Recipient, ReactionRecord, MAX_CARD_POINTS, MAX_COMMENT_CHARS, MAX_MESSAGE_CHARS,
};
pub use error::ValidationError;
pub use identity::{
    CardId, CommentId, DepartmentId, EmailAddress, LikeId, NotificationId, ReactionId, TeamId,
    UserId,
};
pub use notification::{NotificationKind, NotificationRecord};
pub use org::{
    validate_group_name, DepartmentRecord, TeamMemberRecord, TeamRecord, UserDepartmentRecord,
};
pub use user::{validate_display_name, ExternalIdentity, UserRecord};
