//! # Validation Errors
//!
//! Structured error hierarchy for domain value construction. Every
//! validated newtype in this crate returns [`ValidationError`] from its
//! constructor, and the validating `Deserialize` impls route through the
//! same constructors, so the error text a client sees is identical whether
//! a value was rejected in a handler or during JSON decoding.

use thiserror::Error;

/// Errors raised when constructing domain values from untrusted input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Email address is empty or structurally invalid.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// Card message is empty after trimming.
    #[error("card message must not be empty")]
    EmptyMessage,

    /// Card message exceeds the character limit.
    #[error("card message must not exceed {max} characters (got {got})")]
    MessageTooLong { max: usize, got: usize },

    /// Point allocation outside the permitted range.
    #[error("point allocation must be between 0 and {max} (got {got})")]
    PointsOutOfRange { max: u32, got: u32 },

    /// Emoji reaction tag is empty or over-long.
    #[error("invalid reaction emoji: {0}")]
    InvalidEmoji(String),

    /// Comment body is empty after trimming.
    #[error("comment must not be empty")]
    EmptyComment,

    /// Comment body exceeds the character limit.
    #[error("comment must not exceed {max} characters (got {got})")]
    CommentTooLong { max: usize, got: usize },

    /// Display name is empty or over-long.
    #[error("invalid display name: {0}")]
    InvalidDisplayName(String),

    /// Team or department name is empty or over-long.
    #[error("invalid group name: {0}")]
    InvalidGroupName(String),
}
