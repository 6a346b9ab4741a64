//! # Ledger Errors
//!
//! Rejection reasons for point mutations. The API layer maps these to
//! HTTP responses; the messages are client-safe.

use thiserror::Error;

/// Why a point mutation was rejected. Nothing is mutated when one of
/// these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The spender's weekly budget cannot cover the debit.
    #[error("insufficient weekly points: need {required}, have {available}")]
    InsufficientBudget { required: u32, available: u32 },

    /// The liker has already spent the per-card cap on this card.
    #[error("like cap reached: {cap} points per card ({spent} already spent)")]
    LikeCapReached { cap: u32, spent: u32 },

    /// A sender cannot address a card to themselves.
    #[error("cannot send a card to yourself")]
    SelfCard,

    /// A card's sender cannot like their own card.
    #[error("cannot like your own card")]
    SelfLike,

    /// A card's recipient cannot like the card addressed to them.
    #[error("card recipients cannot like the card")]
    RecipientLike,

    /// The card has been hidden by an admin and rejects new interactions.
    #[error("card is hidden")]
    CardHidden,

    /// The account is deactivated and cannot take part in point
    /// transactions.
    #[error("account is deactivated")]
    InactiveUser,
}
