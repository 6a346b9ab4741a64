//! # kudos-ledger — Point Accounting
//!
//! Every point mutation in the kudos stack goes through this crate, so the
//! budget invariants hold in exactly one place:
//!
//! - **I1** — `weekly_points` never goes negative. Every debit validates
//!   the budget before anything is mutated.
//! - **I2** — cumulative like spend per (liker, card) never exceeds
//!   [`PER_CARD_LIKE_CAP`] points. Callers pass the liker's current spend
//!   on the card and the check-and-apply happens in one call.
//! - **I3** — a like moves exactly [`LIKE_COST`] points: liker −2, card
//!   sender +1, recipient +1. Deleting a like reverses the same amounts,
//!   saturating at zero because a weekly reset may have zeroed the weekly
//!   counters in between.
//! - **I4** — received-point counters are accumulators, disjoint from the
//!   spending budget.
//!
//! ## Atomicity contract
//!
//! Functions here mutate the records they are handed and either complete
//! fully or return an error having mutated nothing. They do not lock
//! anything themselves: the caller (the API state layer) holds its store
//! write lock across the whole read–decide–apply sequence, which is what
//! closes the historical race where two concurrent likes could slip past
//! the per-card cap.

pub mod error;
pub mod ops;
pub mod ranking;

pub use error::LedgerError;
pub use ops::{
    apply_like, grant_card, refund_like, reset_team_week, reset_user_week,
    validate_card_recipients, validate_like_eligibility, RecipientCounters,
};
pub use ranking::{rank_counterparts, CounterpartStanding, RANKING_LIMIT};

/// Cost of a single like, debited from the liker's weekly budget.
pub const LIKE_COST: u32 = 2;

/// Share of a like credited to the card's sender.
pub const LIKE_SENDER_SHARE: u32 = 1;

/// Share of a like credited to the card's recipient.
pub const LIKE_RECIPIENT_SHARE: u32 = 1;

/// Maximum cumulative like spend per (liker, card): 30 points, i.e. 15 likes.
pub const PER_CARD_LIKE_CAP: u32 = 30;

/// Default weekly spending budget restored by the reset.
pub const DEFAULT_WEEKLY_BUDGET: u32 = 140;
