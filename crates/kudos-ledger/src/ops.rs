//! # Point Mutations
//!
//! The four mutations that move points: card grants, like debits, like
//! refunds, and the weekly reset. Each function validates everything
//! before touching a counter, so a returned error means nothing changed.

use kudos_core::{CardRecord, PointAmount, Recipient, TeamRecord, UserId, UserRecord};

use crate::error::LedgerError;
use crate::{LIKE_COST, LIKE_RECIPIENT_SHARE, LIKE_SENDER_SHARE, PER_CARD_LIKE_CAP};

/// The mutable counters of a card's primary recipient: an individual
/// user's received-point accumulators, or a team's.
pub enum RecipientCounters<'a> {
    User(&'a mut UserRecord),
    Team(&'a mut TeamRecord),
}

impl RecipientCounters<'_> {
    fn credit(&mut self, amount: u32) {
        match self {
            RecipientCounters::User(user) => {
                user.weekly_points_received += u64::from(amount);
                user.total_points_received += u64::from(amount);
            }
            RecipientCounters::Team(team) => {
                team.weekly_points_received += u64::from(amount);
                team.total_points_received += u64::from(amount);
            }
        }
    }

    fn debit_saturating(&mut self, amount: u32) {
        match self {
            RecipientCounters::User(user) => {
                user.weekly_points_received = user.weekly_points_received.saturating_sub(amount.into());
                user.total_points_received = user.total_points_received.saturating_sub(amount.into());
            }
            RecipientCounters::Team(team) => {
                team.weekly_points_received = team.weekly_points_received.saturating_sub(amount.into());
                team.total_points_received = team.total_points_received.saturating_sub(amount.into());
            }
        }
    }
}

/// Validate a card's recipient set against its sender.
///
/// # Errors
///
/// [`LedgerError::SelfCard`] when the sender addresses themselves, either
/// as the primary recipient or hidden in the additional recipient list.
pub fn validate_card_recipients(
    sender: UserId,
    recipient: &Recipient,
    additional: &[UserId],
) -> Result<(), LedgerError> {
    if recipient.as_user() == Some(sender) || additional.contains(&sender) {
        return Err(LedgerError::SelfCard);
    }
    Ok(())
}

/// Apply a card grant: debit the sender's weekly budget by the card's
/// point allocation and credit the primary recipient's accumulators.
///
/// A zero allocation passes through without touching any counter, so a
/// points-free thanks card never fails on budget.
///
/// # Errors
///
/// - [`LedgerError::InactiveUser`] when the sender (or a user recipient)
///   is deactivated.
/// - [`LedgerError::InsufficientBudget`] when the allocation exceeds the
///   sender's remaining weekly points.
pub fn grant_card(
    sender: &mut UserRecord,
    mut recipient: RecipientCounters<'_>,
    points: PointAmount,
) -> Result<(), LedgerError> {
    if !sender.is_active {
        return Err(LedgerError::InactiveUser);
    }
    if let RecipientCounters::User(user) = &recipient {
        if !user.is_active {
            return Err(LedgerError::InactiveUser);
        }
    }
    let amount = points.value();
    if amount > sender.weekly_points {
        return Err(LedgerError::InsufficientBudget {
            required: amount,
            available: sender.weekly_points,
        });
    }
    sender.weekly_points -= amount;
    if amount > 0 {
        recipient.credit(amount);
    }
    Ok(())
}

/// Check whether `liker` may like `card` at all.
///
/// `recipient_team_members` must be the member list of the recipient team
/// when the card is addressed to a team, and empty otherwise — the ledger
/// does not reach into membership stores.
///
/// # Errors
///
/// - [`LedgerError::CardHidden`] for admin-hidden cards.
/// - [`LedgerError::SelfLike`] when the liker sent the card.
/// - [`LedgerError::RecipientLike`] when the liker is the primary
///   recipient, an additional recipient, or a member of the recipient
///   team.
pub fn validate_like_eligibility(
    card: &CardRecord,
    liker: UserId,
    recipient_team_members: &[UserId],
) -> Result<(), LedgerError> {
    if card.hidden {
        return Err(LedgerError::CardHidden);
    }
    if card.sender_id == liker {
        return Err(LedgerError::SelfLike);
    }
    if card.recipient.as_user() == Some(liker)
        || card.additional_recipients.contains(&liker)
        || recipient_team_members.contains(&liker)
    {
        return Err(LedgerError::RecipientLike);
    }
    Ok(())
}

/// Apply a like: liker −[`LIKE_COST`], card sender +1, recipient +1.
///
/// `spent_on_card` is the liker's cumulative spend on this card before
/// this like (2 × existing like count). The cap check and the debit are
/// one operation under the caller's lock, which is what makes the
/// per-card cap race-free.
///
/// # Errors
///
/// - [`LedgerError::InactiveUser`] when the liker is deactivated.
/// - [`LedgerError::LikeCapReached`] when this like would push the
///   liker's spend on the card past [`PER_CARD_LIKE_CAP`].
/// - [`LedgerError::InsufficientBudget`] when the weekly budget cannot
///   cover the cost.
pub fn apply_like(
    liker: &mut UserRecord,
    card_sender: &mut UserRecord,
    mut recipient: RecipientCounters<'_>,
    spent_on_card: u32,
) -> Result<(), LedgerError> {
    if !liker.is_active {
        return Err(LedgerError::InactiveUser);
    }
    if spent_on_card + LIKE_COST > PER_CARD_LIKE_CAP {
        return Err(LedgerError::LikeCapReached {
            cap: PER_CARD_LIKE_CAP,
            spent: spent_on_card,
        });
    }
    if liker.weekly_points < LIKE_COST {
        return Err(LedgerError::InsufficientBudget {
            required: LIKE_COST,
            available: liker.weekly_points,
        });
    }

    liker.weekly_points -= LIKE_COST;
    card_sender.weekly_points_received += u64::from(LIKE_SENDER_SHARE);
    card_sender.total_points_received += u64::from(LIKE_SENDER_SHARE);
    recipient.credit(LIKE_RECIPIENT_SHARE);
    Ok(())
}

/// Reverse a like: liker +[`LIKE_COST`], card sender −1, recipient −1.
///
/// The reversal saturates at zero on the credit side — a weekly reset
/// between the like and its deletion may already have zeroed the weekly
/// accumulators. The refund itself is unconditional: deleting a like is
/// always allowed for its owner.
pub fn refund_like(
    liker: &mut UserRecord,
    card_sender: &mut UserRecord,
    mut recipient: RecipientCounters<'_>,
) {
    liker.weekly_points += LIKE_COST;
    card_sender.weekly_points_received = card_sender
        .weekly_points_received
        .saturating_sub(LIKE_SENDER_SHARE.into());
    card_sender.total_points_received = card_sender
        .total_points_received
        .saturating_sub(LIKE_SENDER_SHARE.into());
    recipient.debit_saturating(LIKE_RECIPIENT_SHARE);
}

/// Weekly reset for one user: restore the spending budget, zero the
/// weekly received accumulator. The all-time total is untouched.
pub fn reset_user_week(user: &mut UserRecord, budget: u32) {
    user.weekly_points = budget;
    user.weekly_points_received = 0;
}

/// Weekly reset for one team: zero the weekly received accumulator.
pub fn reset_team_week(team: &mut TeamRecord) {
    team.weekly_points_received = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kudos_core::{CardId, CardMessage, EmailAddress, TeamId};

    fn user(points: u32) -> UserRecord {
        UserRecord {
            id: UserId::new(),
            email: EmailAddress::new(format!("{}@example.com", UserId::new())).unwrap(),
            display_name: "user".to_string(),
            weekly_points: points,
            weekly_points_received: 0,
            total_points_received: 0,
            is_admin: false,
            is_active: true,
            password_hash: None,
            external_identity: None,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    fn team() -> TeamRecord {
        TeamRecord {
            id: TeamId::new(),
            name: "Platform".to_string(),
            description: None,
            weekly_points_received: 0,
            total_points_received: 0,
            created_at: Utc::now(),
        }
    }

    fn card(sender: UserId, recipient: Recipient) -> CardRecord {
        CardRecord {
            id: CardId::new(),
            sender_id: sender,
            recipient,
            additional_recipients: Vec::new(),
            message: CardMessage::new("thanks!").unwrap(),
            points: PointAmount::ZERO,
            public: true,
            hidden: false,
            created_at: Utc::now(),
        }
    }

    // -- grant_card ----------------------------------------------------------

    #[test]
    fn grant_debits_sender_and_credits_recipient() {
        let mut sender = user(140);
        let mut recipient = user(140);
        grant_card(
            &mut sender,
            RecipientCounters::User(&mut recipient),
            PointAmount::new(40).unwrap(),
        )
        .unwrap();
        assert_eq!(sender.weekly_points, 100);
        assert_eq!(recipient.weekly_points_received, 40);
        assert_eq!(recipient.total_points_received, 40);
        // Budget of the recipient is untouched (I4).
        assert_eq!(recipient.weekly_points, 140);
    }

    #[test]
    fn grant_rejects_over_budget_without_mutation() {
        let mut sender = user(30);
        let mut recipient = user(140);
        let err = grant_card(
            &mut sender,
            RecipientCounters::User(&mut recipient),
            PointAmount::new(31).unwrap(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBudget {
                required: 31,
                available: 30
            }
        );
        assert_eq!(sender.weekly_points, 30);
        assert_eq!(recipient.total_points_received, 0);
    }

    #[test]
    fn grant_allows_exact_budget() {
        let mut sender = user(25);
        let mut recipient = user(140);
        grant_card(
            &mut sender,
            RecipientCounters::User(&mut recipient),
            PointAmount::new(25).unwrap(),
        )
        .unwrap();
        assert_eq!(sender.weekly_points, 0);
    }

    #[test]
    fn grant_zero_points_always_passes() {
        let mut sender = user(0);
        let mut recipient = user(140);
        grant_card(
            &mut sender,
            RecipientCounters::User(&mut recipient),
            PointAmount::ZERO,
        )
        .unwrap();
        assert_eq!(sender.weekly_points, 0);
        assert_eq!(recipient.total_points_received, 0);
    }

    #[test]
    fn grant_to_team_credits_team_counters() {
        let mut sender = user(140);
        let mut target = team();
        grant_card(
            &mut sender,
            RecipientCounters::Team(&mut target),
            PointAmount::new(50).unwrap(),
        )
        .unwrap();
        assert_eq!(sender.weekly_points, 90);
        assert_eq!(target.weekly_points_received, 50);
        assert_eq!(target.total_points_received, 50);
    }

    #[test]
    fn grant_rejects_inactive_sender() {
        let mut sender = user(140);
        sender.is_active = false;
        let mut recipient = user(140);
        assert_eq!(
            grant_card(
                &mut sender,
                RecipientCounters::User(&mut recipient),
                PointAmount::ZERO,
            ),
            Err(LedgerError::InactiveUser)
        );
    }

    #[test]
    fn self_card_rejected() {
        let sender = UserId::new();
        assert_eq!(
            validate_card_recipients(sender, &Recipient::User(sender), &[]),
            Err(LedgerError::SelfCard)
        );
        assert_eq!(
            validate_card_recipients(sender, &Recipient::User(UserId::new()), &[sender]),
            Err(LedgerError::SelfCard)
        );
        assert!(validate_card_recipients(sender, &Recipient::Team(TeamId::new()), &[]).is_ok());
    }

    // -- apply_like ----------------------------------------------------------

    #[test]
    fn like_moves_exactly_two_points() {
        let mut liker = user(10);
        let mut sender = user(140);
        let mut recipient = user(140);
        apply_like(
            &mut liker,
            &mut sender,
            RecipientCounters::User(&mut recipient),
            0,
        )
        .unwrap();
        assert_eq!(liker.weekly_points, 8);
        assert_eq!(sender.weekly_points_received, 1);
        assert_eq!(sender.total_points_received, 1);
        assert_eq!(recipient.weekly_points_received, 1);
        assert_eq!(recipient.total_points_received, 1);
    }

    #[test]
    fn like_rejects_at_cap() {
        let mut liker = user(140);
        let mut sender = user(140);
        let mut recipient = user(140);
        // 15 likes = 30 points spent; the 16th must be rejected.
        let err = apply_like(
            &mut liker,
            &mut sender,
            RecipientCounters::User(&mut recipient),
            PER_CARD_LIKE_CAP,
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::LikeCapReached {
                cap: PER_CARD_LIKE_CAP,
                spent: PER_CARD_LIKE_CAP
            }
        );
        assert_eq!(liker.weekly_points, 140);
    }

    #[test]
    fn like_allows_up_to_cap() {
        // 28 points spent: one more like lands exactly on the cap.
        let mut liker = user(140);
        let mut sender = user(140);
        let mut recipient = user(140);
        apply_like(
            &mut liker,
            &mut sender,
            RecipientCounters::User(&mut recipient),
            PER_CARD_LIKE_CAP - LIKE_COST,
        )
        .unwrap();
        assert_eq!(liker.weekly_points, 138);
    }

    #[test]
    fn like_rejects_insufficient_budget() {
        let mut liker = user(1);
        let mut sender = user(140);
        let mut recipient = user(140);
        let err = apply_like(
            &mut liker,
            &mut sender,
            RecipientCounters::User(&mut recipient),
            0,
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBudget {
                required: 2,
                available: 1
            }
        );
        assert_eq!(liker.weekly_points, 1);
        assert_eq!(sender.total_points_received, 0);
    }

    #[test]
    fn like_on_team_card_credits_team() {
        let mut liker = user(10);
        let mut sender = user(140);
        let mut target = team();
        apply_like(
            &mut liker,
            &mut sender,
            RecipientCounters::Team(&mut target),
            0,
        )
        .unwrap();
        assert_eq!(target.weekly_points_received, 1);
        assert_eq!(target.total_points_received, 1);
    }

    // -- eligibility ---------------------------------------------------------

    #[test]
    fn sender_cannot_like_own_card() {
        let sender = UserId::new();
        let c = card(sender, Recipient::User(UserId::new()));
        assert_eq!(
            validate_like_eligibility(&c, sender, &[]),
            Err(LedgerError::SelfLike)
        );
    }

    #[test]
    fn recipient_cannot_like_card() {
        let recipient = UserId::new();
        let c = card(UserId::new(), Recipient::User(recipient));
        assert_eq!(
            validate_like_eligibility(&c, recipient, &[]),
            Err(LedgerError::RecipientLike)
        );
    }

    #[test]
    fn additional_recipient_cannot_like_card() {
        let extra = UserId::new();
        let mut c = card(UserId::new(), Recipient::User(UserId::new()));
        c.additional_recipients.push(extra);
        assert_eq!(
            validate_like_eligibility(&c, extra, &[]),
            Err(LedgerError::RecipientLike)
        );
    }

    #[test]
    fn team_member_cannot_like_team_card() {
        let member = UserId::new();
        let c = card(UserId::new(), Recipient::Team(TeamId::new()));
        assert_eq!(
            validate_like_eligibility(&c, member, &[member]),
            Err(LedgerError::RecipientLike)
        );
    }

    #[test]
    fn hidden_card_rejects_likes() {
        let mut c = card(UserId::new(), Recipient::User(UserId::new()));
        c.hidden = true;
        assert_eq!(
            validate_like_eligibility(&c, UserId::new(), &[]),
            Err(LedgerError::CardHidden)
        );
    }

    #[test]
    fn third_party_may_like() {
        let c = card(UserId::new(), Recipient::User(UserId::new()));
        assert!(validate_like_eligibility(&c, UserId::new(), &[]).is_ok());
    }

    // -- refund_like ---------------------------------------------------------

    #[test]
    fn refund_reverses_like_exactly() {
        let mut liker = user(10);
        let mut sender = user(140);
        let mut recipient = user(140);
        apply_like(
            &mut liker,
            &mut sender,
            RecipientCounters::User(&mut recipient),
            0,
        )
        .unwrap();
        refund_like(
            &mut liker,
            &mut sender,
            RecipientCounters::User(&mut recipient),
        );
        assert_eq!(liker.weekly_points, 10);
        assert_eq!(sender.weekly_points_received, 0);
        assert_eq!(sender.total_points_received, 0);
        assert_eq!(recipient.weekly_points_received, 0);
        assert_eq!(recipient.total_points_received, 0);
    }

    #[test]
    fn refund_saturates_after_weekly_reset() {
        let mut liker = user(10);
        let mut sender = user(140);
        let mut recipient = user(140);
        apply_like(
            &mut liker,
            &mut sender,
            RecipientCounters::User(&mut recipient),
            0,
        )
        .unwrap();
        // The reset zeroes the weekly accumulators before the unlike.
        reset_user_week(&mut sender, 140);
        reset_user_week(&mut recipient, 140);
        refund_like(
            &mut liker,
            &mut sender,
            RecipientCounters::User(&mut recipient),
        );
        assert_eq!(sender.weekly_points_received, 0);
        assert_eq!(recipient.weekly_points_received, 0);
        // Totals still reverse.
        assert_eq!(sender.total_points_received, 0);
        assert_eq!(recipient.total_points_received, 0);
    }

    // -- weekly reset --------------------------------------------------------

    #[test]
    fn reset_restores_budget_and_zeroes_weekly_counters() {
        let mut u = user(3);
        u.weekly_points_received = 17;
        u.total_points_received = 99;
        reset_user_week(&mut u, 140);
        assert_eq!(u.weekly_points, 140);
        assert_eq!(u.weekly_points_received, 0);
        assert_eq!(u.total_points_received, 99);

        let mut t = team();
        t.weekly_points_received = 12;
        t.total_points_received = 44;
        reset_team_week(&mut t);
        assert_eq!(t.weekly_points_received, 0);
        assert_eq!(t.total_points_received, 44);
    }
}
