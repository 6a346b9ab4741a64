//! Property tests for the ledger arithmetic.
//!
//! Drives random operation sequences against a tiny population and checks
//! the invariants that matter: the weekly budget can never underflow (a
//! rejected operation mutates nothing), and every accepted like moves
//! exactly two points through the system until refunded.

use chrono::Utc;
use kudos_core::{EmailAddress, PointAmount, UserId, UserRecord};
use kudos_ledger::{
    apply_like, grant_card, refund_like, LedgerError, RecipientCounters, DEFAULT_WEEKLY_BUDGET,
    LIKE_COST, PER_CARD_LIKE_CAP,
};
use proptest::prelude::*;

fn user(points: u32) -> UserRecord {
    UserRecord {
        id: UserId::new(),
        email: EmailAddress::new(format!("{}@example.com", UserId::new())).unwrap(),
        display_name: "u".to_string(),
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

#[derive(Debug, Clone)]
enum Op {
    Grant(u32),
    Like,
    Unlike,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..=140).prop_map(Op::Grant),
        Just(Op::Like),
        Just(Op::Unlike),
    ]
}

proptest! {
    /// Random op sequences: budgets never underflow, the per-card spend
    /// never exceeds the cap, and accepted likes are conserved 2-in/2-out.
    #[test]
    fn random_sequences_preserve_invariants(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut liker = user(DEFAULT_WEEKLY_BUDGET);
        let mut sender = user(DEFAULT_WEEKLY_BUDGET);
        let mut recipient = user(DEFAULT_WEEKLY_BUDGET);

        let mut outstanding_likes: u32 = 0;
        let mut granted_points: u64 = 0;

        for op in ops {
            match op {
                Op::Grant(points) => {
                    let amount = PointAmount::new(points).unwrap();
                    let before = sender.weekly_points;
                    match grant_card(&mut sender, RecipientCounters::User(&mut recipient), amount) {
                        Ok(()) => {
                            prop_assert_eq!(sender.weekly_points, before - points);
                            granted_points += u64::from(points);
                        }
                        Err(LedgerError::InsufficientBudget { .. }) => {
                            prop_assert_eq!(sender.weekly_points, before);
                            prop_assert!(points > before);
                        }
                        Err(other) => prop_assert!(false, "unexpected error: {other}"),
                    }
                }
                Op::Like => {
                    let spent = outstanding_likes * LIKE_COST;
                    let before = liker.weekly_points;
                    match apply_like(
                        &mut liker,
                        &mut sender,
                        RecipientCounters::User(&mut recipient),
                        spent,
                    ) {
                        Ok(()) => {
                            outstanding_likes += 1;
                            prop_assert_eq!(liker.weekly_points, before - LIKE_COST);
                        }
                        Err(LedgerError::LikeCapReached { .. }) => {
                            prop_assert!(spent + LIKE_COST > PER_CARD_LIKE_CAP);
                        }
                        Err(LedgerError::InsufficientBudget { .. }) => {
                            prop_assert!(before < LIKE_COST);
                        }
                        Err(other) => prop_assert!(false, "unexpected error: {other}"),
                    }
                }
                Op::Unlike => {
                    if outstanding_likes > 0 {
                        refund_like(
                            &mut liker,
                            &mut sender,
                            RecipientCounters::User(&mut recipient),
                        );
                        outstanding_likes -= 1;
                    }
                }
            }

            // Per-card spend cap (I2).
            prop_assert!(outstanding_likes * LIKE_COST <= PER_CARD_LIKE_CAP);
            // Conservation (I3): every outstanding like holds one point on
            // each side; grants accumulate on the recipient only.
            prop_assert_eq!(sender.total_points_received, u64::from(outstanding_likes));
            prop_assert_eq!(
                recipient.total_points_received,
                granted_points + u64::from(outstanding_likes)
            );
        }
    }

    /// A refund after reset never underflows the accumulators.
    #[test]
    fn refund_never_underflows(resets in 0usize..3) {
        let mut liker = user(DEFAULT_WEEKLY_BUDGET);
        let mut sender = user(DEFAULT_WEEKLY_BUDGET);
        let mut recipient = user(DEFAULT_WEEKLY_BUDGET);

        apply_like(&mut liker, &mut sender, RecipientCounters::User(&mut recipient), 0).unwrap();
        for _ in 0..resets {
            kudos_ledger::reset_user_week(&mut sender, DEFAULT_WEEKLY_BUDGET);
            kudos_ledger::reset_user_week(&mut recipient, DEFAULT_WEEKLY_BUDGET);
        }
        refund_like(&mut liker, &mut sender, RecipientCounters::User(&mut recipient));
        refund_like(&mut liker, &mut sender, RecipientCounters::User(&mut recipient));
        prop_assert_eq!(sender.weekly_points_received, 0);
        prop_assert_eq!(recipient.weekly_points_received, 0);
    }
}
