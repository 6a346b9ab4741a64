//! # Counterpart Ranking
//!
//! The dashboard's "who do you exchange thanks with" aggregation: a linear
//! scan over the cards a user sent or received, tallying interactions per
//! counterpart, sorted descending and truncated to the top 30. No
//! pagination, no caching — the scan is O(cards + likes) and the card
//! volume per user is small.

use std::collections::HashMap;

use kudos_core::{CardRecord, LikeRecord, UserId};
use serde::{Deserialize, Serialize};

/// Ranking output is truncated to this many counterparts.
pub const RANKING_LIMIT: usize = 30;

/// Aggregated interaction tally between the subject user and one
/// counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartStanding {
    pub user_id: UserId,
    /// Cards the subject sent to this counterpart.
    pub cards_sent: u64,
    /// Cards the subject received from this counterpart.
    pub cards_received: u64,
    /// Likes on cards between the pair (either direction).
    pub likes: u64,
    /// Card points moving between the pair (either direction).
    pub points_exchanged: u64,
}

impl CounterpartStanding {
    fn interactions(&self) -> u64 {
        self.cards_sent + self.cards_received + self.likes
    }
}

/// Rank the subject's counterparts by interaction count.
///
/// `cards` is any card set; cards not involving `subject` as sender or
/// individual recipient are skipped, as are hidden cards and team-addressed
/// cards (a team is not a counterpart). `likes` contributes the like tally
/// for whichever of the passed cards they land on.
///
/// Sorting is by interaction count descending, points exchanged as the
/// tiebreak, then user id for a stable order. The result is truncated to
/// [`RANKING_LIMIT`].
pub fn rank_counterparts(
    subject: UserId,
    cards: &[CardRecord],
    likes: &[LikeRecord],
) -> Vec<CounterpartStanding> {
    // Likes per card, computed once up front.
    let mut likes_per_card: HashMap<kudos_core::CardId, u64> = HashMap::new();
    for like in likes {
        *likes_per_card.entry(like.card_id).or_default() += 1;
    }

    let mut tallies: HashMap<UserId, CounterpartStanding> = HashMap::new();
    for card in cards {
        if card.hidden {
            continue;
        }
        // Resolve the counterpart for this card, if any.
        let counterpart = if card.sender_id == subject {
            match card.recipient.as_user() {
                Some(recipient) => recipient,
                None => continue,
            }
        } else if card.recipient.as_user() == Some(subject)
            || card.additional_recipients.contains(&subject)
        {
            card.sender_id
        } else {
            continue;
        };

        let entry = tallies
            .entry(counterpart)
            .or_insert_with(|| CounterpartStanding {
                user_id: counterpart,
                cards_sent: 0,
                cards_received: 0,
                likes: 0,
                points_exchanged: 0,
            });
        if card.sender_id == subject {
            entry.cards_sent += 1;
        } else {
            entry.cards_received += 1;
        }
        entry.likes += likes_per_card.get(&card.id).copied().unwrap_or(0);
        entry.points_exchanged += u64::from(card.points.value());
    }

    let mut standings: Vec<CounterpartStanding> = tallies.into_values().collect();
    standings.sort_by(|a, b| {
        b.interactions()
            .cmp(&a.interactions())
            .then(b.points_exchanged.cmp(&a.points_exchanged))
            .then(a.user_id.cmp(&b.user_id))
    });
    standings.truncate(RANKING_LIMIT);
    standings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kudos_core::{CardId, CardMessage, LikeId, PointAmount, Recipient, TeamId};

    fn card(sender: UserId, recipient: Recipient, points: u32) -> CardRecord {
        CardRecord {
            id: CardId::new(),
            sender_id: sender,
            recipient,
            additional_recipients: Vec::new(),
            message: CardMessage::new("thanks").unwrap(),
            points: PointAmount::new(points).unwrap(),
            public: true,
            hidden: false,
            created_at: Utc::now(),
        }
    }

    fn like(card_id: CardId) -> LikeRecord {
        LikeRecord {
            id: LikeId::new(),
            card_id,
            user_id: UserId::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn tallies_both_directions() {
        let me = UserId::new();
        let them = UserId::new();
        let sent = card(me, Recipient::User(them), 10);
        let received = card(them, Recipient::User(me), 5);
        let standings = rank_counterparts(me, &[sent, received], &[]);
        assert_eq!(standings.len(), 1);
        let s = &standings[0];
        assert_eq!(s.user_id, them);
        assert_eq!(s.cards_sent, 1);
        assert_eq!(s.cards_received, 1);
        assert_eq!(s.points_exchanged, 15);
    }

    #[test]
    fn likes_count_toward_interactions() {
        let me = UserId::new();
        let quiet = UserId::new();
        let loud = UserId::new();
        let to_quiet = card(me, Recipient::User(quiet), 0);
        let to_loud = card(me, Recipient::User(loud), 0);
        let likes: Vec<LikeRecord> = (0..3).map(|_| like(to_loud.id)).collect();
        let standings = rank_counterparts(me, &[to_quiet, to_loud], &likes);
        assert_eq!(standings[0].user_id, loud);
        assert_eq!(standings[0].likes, 3);
        assert_eq!(standings[1].user_id, quiet);
    }

    #[test]
    fn skips_hidden_team_and_unrelated_cards() {
        let me = UserId::new();
        let them = UserId::new();
        let mut hidden = card(me, Recipient::User(them), 10);
        hidden.hidden = true;
        let team_card = card(me, Recipient::Team(TeamId::new()), 10);
        let unrelated = card(UserId::new(), Recipient::User(UserId::new()), 10);
        let standings = rank_counterparts(me, &[hidden, team_card, unrelated], &[]);
        assert!(standings.is_empty());
    }

    #[test]
    fn additional_recipient_counts_as_received() {
        let me = UserId::new();
        let them = UserId::new();
        let mut c = card(them, Recipient::User(UserId::new()), 7);
        c.additional_recipients.push(me);
        let standings = rank_counterparts(me, &[c], &[]);
        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].cards_received, 1);
        assert_eq!(standings[0].points_exchanged, 7);
    }

    #[test]
    fn truncates_to_limit() {
        let me = UserId::new();
        let cards: Vec<CardRecord> = (0..40)
            .map(|_| card(me, Recipient::User(UserId::new()), 1))
            .collect();
        let standings = rank_counterparts(me, &cards, &[]);
        assert_eq!(standings.len(), RANKING_LIMIT);
    }

    #[test]
    fn sort_is_stable_for_equal_tallies() {
        let me = UserId::new();
        let a = UserId::new();
        let b = UserId::new();
        let cards = vec![
            card(me, Recipient::User(a), 1),
            card(me, Recipient::User(b), 1),
        ];
        let first = rank_counterparts(me, &cards, &[]);
        let second = rank_counterparts(me, &cards, &[]);
        assert_eq!(first, second);
    }
}
