//! Hand evaluation.
//!
//! A hand is ranked into one of five categories (strongest last):
//!
//! ```text
//! HighCard(1) < Flush(2) < Straight(3) < StraightFlush(4) < ThreeOfAKind(5)
//! ```
//!
//! There is no pair category: a pair is a HighCard hand. `{A, 2, 3}` is a
//! straight with top rank 3; `{Q, K, A}` is a straight with top rank 14;
//! `{K, A, 2}` is not a straight.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Card, HAND_SIZE};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Hand-strength tier. The discriminant is the category number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum HandCategory {
    HighCard = 1,
    Flush = 2,
    Straight = 3,
    StraightFlush = 4,
    ThreeOfAKind = 5,
}

impl HandCategory {
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Name used in `HAND_RANKS` and `WINNER` events.
    pub fn name(self) -> &'static str {
        match self {
            HandCategory::HighCard => "HighCard",
            HandCategory::Flush => "Flush",
            HandCategory::Straight => "Straight",
            HandCategory::StraightFlush => "StraightFlush",
            HandCategory::ThreeOfAKind => "ThreeKind",
        }
    }
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// HandRank
// ---------------------------------------------------------------------------

/// Category plus tie-break key.
///
/// The derived `Ord` is the generic hand order: category, then `primary`,
/// then `tiebreakers` lexicographically (a shorter prefix sorts lower).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HandRank {
    pub category: HandCategory,
    /// The decisive rank value (2..=14; 0 for an empty hand).
    pub primary: u8,
    /// Remaining rank values, highest first.
    pub tiebreakers: Vec<u8>,
}

impl HandRank {
    /// Packs the rank into one integer that orders like `HandRank`.
    pub fn composite_score(&self) -> i64 {
        let packed = self
            .tiebreakers
            .iter()
            .fold(0i64, |acc, v| acc * 100 + i64::from(*v));
        i64::from(self.category.value()) * 1_000_000 + i64::from(self.primary) * 10_000 + packed
    }
}

/// Ranks a hand.
///
/// Only a full hand of three cards can reach a category above HighCard.
/// Shorter hands rank as HighCard on whatever cards they hold.
pub fn evaluate(cards: &[Card]) -> HandRank {
    let mut values: Vec<u8> = cards.iter().map(|c| c.rank.value()).collect();
    values.sort_unstable_by(|a, b| b.cmp(a));

    if cards.len() == HAND_SIZE {
        if values.iter().all(|v| *v == values[0]) {
            return HandRank {
                category: HandCategory::ThreeOfAKind,
                primary: values[0],
                tiebreakers: Vec::new(),
            };
        }

        let same_suit = cards.iter().all(|c| c.suit == cards[0].suit);
        if let Some(top) = straight_top(&values) {
            let category = if same_suit {
                HandCategory::StraightFlush
            } else {
                HandCategory::Straight
            };
            return HandRank {
                category,
                primary: top,
                tiebreakers: Vec::new(),
            };
        }

        if same_suit {
            return HandRank {
                category: HandCategory::Flush,
                primary: values[0],
                tiebreakers: values[1..].to_vec(),
            };
        }
    }

    match values.split_first() {
        Some((high, rest)) => HandRank {
            category: HandCategory::HighCard,
            primary: *high,
            tiebreakers: rest.to_vec(),
        },
        None => HandRank {
            category: HandCategory::HighCard,
            primary: 0,
            tiebreakers: Vec::new(),
        },
    }
}

/// `values` is sorted descending and holds exactly three entries.
fn straight_top(values: &[u8]) -> Option<u8> {
    let (high, mid, low) = (values[0], values[1], values[2]);
    if high == mid + 1 && mid == low + 1 {
        return Some(high);
    }
    // A-2-3: the ace plays low.
    if high == 14 && mid == 3 && low == 2 {
        return Some(3);
    }
    None
}

/// Sum of pip values modulo 10 (Ace = 1, J/Q/K = 11/12/13).
pub fn point_score(cards: &[Card]) -> u8 {
    let total: u32 = cards.iter().map(|c| u32::from(c.rank.pips())).sum();
    (total % 10) as u8
}

// ---------------------------------------------------------------------------
// HandValue
// ---------------------------------------------------------------------------

/// Showdown strength of a hand.
///
/// Categories compare first. Two HighCard hands compare by their modulo
/// point score before falling back to the [`HandRank`] order; every other
/// category uses the [`HandRank`] order directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandValue {
    pub rank: HandRank,
    pub points: u8,
}

impl HandValue {
    pub fn of(cards: &[Card]) -> Self {
        Self {
            rank: evaluate(cards),
            points: point_score(cards),
        }
    }

    pub fn category(&self) -> HandCategory {
        self.rank.category
    }

    /// The score reported in `HAND_RANKS`: points for HighCard, the
    /// composite score otherwise.
    pub fn display_score(&self) -> i64 {
        match self.rank.category {
            HandCategory::HighCard => i64::from(self.points),
            _ => self.rank.composite_score(),
        }
    }
}

impl Ord for HandValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .category
            .cmp(&other.rank.category)
            .then_with(|| match self.rank.category {
                HandCategory::HighCard => self.points.cmp(&other.points),
                _ => Ordering::Equal,
            })
            .then_with(|| self.rank.cmp(&other.rank))
    }
}

impl PartialOrd for HandValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HandValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HandValue {}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(text: &str) -> Vec<Card> {
        text.split_whitespace()
            .map(|c| c.parse().expect("test card"))
            .collect()
    }

    #[test]
    fn test_evaluate_three_of_a_kind() {
        let rank = evaluate(&hand("9♠ 9♥ 9♦"));
        assert_eq!(rank.category, HandCategory::ThreeOfAKind);
        assert_eq!(rank.primary, 9);
        assert!(rank.tiebreakers.is_empty());
    }

    #[test]
    fn test_evaluate_straight_flush_over_flush() {
        let rank = evaluate(&hand("5♣ 6♣ 7♣"));
        assert_eq!(rank.category, HandCategory::StraightFlush);
        assert_eq!(rank.primary, 7);
    }

    #[test]
    fn test_evaluate_ace_low_straight_tops_at_three() {
        let rank = evaluate(&hand("A♠ 2♥ 3♦"));
        assert_eq!(rank.category, HandCategory::Straight);
        assert_eq!(rank.primary, 3);
    }

    #[test]
    fn test_evaluate_ace_high_straight_tops_at_ace() {
        let rank = evaluate(&hand("Q♠ K♥ A♦"));
        assert_eq!(rank.category, HandCategory::Straight);
        assert_eq!(rank.primary, 14);
        assert!(evaluate(&hand("A♠ 2♥ 3♦")) < rank);
    }

    #[test]
    fn test_evaluate_king_ace_two_is_not_a_straight() {
        let rank = evaluate(&hand("K♠ A♥ 2♦"));
        assert_eq!(rank.category, HandCategory::HighCard);
        assert_eq!(rank.primary, 14);
        assert_eq!(rank.tiebreakers, vec![13, 2]);
    }

    #[test]
    fn test_evaluate_flush_keeps_kickers_descending() {
        let rank = evaluate(&hand("4♥ J♥ 8♥"));
        assert_eq!(rank.category, HandCategory::Flush);
        assert_eq!(rank.primary, 11);
        assert_eq!(rank.tiebreakers, vec![8, 4]);
    }

    #[test]
    fn test_evaluate_pair_is_high_card() {
        let rank = evaluate(&hand("K♠ K♥ 5♦"));
        assert_eq!(rank.category, HandCategory::HighCard);
        assert_eq!(rank.primary, 13);
        assert_eq!(rank.tiebreakers, vec![13, 5]);
    }

    #[test]
    fn test_evaluate_partial_hand_is_high_card() {
        assert_eq!(evaluate(&hand("7♠ 7♥")).category, HandCategory::HighCard);
        assert_eq!(evaluate(&[]).primary, 0);
    }

    #[test]
    fn test_point_score_is_pip_sum_mod_ten() {
        // 1 + 13 + 5 = 19
        assert_eq!(point_score(&hand("A♠ K♥ 5♦")), 9);
        // 10 + 10 + 10 = 30
        assert_eq!(point_score(&hand("10♠ 10♥ 10♦")), 0);
    }

    #[test]
    fn test_composite_score_packs_rank() {
        let rank = evaluate(&hand("4♥ J♥ 8♥"));
        assert_eq!(rank.composite_score(), 2_000_000 + 11 * 10_000 + 804);
    }

    #[test]
    fn test_high_card_points_beat_higher_cards() {
        // A+K+J = 1+13+11 = 25 → 5 points; 2+8+9 = 19 → 9 points.
        let high = HandValue::of(&hand("A♠ K♥ J♦"));
        let nine = HandValue::of(&hand("2♠ 8♥ 9♣"));
        assert_eq!(high.points, 5);
        assert_eq!(nine.points, 9);
        assert!(nine > high);

        let straight = HandValue::of(&hand("2♠ 4♥ 3♣"));
        assert_eq!(straight.category(), HandCategory::Straight);
        assert!(straight > nine);
    }

    #[test]
    fn test_high_card_equal_points_fall_back_to_rank() {
        // Both score 9 points.
        let a = HandValue::of(&hand("K♠ 4♥ 2♦"));
        let b = HandValue::of(&hand("Q♣ 5♦ 2♥"));
        assert_eq!(a.points, b.points);
        assert!(a > b);
    }

    #[test]
    fn test_three_of_a_kind_beats_any_high_card_points() {
        let trips = HandValue::of(&hand("9♠ 9♥ 9♦"));
        let nine_points = HandValue::of(&hand("2♠ 8♥ 9♣"));
        assert!(trips > nine_points);
        assert_eq!(trips.display_score(), 5_090_000);
        assert_eq!(nine_points.display_score(), 9);
    }

    #[test]
    fn test_identical_ranks_different_suits_are_equal() {
        let a = HandValue::of(&hand("K♠ 7♥ 2♦"));
        let b = HandValue::of(&hand("K♣ 7♦ 2♥"));
        assert_eq!(a, b);
    }
}
