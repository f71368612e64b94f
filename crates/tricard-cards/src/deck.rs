//! Deck construction and single-card draws.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::{Card, Rank, Suit};

/// An ordered pile of cards. Draws always take the top card.
///
/// A deck lives for exactly one round and is discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    /// Top of the deck is the end of the vector.
    cards: Vec<Card>,
}

impl Deck {
    /// Size of a standard deck.
    pub const STANDARD_SIZE: usize = 52;

    /// Unshuffled 52-card deck: suits ♠♥♦♣, ranks 2..A within each suit.
    /// The first card drawn is `2♠`.
    pub fn standard() -> Self {
        Self::from_top(
            Suit::ALL
                .into_iter()
                .flat_map(|suit| Rank::ALL.into_iter().map(move |rank| Card::new(rank, suit))),
        )
    }

    /// A standard deck shuffled with the given RNG.
    pub fn shuffled<R: rand::Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::standard();
        deck.cards.shuffle(rng);
        deck
    }

    /// Builds a deck whose first yielded card is drawn first.
    pub fn from_top(cards: impl IntoIterator<Item = Card>) -> Self {
        let mut cards: Vec<Card> = cards.into_iter().collect();
        cards.reverse();
        Self { cards }
    }

    /// Takes the top card, or `None` when the deck is exhausted.
    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

// ---------------------------------------------------------------------------
// DeckSource
// ---------------------------------------------------------------------------

/// Supplies a fresh deck at the start of every round.
///
/// Rooms own one of these. Production rooms use [`ShuffledDecks`]; tests
/// pass a closure returning a stacked [`Deck`] to get known hands.
pub trait DeckSource: Send {
    fn next_deck(&mut self) -> Deck;
}

impl<F> DeckSource for F
where
    F: FnMut() -> Deck + Send,
{
    fn next_deck(&mut self) -> Deck {
        self()
    }
}

/// Shuffled standard decks from a per-room RNG.
pub struct ShuffledDecks {
    rng: StdRng,
}

impl ShuffledDecks {
    /// Seeds the RNG from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic sequence of decks, for replays and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for ShuffledDecks {
    fn default() -> Self {
        Self::new()
    }
}

impl DeckSource for ShuffledDecks {
    fn next_deck(&mut self) -> Deck {
        Deck::shuffled(&mut self.rng)
    }
}
