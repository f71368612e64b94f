//! Card model and hand ranking for the three-card draw game.
//!
//! Everything in this crate is a pure value type or a pure function:
//!
//! - [`Card`], [`Rank`], [`Suit`]: immutable card values with their wire
//!   spelling (`10♠`, `A♥`)
//! - [`Deck`]: a 52-card deck drawn one card at a time from the top
//! - [`evaluate`] / [`HandRank`]: 3 cards → category + tie-break key
//! - [`HandValue`]: the showdown ordering, which layers the modulo
//!   "point" rule on top of [`HandRank`] for HighCard hands

mod card;
mod deck;
mod error;
mod eval;

pub use card::{Card, Rank, Suit};
pub use deck::{Deck, DeckSource, ShuffledDecks};
pub use error::CardError;
pub use eval::{HandCategory, HandRank, HandValue, evaluate, point_score};

/// Number of cards in a full hand.
pub const HAND_SIZE: usize = 3;
