//! Error types for card parsing.

/// Errors produced when reading a card from its text form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    /// The rank part is not one of `2..10`, `J`, `Q`, `K`, `A`.
    #[error("invalid rank: {0:?}")]
    InvalidRank(String),

    /// The suit part is not one of `♠♥♦♣` (or `s h d c`).
    #[error("invalid suit: {0:?}")]
    InvalidSuit(String),

    /// The text is too short to hold a rank and a suit.
    #[error("malformed card: {0:?}")]
    Malformed(String),
}
