//! Per-round state: the deck, hands, and timeout eliminations.

use std::collections::HashMap;

use tricard_cards::{Card, Deck};
use tricard_protocol::Username;
use tricard_store::MatchTicket;

/// Everything that lives exactly as long as one round.
///
/// Hands are keyed by username so they survive seat index shifts when a
/// player is removed mid-round.
#[derive(Debug)]
pub struct Round {
    deck: Deck,
    hands: HashMap<Username, Vec<Card>>,
    eliminated: Vec<Username>,
    ticket: MatchTicket,
}

impl Round {
    /// Starts a round with an empty hand for every participant.
    pub fn new(deck: Deck, players: &[Username], ticket: MatchTicket) -> Self {
        Self {
            deck,
            hands: players.iter().map(|p| (p.clone(), Vec::new())).collect(),
            eliminated: Vec::new(),
            ticket,
        }
    }

    pub fn ticket(&self) -> MatchTicket {
        self.ticket
    }

    pub fn hand(&self, username: &Username) -> &[Card] {
        self.hands.get(username).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn draw_count(&self, username: &Username) -> usize {
        self.hand(username).len()
    }

    /// Draws the top card into `username`'s hand. `None` when the deck is
    /// exhausted or the player is not in the round.
    pub fn draw_for(&mut self, username: &Username) -> Option<Card> {
        let hand = self.hands.get_mut(username)?;
        let card = self.deck.draw()?;
        hand.push(card);
        Some(card)
    }

    pub fn cards_left(&self) -> usize {
        self.deck.len()
    }

    /// Drops a timed-out player's hand and counts them as a participant.
    pub fn eliminate(&mut self, username: &Username) {
        if self.hands.remove(username).is_some() {
            self.eliminated.push(username.clone());
        }
    }

    /// Drops a leaver's hand. Leavers are not counted as participants.
    pub fn forfeit(&mut self, username: &Username) {
        self.hands.remove(username);
    }

    /// Players eliminated by timeout this round, in elimination order.
    pub fn eliminated(&self) -> &[Username] {
        &self.eliminated
    }
}
