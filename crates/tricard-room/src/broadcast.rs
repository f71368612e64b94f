//! Outbound event construction.
//!
//! Nothing here performs I/O. Room transitions collect `(Recipient,
//! Event)` pairs in an [`Outbox`]; the room actor resolves recipients
//! against the membership *after* the transition and writes to each
//! player's channel.

use tricard_cards::{Card, HandValue};
use tricard_protocol::{
    Event, HandRankEntry, PlayerStatus, Recipient, RoomName, Username,
};

use crate::Roster;

/// A change to a player's lobby presence caused by a room transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceChange {
    /// Joined the room (status `busy`).
    Seated(Username),
    /// Status changed while seated.
    Status(Username, PlayerStatus),
    /// Left the room by leave, kick, or elimination (status `free`).
    Unseated(Username),
}

/// Events and presence changes produced by one room transition, in order.
#[derive(Debug, Default)]
pub struct Outbox {
    deliveries: Vec<(Recipient, Event)>,
    presence: Vec<PresenceChange>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, recipient: Recipient, event: Event) {
        self.deliveries.push((recipient, event));
    }

    pub fn all(&mut self, event: Event) {
        self.push(Recipient::All, event);
    }

    pub fn to(&mut self, player: &Username, event: Event) {
        self.push(Recipient::Player(player.clone()), event);
    }

    pub fn all_except(&mut self, player: &Username, event: Event) {
        self.push(Recipient::AllExcept(player.clone()), event);
    }

    pub fn presence(&mut self, change: PresenceChange) {
        self.presence.push(change);
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty() && self.presence.is_empty()
    }

    pub fn presence_changes(&self) -> &[PresenceChange] {
        &self.presence
    }

    /// Expands every delivery into `(player, event)` pairs, preserving
    /// order. `All` and `AllExcept` cover `members`; `Player` always
    /// names its target, member or not.
    pub fn resolve<'a>(
        &'a self,
        members: &'a [Username],
    ) -> impl Iterator<Item = (&'a Username, &'a Event)> + 'a {
        self.deliveries
            .iter()
            .flat_map(move |(recipient, event)| {
                let targets: Vec<&Username> = match recipient {
                    Recipient::Player(target) => vec![target],
                    _ => members.iter().filter(|m| recipient.includes(m)).collect(),
                };
                targets.into_iter().map(move |target| (target, event))
            })
    }

    /// Every event `player` would receive, given the post-transition
    /// `members`.
    pub fn events_for(&self, player: &Username, members: &[Username]) -> Vec<Event> {
        self.resolve(members)
            .filter(|(target, _)| *target == player)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn room_update(room: &RoomName, roster: &Roster) -> Event {
    Event::RoomUpdate {
        room: room.clone(),
        host_index: roster.host_index(),
        players: roster.usernames(),
    }
}

pub fn ready_status(roster: &Roster) -> Event {
    Event::ReadyStatus(roster.ready_flags())
}

/// `ROOM_UPDATE` followed by `READY_STATUS` to everyone.
pub fn membership(out: &mut Outbox, room: &RoomName, roster: &Roster) {
    out.all(room_update(room, roster));
    out.all(ready_status(roster));
}

/// `YOUR_TURN` to the holder, `WAIT` to everyone else.
pub fn turn_notices(out: &mut Outbox, holder: &Username) {
    out.to(holder, Event::YourTurn);
    out.all_except(holder, Event::Wait);
}

pub fn show_hands(hands: &[(Username, Vec<Card>)]) -> Event {
    Event::ShowHands(hands.to_vec())
}

pub fn hand_ranks(values: &[(Username, HandValue)]) -> Event {
    Event::HandRanks(
        values
            .iter()
            .map(|(username, value)| HandRankEntry {
                username: username.clone(),
                category: value.category(),
                score: value.display_score(),
            })
            .collect(),
    )
}

/// Cards as a comma-separated list, e.g. `K♠,Q♠,J♠`.
pub fn cards_text(cards: &[Card]) -> String {
    cards
        .iter()
        .map(Card::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
