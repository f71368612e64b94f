//! The room state machine: join, ready, start, draw, kick, leave, timeout
//! and round settlement.
//!
//! [`Room`] is synchronous and does no I/O. Every transition returns an
//! [`Outbox`] that the room actor delivers once the transition is done.
//! The actor is the only caller, so every method runs under the room's
//! single mutation queue.

use std::fmt;

use tracing::{debug, info};
use tricard_cards::{Card, DeckSource, HandCategory, HandValue};
use tricard_protocol::{Event, PlayerStatus, RoomName, StartBlock, Username, WinnerOutcome};
use tricard_store::ResultRow;
use tricard_timer::{TurnExpiry, TurnTimer};

use crate::broadcast::{self, Outbox, PresenceChange};
use crate::kick::{self, TimeoutElimination};
use crate::{
    Rejection, RoomConfig, RoomError, RoomInfo, RoomPhase, Roster, Round, ScoreManager,
    Settlement, TurnManager,
};

/// Point-in-time view of a room, for queries and assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub name: RoomName,
    pub host_index: usize,
    pub players: Vec<Username>,
    pub ready: Vec<(Username, bool)>,
    pub phase: RoomPhase,
    /// Seat index of the turn holder while a round is running.
    pub turn: Option<usize>,
    /// Cards drawn this round, per seat. Empty in the lobby.
    pub draw_counts: Vec<usize>,
    pub max_players: usize,
}

/// One game room.
pub struct Room {
    name: RoomName,
    config: RoomConfig,
    roster: Roster,
    turns: TurnManager,
    round: Option<Round>,
    decks: Box<dyn DeckSource>,
    scores: ScoreManager,
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("name", &self.name)
            .field("roster", &self.roster)
            .field("turns", &self.turns)
            .field("round", &self.round)
            .finish_non_exhaustive()
    }
}

impl Room {
    pub fn new(
        name: RoomName,
        config: RoomConfig,
        decks: Box<dyn DeckSource>,
        scores: ScoreManager,
    ) -> Self {
        let config = config.validated();
        Self {
            roster: Roster::new(config.max_players),
            turns: TurnManager::new(config.turn_timeout),
            name,
            config,
            round: None,
            decks,
            scores,
        }
    }

    pub fn name(&self) -> &RoomName {
        &self.name
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn phase(&self) -> RoomPhase {
        if self.round.is_some() {
            RoomPhase::Playing
        } else {
            RoomPhase::Lobby
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn members(&self) -> Vec<Username> {
        self.roster.usernames()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn contains(&self, username: &Username) -> bool {
        self.roster.contains(username)
    }

    /// The player whose turn it is, while a round is running.
    pub fn turn_holder(&self) -> Option<&Username> {
        self.round.as_ref()?;
        self.roster.get(self.turns.current())
    }

    /// Cards `username` holds in the running round.
    pub fn hand(&self, username: &Username) -> &[Card] {
        self.round.as_ref().map(|r| r.hand(username)).unwrap_or(&[])
    }

    pub fn timer_mut(&mut self) -> &mut TurnTimer {
        self.turns.timer_mut()
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            name: self.name.clone(),
            phase: self.phase(),
            player_count: self.roster.len(),
            max_players: self.config.max_players,
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        let (turn, draw_counts) = match &self.round {
            Some(round) => (
                Some(self.turns.current()),
                self.roster.iter().map(|u| round.draw_count(u)).collect(),
            ),
            None => (None, Vec::new()),
        };
        RoomSnapshot {
            name: self.name.clone(),
            host_index: self.roster.host_index(),
            players: self.roster.usernames(),
            ready: self.roster.ready_flags(),
            phase: self.phase(),
            turn,
            draw_counts,
            max_players: self.config.max_players,
        }
    }

    fn require_member(&self, username: &Username) -> Result<(), RoomError> {
        if self.roster.contains(username) {
            Ok(())
        } else {
            Err(RoomError::NotInRoom {
                player: username.clone(),
                room: self.name.clone(),
            })
        }
    }

    // -----------------------------------------------------------------------
    // Lobby
    // -----------------------------------------------------------------------

    /// Seats a player. The first player of a fresh room is told
    /// `ROOM_CREATED`, everyone after that `JOIN_OK`.
    pub fn join(&mut self, username: &Username) -> Result<Outbox, RoomError> {
        if !self.phase().is_joinable() {
            return Err(Rejection::JoinFailed.into());
        }
        let creator = self.roster.is_empty();
        self.roster.add(username.clone())?;

        let mut out = Outbox::new();
        out.presence(PresenceChange::Seated(username.clone()));
        let reply = if creator {
            Event::RoomCreated(self.name.clone())
        } else {
            Event::JoinOk(self.name.clone())
        };
        out.to(username, reply);
        broadcast::membership(&mut out, &self.name, &self.roster);

        info!(
            room = %self.name,
            player = %username,
            players = self.roster.len(),
            "player joined"
        );
        Ok(out)
    }

    /// Sets or clears a ready flag. Ignored while a round is running.
    pub fn set_ready(&mut self, username: &Username, ready: bool) -> Result<Outbox, RoomError> {
        self.require_member(username)?;
        let mut out = Outbox::new();
        if self.round.is_some() {
            debug!(room = %self.name, player = %username, "ready ignored mid-round");
            return Ok(out);
        }
        self.roster.set_ready(username, ready);
        out.all(broadcast::ready_status(&self.roster));
        Ok(out)
    }

    /// Resends the roster and ready snapshot to one player.
    pub fn resync(&self, username: &Username) -> Result<Outbox, RoomError> {
        self.require_member(username)?;
        let mut out = Outbox::new();
        out.to(username, broadcast::room_update(&self.name, &self.roster));
        out.to(username, broadcast::ready_status(&self.roster));
        Ok(out)
    }

    /// Host kick, lobby only.
    pub fn kick(&mut self, requester: &Username, target: &Username) -> Result<Outbox, RoomError> {
        self.require_member(requester)?;
        kick::check_host_kick(&self.roster, self.phase(), requester, target)?;

        let mut out = Outbox::new();
        if self.roster.remove(target).is_none() {
            return Ok(out);
        }
        out.presence(PresenceChange::Unseated(target.clone()));
        out.to(target, Event::Kicked(kick::KICK_REASON.to_string()));
        broadcast::membership(&mut out, &self.name, &self.roster);

        info!(room = %self.name, host = %requester, player = %target, "player kicked");
        Ok(out)
    }

    /// Removes a player by leave or disconnect.
    ///
    /// Returns `None` if the player was not seated. A leaver mid-round
    /// forfeits their hand without a penalty and is not counted as a
    /// participant.
    pub fn leave(&mut self, username: &Username) -> Option<Outbox> {
        let removal = self.roster.remove(username)?;
        let mut out = Outbox::new();
        out.presence(PresenceChange::Unseated(username.clone()));
        if let Some(new_host) = &removal.new_host {
            out.to(new_host, Event::YouAreHost);
        }
        info!(
            room = %self.name,
            player = %username,
            players = self.roster.len(),
            "player left"
        );

        match self.round.as_mut() {
            Some(round) => {
                round.forfeit(username);
                let holder_removed = self.turns.seat_removed(removal.index);
                if !self.roster.is_empty() {
                    out.all(broadcast::room_update(&self.name, &self.roster));
                }
                self.after_removal(&mut out, holder_removed);
            }
            None => broadcast::membership(&mut out, &self.name, &self.roster),
        }
        Some(out)
    }

    // -----------------------------------------------------------------------
    // Round
    // -----------------------------------------------------------------------

    /// Starts a round. Host only; every non-host player must be ready.
    pub fn start(&mut self, requester: &Username) -> Result<Outbox, RoomError> {
        self.require_member(requester)?;
        if self.round.is_some() {
            return Err(Rejection::Start(StartBlock::GameRunning).into());
        }
        if !self.roster.is_host(requester) {
            return Err(Rejection::NotHost.into());
        }
        if self.roster.len() < self.config.min_players {
            return Err(Rejection::Start(StartBlock::NotEnoughPlayers).into());
        }
        if !self.roster.all_ready(self.config.min_players) {
            return Err(Rejection::Start(StartBlock::NotAllReady).into());
        }

        let players = self.roster.usernames();
        let ticket = self.scores.recorder().open_match(players.len());
        self.round = Some(Round::new(self.decks.next_deck(), &players, ticket));
        self.roster.clear_ready();

        let mut out = Outbox::new();
        for player in &players {
            out.presence(PresenceChange::Status(player.clone(), PlayerStatus::Playing));
        }
        out.all(Event::GameStart(self.name.clone()));
        out.all(broadcast::room_update(&self.name, &self.roster));

        let host = self.roster.host_index();
        self.turns.begin(host);
        if let Some(holder) = self.roster.get(host) {
            broadcast::turn_notices(&mut out, holder);
        }

        info!(room = %self.name, players = players.len(), "round started");
        Ok(out)
    }

    /// Draws one card for the turn holder and passes the turn on.
    ///
    /// An exhausted deck makes the draw a no-op that still advances.
    pub fn draw(&mut self, username: &Username) -> Result<Outbox, RoomError> {
        self.require_member(username)?;
        let Some(round) = self.round.as_mut() else {
            return Err(Rejection::NotYourTurn.into());
        };
        if self.roster.index_of(username) != Some(self.turns.current())
            || round.draw_count(username) >= self.config.hand_size
        {
            return Err(Rejection::NotYourTurn.into());
        }

        let mut out = Outbox::new();
        match round.draw_for(username) {
            Some(card) => out.to(username, Event::Draw(card)),
            None => debug!(room = %self.name, player = %username, "deck exhausted, turn skipped"),
        }
        self.advance_turn(&mut out);
        Ok(out)
    }

    /// Eliminates the turn holder whose countdown ran out.
    ///
    /// Returns `None` for an expiry that no longer matches the current
    /// turn.
    pub fn on_turn_timeout(&mut self, expiry: TurnExpiry) -> Option<(TimeoutElimination, Outbox)> {
        if !self.turns.is_current(&expiry) {
            debug!(room = %self.name, epoch = expiry.epoch, "stale turn expiry ignored");
            return None;
        }
        let round = self.round.as_mut()?;
        let seat = self.turns.current();
        let username = self.roster.get(seat)?.clone();

        let total = self.scores.penalize_timeout(&username);
        round.eliminate(&username);

        let mut out = Outbox::new();
        let reason = TimeoutElimination::reason(self.turns.timer().timeout());
        out.to(&username, Event::Eliminated(reason));

        let holder_removed = match self.roster.remove(&username) {
            Some(removal) => {
                if let Some(new_host) = &removal.new_host {
                    out.to(new_host, Event::YouAreHost);
                }
                self.turns.seat_removed(removal.index)
            }
            None => true,
        };
        out.presence(PresenceChange::Unseated(username.clone()));
        if !self.roster.is_empty() {
            out.all(broadcast::room_update(&self.name, &self.roster));
        }

        info!(
            room = %self.name,
            player = %username,
            total,
            remaining = self.roster.len(),
            "player eliminated by timeout"
        );
        self.after_removal(&mut out, holder_removed);
        Some((TimeoutElimination { username, seat, total }, out))
    }

    /// Resolves the round after a player vanished from it.
    fn after_removal(&mut self, out: &mut Outbox, holder_removed: bool) {
        match self.roster.len() {
            0 => self.abandon_round(),
            1 => self.end_by_walkover(out),
            _ if holder_removed => self.advance_turn(out),
            _ => {}
        }
    }

    /// Passes the turn backward to the next player still short of a full
    /// hand, or ends the round when there is none.
    fn advance_turn(&mut self, out: &mut Outbox) {
        let Some(round) = &self.round else {
            return;
        };
        let roster = &self.roster;
        let hand_size = self.config.hand_size;
        let next = self.turns.advance(roster.len(), |seat| {
            roster
                .get(seat)
                .is_some_and(|u| round.draw_count(u) < hand_size)
        });
        match next {
            Some(seat) => {
                if let Some(holder) = self.roster.get(seat) {
                    broadcast::turn_notices(out, holder);
                }
            }
            None => self.end_by_showdown(out),
        }
    }

    /// Evaluates every remaining hand and settles the round.
    fn end_by_showdown(&mut self, out: &mut Outbox) {
        let Some(round) = self.round.take() else {
            return;
        };
        self.turns.cancel();

        let hands: Vec<(Username, Vec<Card>)> = self
            .roster
            .iter()
            .map(|u| (u.clone(), round.hand(u).to_vec()))
            .collect();
        let values: Vec<(Username, HandValue)> = hands
            .iter()
            .map(|(u, cards)| (u.clone(), HandValue::of(cards)))
            .collect();

        // Strongest first. The sort is stable, so ties keep seating order.
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|a, b| values[*b].1.cmp(&values[*a].1));
        let Some((&first, rest)) = order.split_first() else {
            return;
        };

        let (winner, best) = &values[first];
        let losers: Vec<Username> = rest.iter().map(|i| values[*i].0.clone()).collect();
        let settlement = Settlement::zero_sum(winner, &losers, round.eliminated().len());
        let ranking = self.scores.settle(&settlement);

        out.all(broadcast::show_hands(&hands));
        out.all(broadcast::hand_ranks(&values));
        out.all(Event::Winner {
            username: winner.clone(),
            outcome: WinnerOutcome::Showdown {
                category: best.category(),
                points: (best.category() == HandCategory::HighCard).then_some(best.points),
            },
        });
        out.all(Event::Ranking(ranking));

        let rows = order
            .iter()
            .enumerate()
            .map(|(position, i)| {
                let (username, value) = &values[*i];
                ResultRow {
                    username: username.clone(),
                    position: position as u32 + 1,
                    score: value.display_score(),
                    hand: value.category().name().to_string(),
                    cards: broadcast::cards_text(&hands[*i].1),
                }
            })
            .collect();
        self.scores
            .recorder()
            .finish_match(round.ticket(), rows, Some(winner.clone()));

        info!(
            room = %self.name,
            winner = %winner,
            hand = %best.category(),
            participants = settlement.participants(),
            "round settled by showdown"
        );
        self.back_to_lobby(out);
    }

    /// The last player standing wins without a showdown.
    fn end_by_walkover(&mut self, out: &mut Outbox) {
        let Some(round) = self.round.take() else {
            return;
        };
        self.turns.cancel();
        let Some(survivor) = self.roster.get(0).cloned() else {
            return;
        };

        let settlement = Settlement::zero_sum(&survivor, &[], round.eliminated().len());
        let ranking = self.scores.settle(&settlement);
        out.all(Event::Winner {
            username: survivor.clone(),
            outcome: WinnerOutcome::Walkover,
        });
        out.all(Event::Ranking(ranking));
        self.scores
            .recorder()
            .finish_match(round.ticket(), Vec::new(), Some(survivor.clone()));

        info!(room = %self.name, winner = %survivor, "round settled by walkover");
        self.back_to_lobby(out);
    }

    /// Everyone is gone. Timeout penalties already charged stand.
    fn abandon_round(&mut self) {
        if let Some(round) = self.round.take() {
            self.turns.cancel();
            self.scores
                .recorder()
                .finish_match(round.ticket(), Vec::new(), None);
            info!(room = %self.name, "round abandoned");
        }
    }

    fn back_to_lobby(&mut self, out: &mut Outbox) {
        out.all(Event::End(self.name.clone()));
        self.roster.clear_ready();
        for player in self.roster.iter() {
            out.presence(PresenceChange::Status(player.clone(), PlayerStatus::Busy));
        }
        out.all(broadcast::ready_status(&self.roster));
    }

    /// Stops the countdown before the room is dropped.
    pub fn shutdown(&mut self) {
        self.turns.cancel();
        self.abandon_round();
    }
}

#[cfg(test)]
mod tests {
    use tricard_cards::{Deck, Rank, Suit};

    use super::*;

    fn user(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    fn room() -> Room {
        Room::new(
            RoomName::numbered(1),
            RoomConfig::default(),
            Box::new(Deck::standard),
            ScoreManager::detached(),
        )
    }

    fn seated(names: &[&str]) -> Room {
        let mut room = room();
        for name in names {
            room.join(&user(name)).unwrap();
        }
        room
    }

    #[test]
    fn test_first_joiner_gets_room_created() {
        let mut room = room();
        let out = room.join(&user("a")).unwrap();
        let events = out.events_for(&user("a"), &room.members());
        assert_eq!(events[0], Event::RoomCreated(RoomName::numbered(1)));
        let out = room.join(&user("b")).unwrap();
        let events = out.events_for(&user("b"), &room.members());
        assert_eq!(events[0], Event::JoinOk(RoomName::numbered(1)));
    }

    #[test]
    fn test_join_rejected_mid_round() {
        let mut room = seated(&["a", "b"]);
        room.set_ready(&user("b"), true).unwrap();
        room.start(&user("a")).unwrap();
        assert!(matches!(
            room.join(&user("c")),
            Err(RoomError::Rejected(Rejection::JoinFailed))
        ));
    }

    #[test]
    fn test_start_checks_in_order() {
        let mut room = seated(&["a"]);
        assert!(matches!(
            room.start(&user("a")),
            Err(RoomError::Rejected(Rejection::Start(StartBlock::NotEnoughPlayers)))
        ));
        room.join(&user("b")).unwrap();
        assert!(matches!(
            room.start(&user("b")),
            Err(RoomError::Rejected(Rejection::NotHost))
        ));
        assert!(matches!(
            room.start(&user("a")),
            Err(RoomError::Rejected(Rejection::Start(StartBlock::NotAllReady)))
        ));
        room.set_ready(&user("b"), true).unwrap();
        room.start(&user("a")).unwrap();
        assert!(matches!(
            room.start(&user("a")),
            Err(RoomError::Rejected(Rejection::Start(StartBlock::GameRunning)))
        ));
    }

    #[test]
    fn test_draw_out_of_turn_and_without_round() {
        let mut room = seated(&["a", "b"]);
        assert!(matches!(
            room.draw(&user("a")),
            Err(RoomError::Rejected(Rejection::NotYourTurn))
        ));
        room.set_ready(&user("b"), true).unwrap();
        room.start(&user("a")).unwrap();
        assert!(matches!(
            room.draw(&user("b")),
            Err(RoomError::Rejected(Rejection::NotYourTurn))
        ));
        let out = room.draw(&user("a")).unwrap();
        let events = out.events_for(&user("a"), &room.members());
        assert_eq!(events[0], Event::Draw(Card::new(Rank::Two, Suit::Spades)));
        assert_eq!(room.turn_holder(), Some(&user("b")));
    }

    #[test]
    fn test_ready_ignored_mid_round() {
        let mut room = seated(&["a", "b"]);
        room.set_ready(&user("b"), true).unwrap();
        room.start(&user("a")).unwrap();
        let out = room.set_ready(&user("b"), true).unwrap();
        assert!(out.is_empty());
        assert!(!room.roster().is_ready(&user("b")));
    }

    #[test]
    fn test_stale_expiry_is_ignored() {
        let mut room = seated(&["a", "b"]);
        room.set_ready(&user("b"), true).unwrap();
        room.start(&user("a")).unwrap();
        let stale = room.timer_mut().fire_now().unwrap();
        room.timer_mut().arm();
        assert!(room.on_turn_timeout(stale).is_none());
        assert_eq!(room.members().len(), 2);
    }

    #[test]
    fn test_non_member_commands_are_not_in_room() {
        let mut room = seated(&["a"]);
        assert!(matches!(
            room.set_ready(&user("x"), true),
            Err(RoomError::NotInRoom { .. })
        ));
        assert!(room.resync(&user("x")).is_err());
        assert!(room.leave(&user("x")).is_none());
    }
}
