//! Seating, host identity, and ready flags.
//!
//! Seating order is join order and never changes except by removal. The
//! turn rotation and the `ROOM_UPDATE` host index are both positions in
//! this order.

use tricard_protocol::Username;

use crate::Rejection;

#[derive(Debug, Clone)]
struct Seat {
    username: Username,
    ready: bool,
}

/// What a [`Roster::remove`] changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Seat index the player occupied.
    pub index: usize,
    /// The player that inherited the host seat, if the host left and
    /// someone remains.
    pub new_host: Option<Username>,
}

/// The players seated in one room.
///
/// Invariant: `host < seats.len()` whenever the roster is non-empty.
#[derive(Debug, Clone)]
pub struct Roster {
    seats: Vec<Seat>,
    host: usize,
    capacity: usize,
}

impl Roster {
    pub fn new(capacity: usize) -> Self {
        Self {
            seats: Vec::with_capacity(capacity),
            host: 0,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, username: &Username) -> bool {
        self.index_of(username).is_some()
    }

    pub fn index_of(&self, username: &Username) -> Option<usize> {
        self.seats.iter().position(|s| &s.username == username)
    }

    pub fn get(&self, index: usize) -> Option<&Username> {
        self.seats.get(index).map(|s| &s.username)
    }

    /// Usernames in seating order.
    pub fn usernames(&self) -> Vec<Username> {
        self.seats.iter().map(|s| s.username.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Username> {
        self.seats.iter().map(|s| &s.username)
    }

    pub fn host_index(&self) -> usize {
        self.host
    }

    pub fn host(&self) -> Option<&Username> {
        self.get(self.host)
    }

    pub fn is_host(&self, username: &Username) -> bool {
        self.host() == Some(username)
    }

    /// Seats a player at the end of the table, not ready.
    ///
    /// # Errors
    /// [`Rejection::RoomFull`] at capacity, [`Rejection::JoinFailed`] if
    /// the player is already seated.
    pub fn add(&mut self, username: Username) -> Result<usize, Rejection> {
        if self.contains(&username) {
            return Err(Rejection::JoinFailed);
        }
        if self.is_full() {
            return Err(Rejection::RoomFull);
        }
        self.seats.push(Seat {
            username,
            ready: false,
        });
        Ok(self.seats.len() - 1)
    }

    /// Unseats a player, migrating the host seat if needed.
    ///
    /// Removing a player who is not seated is a no-op returning `None`.
    pub fn remove(&mut self, username: &Username) -> Option<Removal> {
        let index = self.index_of(username)?;
        self.seats.remove(index);

        let mut new_host = None;
        if index == self.host {
            self.host = 0;
            new_host = self.host().cloned();
        } else if index < self.host {
            self.host -= 1;
        }
        Some(Removal { index, new_host })
    }

    /// Sets a player's ready flag. Returns `false` if not seated.
    pub fn set_ready(&mut self, username: &Username, ready: bool) -> bool {
        match self.seats.iter_mut().find(|s| &s.username == username) {
            Some(seat) => {
                seat.ready = ready;
                true
            }
            None => false,
        }
    }

    pub fn is_ready(&self, username: &Username) -> bool {
        self.seats
            .iter()
            .any(|s| &s.username == username && s.ready)
    }

    pub fn clear_ready(&mut self) {
        for seat in &mut self.seats {
            seat.ready = false;
        }
    }

    /// True if at least `min_players` are seated and every non-host
    /// player is ready. The host is implicitly ready.
    pub fn all_ready(&self, min_players: usize) -> bool {
        self.seats.len() >= min_players.max(2)
            && self
                .seats
                .iter()
                .enumerate()
                .all(|(i, seat)| i == self.host || seat.ready)
    }

    /// `(username, ready)` in seating order.
    pub fn ready_flags(&self) -> Vec<(Username, bool)> {
        self.seats
            .iter()
            .map(|s| (s.username.clone(), s.ready))
            .collect()
    }
}
