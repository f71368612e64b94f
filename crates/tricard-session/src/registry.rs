//! The player registry: who is online, where they are, and how to reach
//! them.
//!
//! # Lock discipline
//!
//! `PlayerRegistry` wraps its map in a `std::sync::Mutex`. The lock is a
//! leaf: every method takes it, reads or writes the map, and releases it
//! before returning. Nothing is awaited and no other lock is acquired
//! while it is held, so callers may use the registry from room actors and
//! connection tasks alike without any ordering rules of their own.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::UnboundedSender;
use tricard_protocol::{Event, PlayerStatus, RoomName, Username};

use crate::SessionError;

/// A logged-in player's lobby state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presence {
    pub status: PlayerStatus,
    /// The room the player is seated in, if any.
    pub room: Option<RoomName>,
}

#[derive(Debug)]
struct Entry {
    presence: Presence,
    /// Monotonic login counter, used to list players in login order.
    seq: u64,
    /// The connection's event channel, once its writer is running.
    mailbox: Option<UnboundedSender<Event>>,
}

#[derive(Debug, Default)]
struct Inner {
    players: HashMap<Username, Entry>,
    next_seq: u64,
}

/// Process-wide presence registry. One entry per online username.
///
/// ```text
/// register ──→ Free ──seat──→ Busy ──set_status(Playing)──→ Playing
///               ↑              │                              │
///               └────unseat────┴──────────unseat──────────────┘
/// ```
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    inner: Mutex<Inner>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `username` online with status `Free`.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the name is already online.
    pub fn register(&self, username: &Username) -> Result<(), SessionError> {
        let mut inner = self.lock();
        if inner.players.contains_key(username) {
            return Err(SessionError::AlreadyConnected(username.clone()));
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.players.insert(
            username.clone(),
            Entry {
                presence: Presence::default(),
                seq,
                mailbox: None,
            },
        );
        tracing::info!(player = %username, "player online");
        Ok(())
    }

    /// Removes `username`, returning its last presence.
    pub fn unregister(&self, username: &Username) -> Option<Presence> {
        let removed = self.lock().players.remove(username).map(|e| e.presence);
        if removed.is_some() {
            tracing::info!(player = %username, "player offline");
        }
        removed
    }

    /// Routes events addressed to `username` outside any room into
    /// `mailbox`. Returns `false` if the player is not online.
    pub fn attach_mailbox(&self, username: &Username, mailbox: UnboundedSender<Event>) -> bool {
        match self.lock().players.get_mut(username) {
            Some(entry) => {
                entry.mailbox = Some(mailbox);
                true
            }
            None => false,
        }
    }

    /// Delivers `event` to an online player's mailbox. Returns whether it
    /// was queued.
    pub fn send_to(&self, username: &Username, event: Event) -> bool {
        let inner = self.lock();
        inner
            .players
            .get(username)
            .and_then(|e| e.mailbox.as_ref())
            .is_some_and(|mailbox| mailbox.send(event).is_ok())
    }

    pub fn is_online(&self, username: &Username) -> bool {
        self.lock().players.contains_key(username)
    }

    pub fn presence(&self, username: &Username) -> Option<Presence> {
        self.lock()
            .players
            .get(username)
            .map(|e| e.presence.clone())
    }

    /// The room `username` is seated in.
    pub fn room_of(&self, username: &Username) -> Option<RoomName> {
        self.lock()
            .players
            .get(username)
            .and_then(|e| e.presence.room.clone())
    }

    /// Seats `username` in `room` with status `Busy`.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the player is not online.
    pub fn seat(&self, username: &Username, room: &RoomName) -> Result<(), SessionError> {
        let mut inner = self.lock();
        let entry = inner
            .players
            .get_mut(username)
            .ok_or_else(|| SessionError::NotFound(username.clone()))?;
        entry.presence = Presence {
            status: PlayerStatus::Busy,
            room: Some(room.clone()),
        };
        Ok(())
    }

    /// Returns `username` to the lobby, but only if it is still seated in
    /// `room`. A late update from a room the player already left is a
    /// no-op. Returns whether anything changed.
    pub fn unseat(&self, username: &Username, room: &RoomName) -> bool {
        let mut inner = self.lock();
        match inner.players.get_mut(username) {
            Some(entry) if entry.presence.room.as_ref() == Some(room) => {
                entry.presence = Presence::default();
                true
            }
            _ => false,
        }
    }

    /// Sets the status of a player seated in `room`. Ignored if the player
    /// is offline or seated elsewhere.
    pub fn set_status(&self, username: &Username, room: &RoomName, status: PlayerStatus) -> bool {
        let mut inner = self.lock();
        match inner.players.get_mut(username) {
            Some(entry) if entry.presence.room.as_ref() == Some(room) => {
                entry.presence.status = status;
                true
            }
            _ => false,
        }
    }

    /// Every online player in login order.
    pub fn list(&self) -> Vec<(Username, Presence)> {
        let inner = self.lock();
        let mut entries: Vec<_> = inner
            .players
            .iter()
            .map(|(name, e)| (e.seq, name.clone(), e.presence.clone()))
            .collect();
        entries.sort_by_key(|(seq, _, _)| *seq);
        entries
            .into_iter()
            .map(|(_, name, presence)| (name, presence))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    #[test]
    fn test_register_rejects_duplicate_name() {
        let registry = PlayerRegistry::new();
        registry.register(&user("alice")).unwrap();
        let err = registry.register(&user("alice")).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyConnected(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_frees_the_name() {
        let registry = PlayerRegistry::new();
        registry.register(&user("alice")).unwrap();
        assert_eq!(registry.unregister(&user("alice")), Some(Presence::default()));
        assert!(!registry.is_online(&user("alice")));
        assert_eq!(registry.unregister(&user("alice")), None);
        registry.register(&user("alice")).unwrap();
    }

    #[test]
    fn test_seat_and_unseat() {
        let registry = PlayerRegistry::new();
        let room = RoomName::numbered(1);
        registry.register(&user("alice")).unwrap();

        registry.seat(&user("alice"), &room).unwrap();
        let presence = registry.presence(&user("alice")).unwrap();
        assert_eq!(presence.status, PlayerStatus::Busy);
        assert_eq!(registry.room_of(&user("alice")), Some(room.clone()));

        assert!(registry.unseat(&user("alice"), &room));
        assert_eq!(registry.presence(&user("alice")), Some(Presence::default()));
    }

    #[test]
    fn test_seat_unknown_player_fails() {
        let registry = PlayerRegistry::new();
        let err = registry.seat(&user("ghost"), &RoomName::numbered(1)).unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[test]
    fn test_updates_from_a_stale_room_are_ignored() {
        let registry = PlayerRegistry::new();
        let old = RoomName::numbered(1);
        let new = RoomName::numbered(2);
        registry.register(&user("alice")).unwrap();
        registry.seat(&user("alice"), &new).unwrap();

        assert!(!registry.unseat(&user("alice"), &old));
        assert!(!registry.set_status(&user("alice"), &old, PlayerStatus::Playing));
        assert_eq!(registry.room_of(&user("alice")), Some(new.clone()));

        assert!(registry.set_status(&user("alice"), &new, PlayerStatus::Playing));
        assert_eq!(
            registry.presence(&user("alice")).unwrap().status,
            PlayerStatus::Playing
        );
    }

    #[test]
    fn test_send_to_needs_an_attached_mailbox() {
        let registry = PlayerRegistry::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        assert!(!registry.attach_mailbox(&user("alice"), tx.clone()));

        registry.register(&user("alice")).unwrap();
        assert!(!registry.send_to(&user("alice"), Event::YourTurn));
        assert!(registry.attach_mailbox(&user("alice"), tx));
        assert!(registry.send_to(&user("alice"), Event::YourTurn));
        assert_eq!(rx.try_recv().unwrap(), Event::YourTurn);

        drop(rx);
        assert!(!registry.send_to(&user("alice"), Event::Wait));
        registry.unregister(&user("alice"));
        assert!(!registry.send_to(&user("alice"), Event::Wait));
    }

    #[test]
    fn test_list_is_in_login_order() {
        let registry = PlayerRegistry::new();
        for name in ["carol", "alice", "bob"] {
            registry.register(&user(name)).unwrap();
        }
        registry.unregister(&user("alice"));
        registry.register(&user("alice")).unwrap();

        let names: Vec<_> = registry
            .list()
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect();
        assert_eq!(names, ["carol", "bob", "alice"]);
    }
}
