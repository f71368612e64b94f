//! Room registry: creates rooms, hands out their names, and routes by
//! name.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;
use tricard_cards::{DeckSource, ShuffledDecks};
use tricard_protocol::{RoomName, Username};
use tricard_session::PlayerRegistry;

use crate::room::spawn_room;
use crate::{PlayerSender, Room, RoomConfig, RoomHandle, ScoreManager};

/// Builds the deck source of each new room.
pub type DeckFactory = Arc<dyn Fn() -> Box<dyn DeckSource> + Send + Sync>;

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Every live room, keyed by the `n` of `Room_<n>`.
///
/// The server keeps this behind an async mutex. It is only locked long
/// enough to create, look up or drop a handle; requests to a room are
/// awaited after the lock is released.
pub struct RoomRegistry {
    rooms: BTreeMap<u32, RoomHandle>,
    config: RoomConfig,
    players: Arc<PlayerRegistry>,
    scores: ScoreManager,
    decks: DeckFactory,
    channel_size: usize,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig, players: Arc<PlayerRegistry>, scores: ScoreManager) -> Self {
        Self {
            rooms: BTreeMap::new(),
            config: config.validated(),
            players,
            scores,
            decks: Arc::new(|| Box::new(ShuffledDecks::new()) as Box<dyn DeckSource>),
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }

    /// Replaces the deck source of rooms created from now on.
    pub fn with_decks(mut self, decks: DeckFactory) -> Self {
        self.decks = decks;
        self
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Opens `Room_<n>` with the smallest free `n` and seats `creator` as
    /// its host before the room accepts any other command.
    pub fn create(&mut self, creator: &Username, sender: PlayerSender) -> RoomName {
        self.prune();

        let mut n = 1;
        for taken in self.rooms.keys() {
            if *taken != n {
                break;
            }
            n += 1;
        }

        let name = RoomName::numbered(n);
        let room = Room::new(
            name.clone(),
            self.config.clone(),
            (*self.decks)(),
            self.scores.clone(),
        );
        let handle = spawn_room(
            room,
            Arc::clone(&self.players),
            creator.clone(),
            sender,
            self.channel_size,
        );
        self.rooms.insert(n, handle);
        info!(room = %name, host = %creator, rooms = self.rooms.len(), "room created");
        name
    }

    /// The handle of a live room.
    pub fn get(&self, name: &RoomName) -> Option<RoomHandle> {
        let handle = self.rooms.get(&name.number()?)?;
        (handle.name() == name && !handle.is_closed()).then(|| handle.clone())
    }

    /// Drops the entry for `handle`'s room. An entry that already belongs
    /// to a newer room under the same name is left alone.
    pub fn remove(&mut self, handle: &RoomHandle) -> bool {
        let Some(n) = handle.name().number() else {
            return false;
        };
        if !self.rooms.get(&n).is_some_and(|h| h.same_room(handle)) {
            return false;
        }
        self.rooms.remove(&n);
        info!(room = %handle.name(), rooms = self.rooms.len(), "room destroyed");
        true
    }

    /// Drops entries whose actor has stopped. Returns how many.
    pub fn prune(&mut self) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|_, handle| !handle.is_closed());
        before - self.rooms.len()
    }

    /// Handles of every live room in name order.
    pub fn handles(&self) -> Vec<RoomHandle> {
        self.rooms
            .values()
            .filter(|h| !h.is_closed())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
