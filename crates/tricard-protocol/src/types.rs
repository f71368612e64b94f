//! Identity and addressing types shared by every layer.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Characters that delimit fields somewhere in the wire format.
const RESERVED: [char; 5] = [';', '|', ':', ',', '='];

/// Longest accepted username or room name, in characters.
pub const MAX_NAME_LEN: usize = 32;

fn validate_name(raw: &str) -> Result<String, ProtocolError> {
    let name = raw.trim();
    let valid = !name.is_empty()
        && name.chars().count() <= MAX_NAME_LEN
        && !name
            .chars()
            .any(|c| RESERVED.contains(&c) || c.is_whitespace() || c.is_control());
    if valid {
        Ok(name.to_string())
    } else {
        Err(ProtocolError::InvalidName(raw.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's login name. Unique across the whole server.
///
/// Usernames are embedded verbatim in list events, so they may not contain
/// the protocol's delimiters or whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Validates and wraps a username.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        validate_name(raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Username {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A room's name, e.g. `Room_3`. Unique among live rooms.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    /// Prefix of every server-allocated room name.
    pub const PREFIX: &'static str = "Room_";

    /// Validates and wraps a room name received from a client.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        validate_name(raw).map(Self)
    }

    /// The server-allocated name for room number `n`.
    pub fn numbered(n: u32) -> Self {
        Self(format!("{}{n}", Self::PREFIX))
    }

    /// The `n` in `Room_<n>`, if this name has that shape.
    pub fn number(&self) -> Option<u32> {
        self.0.strip_prefix(Self::PREFIX)?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RoomName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Where a logged-in player is in the lobby/room lifecycle.
///
/// ```text
/// Free ──join──→ Busy ──start──→ Playing
///  ↑               │  ←──end──────  │
///  └────leave──────┴──leave/timeout─┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    /// Online and not seated in any room.
    #[default]
    Free,
    /// Seated in a room that is in lobby state.
    Busy,
    /// Seated in a room with a round in progress.
    Playing,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Free => "free",
            Self::Busy => "busy",
            Self::Playing => "playing",
        })
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who an outbound event is addressed to.
///
/// Room logic returns `(Recipient, Event)` pairs; the room actor resolves
/// them against the current membership after the state change is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every current member of the room.
    All,

    /// One specific player, even if they just left the room.
    Player(Username),

    /// Every current member except one.
    AllExcept(Username),
}

impl Recipient {
    /// Whether `member` should receive an event sent to this recipient.
    pub fn includes(&self, member: &Username) -> bool {
        match self {
            Self::All => true,
            Self::Player(target) => target == member,
            Self::AllExcept(skip) => skip != member,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_parse_trims_and_accepts_plain_names() {
        let name = Username::parse("  alice ").unwrap();
        assert_eq!(name.as_str(), "alice");
        assert_eq!(name.to_string(), "alice");
    }

    #[test]
    fn test_username_parse_rejects_delimiters() {
        for bad in ["", "   ", "a;b", "a|b", "a:b", "a,b", "a=b", "a b"] {
            assert!(Username::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_username_parse_rejects_overlong() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(Username::parse(&long).is_err());
        assert!(Username::parse(&long[1..]).is_ok());
    }

    #[test]
    fn test_room_name_numbered_round_trips_number() {
        let room = RoomName::numbered(12);
        assert_eq!(room.as_str(), "Room_12");
        assert_eq!(room.number(), Some(12));
        assert_eq!(RoomName::parse("Lobby").unwrap().number(), None);
    }

    #[test]
    fn test_player_status_display() {
        assert_eq!(PlayerStatus::Free.to_string(), "free");
        assert_eq!(PlayerStatus::Busy.to_string(), "busy");
        assert_eq!(PlayerStatus::Playing.to_string(), "playing");
        assert_eq!(PlayerStatus::default(), PlayerStatus::Free);
    }

    #[test]
    fn test_recipient_includes() {
        let alice = Username::parse("alice").unwrap();
        let bob = Username::parse("bob").unwrap();
        assert!(Recipient::All.includes(&alice));
        assert!(Recipient::Player(alice.clone()).includes(&alice));
        assert!(!Recipient::Player(alice.clone()).includes(&bob));
        assert!(!Recipient::AllExcept(alice.clone()).includes(&alice));
        assert!(Recipient::AllExcept(alice).includes(&bob));
    }
}
