//! Room configuration and lifecycle phase.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tricard_cards::{Deck, HAND_SIZE};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room the registry creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Players needed before the host may start.
    pub min_players: usize,

    /// Seats per room.
    pub max_players: usize,

    /// Cards each player draws per round.
    pub hand_size: usize,

    /// How long the turn holder has to draw before elimination.
    pub turn_timeout: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 6,
            hand_size: HAND_SIZE,
            turn_timeout: Duration::from_secs(10),
        }
    }
}

impl RoomConfig {
    /// Clamps the settings into a playable range.
    ///
    /// `hand_size` stays within `1..=3`, `max_players` leaves every seat a
    /// full hand from one deck, and `min_players` stays within
    /// `2..=max_players`.
    pub fn validated(mut self) -> Self {
        self.hand_size = self.hand_size.clamp(1, HAND_SIZE);
        let deck_limit = Deck::STANDARD_SIZE / self.hand_size;
        self.max_players = self.max_players.clamp(2, deck_limit);
        self.min_players = self.min_players.clamp(2, self.max_players);
        self
    }
}

// ---------------------------------------------------------------------------
// RoomPhase
// ---------------------------------------------------------------------------

/// Where a room is in its lobby/round cycle.
///
/// ```text
/// Lobby ──start──→ Playing ──round over──→ Lobby
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoomPhase {
    /// Accepting joins, ready toggles, kicks and starts.
    #[default]
    Lobby,
    /// A round is running.
    Playing,
}

impl RoomPhase {
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Lobby)
    }
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Playing => write!(f, "Playing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.min_players, 2);
        assert_eq!(config.max_players, 6);
        assert_eq!(config.hand_size, 3);
        assert_eq!(config.turn_timeout, Duration::from_secs(10));
        assert_eq!(config.clone().validated(), config);
    }

    #[test]
    fn test_validated_caps_seats_by_deck_size() {
        let config = RoomConfig {
            max_players: 40,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.max_players, 17);
    }

    #[test]
    fn test_validated_keeps_min_within_bounds() {
        let low = RoomConfig {
            min_players: 0,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(low.min_players, 2);

        let high = RoomConfig {
            min_players: 9,
            max_players: 4,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(high.min_players, 4);
    }

    #[test]
    fn test_validated_clamps_hand_size() {
        let config = RoomConfig {
            hand_size: 7,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.hand_size, 3);
    }

    #[test]
    fn test_room_phase_is_joinable() {
        assert!(RoomPhase::Lobby.is_joinable());
        assert!(!RoomPhase::Playing.is_joinable());
        assert_eq!(RoomPhase::Playing.to_string(), "Playing");
    }
}
