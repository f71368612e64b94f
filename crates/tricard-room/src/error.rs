//! Error types for the room layer.

use tricard_protocol::{Event, KickBlock, RoomName, StartBlock, Username};

/// A state violation answered with a wire signal.
///
/// These are expected outcomes of player input, not faults: each maps to
/// exactly one [`Event`] sent back to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("room is full")]
    RoomFull,

    /// Joining is not possible right now (round running, already seated).
    #[error("join refused")]
    JoinFailed,

    #[error("requester is not the host")]
    NotHost,

    #[error("not the requester's turn")]
    NotYourTurn,

    #[error("kick refused: {0:?}")]
    Kick(KickBlock),

    #[error("start refused: {0:?}")]
    Start(StartBlock),
}

impl From<Rejection> for Event {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::RoomFull => Event::RoomFull,
            Rejection::JoinFailed => Event::JoinFail,
            Rejection::NotHost => Event::NotHost,
            Rejection::NotYourTurn => Event::NotYourTurn,
            Rejection::Kick(reason) => Event::KickBlocked(reason),
            Rejection::Start(reason) => Event::StartBlocked(reason),
        }
    }
}

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomName),

    /// The player is not seated in this room.
    #[error("player {player} not in room {room}")]
    NotInRoom { player: Username, room: RoomName },

    /// The room refused the action with a wire signal.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The room's actor has stopped.
    #[error("room {0} is unavailable")]
    Unavailable(RoomName),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_maps_to_wire_event() {
        assert_eq!(Event::from(Rejection::RoomFull).to_string(), "ROOM_FULL");
        assert_eq!(Event::from(Rejection::JoinFailed).to_string(), "JOIN_FAIL");
        assert_eq!(
            Event::from(Rejection::Kick(KickBlock::PlayerNotFound)).to_string(),
            "KICK_BLOCKED;PLAYER_NOT_FOUND"
        );
        assert_eq!(
            Event::from(Rejection::Start(StartBlock::NotEnoughPlayers)).to_string(),
            "START_BLOCKED;NOT_ENOUGH_PLAYERS"
        );
    }

    #[test]
    fn test_room_error_wraps_rejection() {
        let err: RoomError = Rejection::NotHost.into();
        assert!(matches!(err, RoomError::Rejected(Rejection::NotHost)));
        assert_eq!(err.to_string(), "requester is not the host");
    }
}
