//! Removal policy: host kicks and timeout elimination.
//!
//! Both paths end in [`Roster::remove`]. A host kick is only legal in the
//! lobby; a timeout elimination is always legal and costs the player one
//! point on the spot.

use std::time::Duration;

use tricard_protocol::{KickBlock, Username};

use crate::{Rejection, RoomPhase, Roster};

/// Reason sent with `KICKED` after a host kick.
pub const KICK_REASON: &str = "Kicked by host";

/// Validates a host kick.
///
/// Checks run in a fixed order and the first failure wins: round
/// running, requester not host, target not seated, target is the
/// requester.
pub fn check_host_kick(
    roster: &Roster,
    phase: RoomPhase,
    requester: &Username,
    target: &Username,
) -> Result<(), Rejection> {
    if phase == RoomPhase::Playing {
        return Err(Rejection::Kick(KickBlock::GameRunning));
    }
    if !roster.is_host(requester) {
        return Err(Rejection::NotHost);
    }
    if !roster.contains(target) {
        return Err(Rejection::Kick(KickBlock::PlayerNotFound));
    }
    if requester == target {
        return Err(Rejection::Kick(KickBlock::CannotKickSelf));
    }
    Ok(())
}

/// The turn holder who let the timer run out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutElimination {
    pub username: Username,
    /// Seat index at the moment of elimination.
    pub seat: usize,
    /// Ledger total after the penalty.
    pub total: i64,
}

impl TimeoutElimination {
    /// The `ELIMINATED` reason text for a turn of length `timeout`.
    pub fn reason(timeout: Duration) -> String {
        format!("Timeout - no draw within {}s, -1 point", timeout.as_secs())
    }
}
