//! The room engine for Tricard.
//!
//! Each room runs as an isolated Tokio task (actor model). The actor owns
//! a synchronous [`Room`] state machine plus its [`TurnTimer`] and
//! processes player commands and timer expiries one at a time.
//!
//! # Key types
//!
//! - [`Room`]: start/draw/end sequencing over the pieces below
//! - [`Roster`]: seating order, host, ready flags, capacity
//! - [`TurnManager`]: backward turn rotation plus the turn timer
//! - [`ScoreLedger`] / [`ScoreManager`]: zero-sum settlement
//! - [`kick`]: host kicks and timeout elimination
//! - [`broadcast`]: outbound event builders and the [`Outbox`]
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomRegistry`]: creates rooms and hands out their names
//!
//! [`TurnTimer`]: tricard_timer::TurnTimer

pub mod broadcast;
mod config;
mod error;
mod flow;
pub mod kick;
mod manager;
mod room;
mod roster;
mod round;
mod score;
mod turn;

pub use broadcast::{Outbox, PresenceChange};
pub use config::{RoomConfig, RoomPhase};
pub use error::{Rejection, RoomError};
pub use flow::{Room, RoomSnapshot};
pub use manager::{DeckFactory, RoomRegistry};
pub use room::{LeaveOutcome, PlayerSender, RoomHandle, RoomInfo};
pub use roster::{Removal, Roster};
pub use round::Round;
pub use score::{ScoreLedger, ScoreManager, Settlement};
pub use turn::TurnManager;
