//! Wire protocol for Tricard.
//!
//! Clients speak a delimited text protocol: one command per frame, fields
//! separated by `;` (e.g. `JOIN;Room_1`). The server answers with events
//! whose list payloads use `|` (e.g. `READY_STATUS|alice:true|bob:false|`).
//!
//! The text form only exists at the edge. Incoming frames are parsed once
//! into a [`Command`]; outgoing messages are built as an [`Event`] and
//! rendered with `Display` right before they hit the socket.

mod command;
mod error;
mod event;
mod types;

pub use command::Command;
pub use error::ProtocolError;
pub use event::{
    Event, HandRankEntry, KickBlock, MatchDetail, MatchLine, MatchSummary, PlayerListEntry,
    RankingEntry, RoomListEntry, StartBlock, WinnerOutcome,
};
pub use types::{PlayerStatus, Recipient, RoomName, Username};
