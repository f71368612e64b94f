//! # Tricard
//!
//! A multiplayer three-card draw game server.
//!
//! Players log in over a WebSocket, gather in rooms of up to six, and take
//! turns drawing until every hand holds three cards. The strongest hand
//! wins the round and the points are settled zero-sum. A player who does
//! not draw within the turn window is eliminated with a one-point penalty.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tricard::prelude::*;
//!
//! # async fn run() -> Result<(), TricardError> {
//! let server = ServerConfig::from_env()?.builder()?.build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{DEFAULT_BIND, ServerConfig};
pub use error::TricardError;
pub use server::{TricardServer, TricardServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{ServerConfig, TricardError, TricardServer, TricardServerBuilder};
    pub use tricard_cards::{Card, Deck, DeckSource, ShuffledDecks};
    pub use tricard_protocol::{Command, Event, RoomName, Username};
    pub use tricard_room::{DeckFactory, RoomConfig};
    pub use tricard_session::{Authenticator, SessionError, StoredAccounts};
    pub use tricard_store::{MatchStore, MemoryStore, Recorder, SqliteStore};
}
