//! Match persistence for Tricard.
//!
//! The game never depends on storage: every write is best-effort and a
//! failing store only produces log lines. The pieces:
//!
//! - [`MatchStore`]: the synchronous collaborator contract (accounts,
//!   points, matches, per-player results, history queries)
//! - [`SqliteStore`]: the production store, one SQLite database file
//! - [`MemoryStore`]: in-process tables, shareable for inspection in tests
//! - [`Recorder`]: a worker thread that owns a store and applies
//!   operations queued from async code, so a room never waits on disk

mod error;
mod memory;
mod recorder;
mod sqlite;

pub use error::StoreError;
pub use memory::{MatchRow, MemoryStore, PlayerRow};
pub use recorder::{MatchTicket, Recorder, ResultRow};
pub use sqlite::SqliteStore;

use std::fmt;

use tricard_protocol::{MatchLine, MatchSummary, Username};

/// Store-assigned id of a player row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerKey(pub u64);

/// Store-assigned id of a match row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchId(pub u64);

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One player's line in a finished match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub player: PlayerKey,
    /// 1-based finishing position.
    pub position: u32,
    /// Hand score: modulo points for HighCard, composite score otherwise.
    pub score: i64,
    /// Category name, e.g. `Straight`.
    pub hand: String,
    /// Cards as shown on the wire, e.g. `K♠,Q♠,J♠`.
    pub cards: String,
}

/// Outcome of checking a login against the stored accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials {
    /// The stored hash matched.
    Verified(PlayerKey),
    /// No usable account existed; it now holds the given hash. A row
    /// created without a password is claimed this way too.
    Created(PlayerKey),
    /// The account exists with a different password.
    Mismatch,
}

/// The persistence contract the game server needs.
///
/// Methods are synchronous and take `&mut self` for writes: a store is
/// owned by a single [`Recorder`] worker thread and never shared.
pub trait MatchStore: Send + 'static {
    /// Returns the player's id, creating a row without a password on
    /// first sight.
    fn ensure_player(&mut self, username: &Username) -> Result<PlayerKey, StoreError>;

    /// Checks `password_hash` against the player's account, creating the
    /// account if there is none.
    fn verify_or_create(
        &mut self,
        username: &Username,
        password_hash: &str,
    ) -> Result<Credentials, StoreError>;

    /// Looks up a player's id.
    fn player_id(&self, username: &Username) -> Result<Option<PlayerKey>, StoreError>;

    /// Opens a match record for `player_count` participants.
    fn create_match(&mut self, player_count: usize) -> Result<MatchId, StoreError>;

    /// Adds `delta` to the player's stored total.
    fn update_points(&mut self, player: PlayerKey, delta: i64) -> Result<(), StoreError>;

    fn insert_result(&mut self, match_id: MatchId, result: &MatchResult) -> Result<(), StoreError>;

    /// Closes a match, recording the winner if there was one.
    fn end_match(&mut self, match_id: MatchId, winner: Option<PlayerKey>)
    -> Result<(), StoreError>;

    /// The player's stored total.
    fn total_points(&self, player: PlayerKey) -> Result<i64, StoreError>;

    /// Up to `limit` matches, newest first.
    fn recent_matches(&self, limit: usize) -> Result<Vec<MatchSummary>, StoreError>;

    fn match_summary(&self, match_id: MatchId) -> Result<Option<MatchSummary>, StoreError>;

    /// Result lines of a match ordered by finishing position.
    fn match_lines(&self, match_id: MatchId) -> Result<Vec<MatchLine>, StoreError>;
}
