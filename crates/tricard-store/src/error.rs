//! Error types for the store.

use crate::{MatchId, PlayerKey};

/// Errors a [`MatchStore`](crate::MatchStore) can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("unknown player id {0}")]
    UnknownPlayer(PlayerKey),

    #[error("unknown match id {0}")]
    UnknownMatch(MatchId),
}
