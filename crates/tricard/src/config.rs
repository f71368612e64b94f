//! Server settings, read from the environment by the binary.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tricard_room::RoomConfig;
use tricard_store::SqliteStore;

use crate::{TricardError, TricardServerBuilder};

/// Address the server binds to when `TRICARD_BIND` is unset.
pub const DEFAULT_BIND: &str = "127.0.0.1:7777";

const BIND_VAR: &str = "TRICARD_BIND";
const TURN_TIMEOUT_VAR: &str = "TRICARD_TURN_TIMEOUT_SECS";
const STORE_VAR: &str = "TRICARD_STORE";

/// Everything needed to start a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub room: RoomConfig,
    /// SQLite database file. Accounts and matches are kept in memory
    /// when unset.
    pub store_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            room: RoomConfig::default(),
            store_path: None,
        }
    }
}

impl ServerConfig {
    /// Reads `TRICARD_BIND`, `TRICARD_TURN_TIMEOUT_SECS` and
    /// `TRICARD_STORE`. Unset or empty variables keep their defaults.
    pub fn from_env() -> Result<Self, TricardError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TricardError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(bind) = var(BIND_VAR) {
            config.bind = bind;
        }
        if let Some(secs) = var(TURN_TIMEOUT_VAR) {
            let secs: u64 = match secs.parse() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(TricardError::Config {
                        key: TURN_TIMEOUT_VAR,
                        value: secs,
                    });
                }
            };
            config.room.turn_timeout = Duration::from_secs(secs);
        }
        config.store_path = var(STORE_VAR).map(PathBuf::from);
        Ok(config)
    }

    /// A server builder with these settings and the matching store.
    pub fn builder(&self) -> Result<TricardServerBuilder, TricardError> {
        let mut builder = TricardServerBuilder::new()
            .bind(&self.bind)
            .room_config(self.room.clone());
        if let Some(path) = &self.store_path {
            builder = builder.store(SqliteStore::open(path)?);
        }
        Ok(builder)
    }
}
