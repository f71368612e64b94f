//! Runs a Tricard server configured from the environment.
//!
//! - `TRICARD_BIND`: listen address (default `127.0.0.1:7777`)
//! - `TRICARD_TURN_TIMEOUT_SECS`: seconds a player has to draw
//! - `TRICARD_STORE`: SQLite database for accounts and matches; both stay
//!   in memory when unset
//! - `RUST_LOG`: log filter (default `info`)

use tracing_subscriber::EnvFilter;
use tricard::prelude::*;

#[tokio::main]
async fn main() -> Result<(), TricardError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        bind = %config.bind,
        turn_timeout_secs = config.room.turn_timeout.as_secs(),
        store = ?config.store_path,
        "starting tricard server"
    );

    let server = config.builder()?.build().await?;
    server.run().await
}
