//! `TricardServer` builder and server loop.
//!
//! This is the entry point for running a Tricard game server. It ties
//! together all the layers: transport → protocol → session → room.

use std::sync::Arc;

use tokio::sync::Mutex;
use tricard_room::{DeckFactory, RoomConfig, RoomRegistry, ScoreLedger, ScoreManager};
use tricard_session::{Authenticator, PlayerRegistry, StoredAccounts};
use tricard_store::{MatchStore, MemoryStore, Recorder};
use tricard_transport::{Transport, WebSocketTransport};

use crate::TricardError;
use crate::config::DEFAULT_BIND;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// The registry mutex is only held to create, look up or drop a room
/// handle. Presence and scores carry their own leaf locks.
pub(crate) struct ServerState<A: Authenticator> {
    pub(crate) rooms: Mutex<RoomRegistry>,
    pub(crate) players: Arc<PlayerRegistry>,
    pub(crate) scores: ScoreManager,
    pub(crate) auth: A,
}

/// Builder for configuring and starting a Tricard server.
///
/// # Example
///
/// ```rust,no_run
/// use tricard::prelude::*;
///
/// # async fn run() -> Result<(), TricardError> {
/// let server = TricardServer::builder()
///     .bind("0.0.0.0:7777")
///     .store(SqliteStore::open("tricard.db")?)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct TricardServerBuilder<A = StoredAccounts> {
    bind_addr: String,
    room_config: RoomConfig,
    auth: A,
    recorder: Recorder,
    decks: Option<DeckFactory>,
}

impl TricardServerBuilder {
    /// Creates a new builder with default settings. Accounts and matches
    /// live in a [`MemoryStore`] until [`store()`](Self::store) is called.
    pub fn new() -> Self {
        Self::with_recorder(Recorder::spawn(MemoryStore::new()))
    }

    fn with_recorder(recorder: Recorder) -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            room_config: RoomConfig::default(),
            auth: StoredAccounts::new(recorder.clone()),
            recorder,
            decks: None,
        }
    }

    /// Persists accounts, points and matches to `store` on a worker
    /// thread. Logins are checked against the accounts in `store`.
    pub fn store(self, store: impl MatchStore) -> Self {
        Self {
            bind_addr: self.bind_addr,
            room_config: self.room_config,
            decks: self.decks,
            ..Self::with_recorder(Recorder::spawn(store))
        }
    }
}

impl Default for TricardServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Authenticator> TricardServerBuilder<A> {
    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Replaces the credential check run at login. Call after
    /// [`store()`](TricardServerBuilder::store), which restores the
    /// store-backed accounts.
    pub fn authenticator<B: Authenticator>(self, auth: B) -> TricardServerBuilder<B> {
        TricardServerBuilder {
            bind_addr: self.bind_addr,
            room_config: self.room_config,
            auth,
            recorder: self.recorder,
            decks: self.decks,
        }
    }

    /// Sets where new rooms get their decks. Rooms shuffle a fresh deck
    /// per round by default.
    pub fn decks(mut self, decks: DeckFactory) -> Self {
        self.decks = Some(decks);
        self
    }

    /// Binds the listener and assembles the shared state.
    pub async fn build(self) -> Result<TricardServer<A>, TricardError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let scores = ScoreManager::new(Arc::new(ScoreLedger::new()), self.recorder);
        let players = Arc::new(PlayerRegistry::new());
        let mut rooms = RoomRegistry::new(self.room_config, Arc::clone(&players), scores.clone());
        if let Some(decks) = self.decks {
            rooms = rooms.with_decks(decks);
        }

        let state = Arc::new(ServerState {
            rooms: Mutex::new(rooms),
            players,
            scores,
            auth: self.auth,
        });

        Ok(TricardServer { transport, state })
    }
}

/// A Tricard game server bound to its address.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TricardServer<A: Authenticator = StoredAccounts> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A>>,
}

impl TricardServer {
    /// Creates a new builder.
    pub fn builder() -> TricardServerBuilder {
        TricardServerBuilder::new()
    }
}

impl<A: Authenticator> TricardServer<A> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The persistence worker behind this server.
    pub fn recorder(&self) -> &Recorder {
        self.state.scores.recorder()
    }

    /// Cumulative points of every player seen since start.
    pub fn ledger(&self) -> &Arc<ScoreLedger> {
        self.state.scores.ledger()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), TricardError> {
        tracing::info!("Tricard server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
