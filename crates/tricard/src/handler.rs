//! Per-connection handler: login, then command dispatch.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `LOGIN;<user>;<password>` → `LOGIN_OK` or `LOGIN_FAIL`
//!   2. Spawn a writer task that drains the player's event channel
//!   3. Loop: parse frames into commands → dispatch to rooms or answer
//!   4. On `EXIT` or disconnect: leave the current room, go offline

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};
use tricard_protocol::{
    Command, Event, PlayerListEntry, PlayerStatus, RoomListEntry, RoomName, Username,
};
use tricard_room::{PlayerSender, Rejection, RoomError, RoomHandle};
use tricard_session::{Authenticator, SessionError};
use tricard_store::MatchId;
use tricard_transport::{Connection, WebSocketConnection};

use crate::TricardError;
use crate::server::ServerState;

/// How long a fresh connection has to log in.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Matches listed by `GET_HISTORY`.
const HISTORY_LIMIT: usize = 20;
/// Matches expanded by `GET_HISTORY_DETAIL`.
const DETAIL_LIMIT: usize = 10;

/// Drop guard that takes a player offline when the handler exits.
///
/// Runs the same leave path as `LEAVE_ROOM`, even if the handler panics.
/// Since `Drop` is synchronous, the cleanup runs in a spawned task.
struct PresenceGuard<A: Authenticator> {
    username: Username,
    state: Arc<ServerState<A>>,
}

impl<A: Authenticator> Drop for PresenceGuard<A> {
    fn drop(&mut self) {
        let username = self.username.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            disconnect(&state, &username).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A: Authenticator>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A>>,
) -> Result<(), TricardError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    debug!(%conn_id, "handling new connection");

    // --- Step 1: Login ---
    let username = perform_login(&conn, &state).await?;
    let _guard = PresenceGuard {
        username: username.clone(),
        state: Arc::clone(&state),
    };
    conn.send(&Event::LoginOk.to_string()).await?;
    info!(%conn_id, player = %username, "player logged in");

    // --- Step 2: Outbound writer ---
    let (events, outbound) = mpsc::unbounded_channel();
    state.players.attach_mailbox(&username, events.clone());
    let writer = tokio::spawn(write_events(Arc::clone(&conn), outbound));

    // --- Step 3: Command loop ---
    let session = Session {
        state: state.as_ref(),
        username,
        events,
    };
    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!(player = %session.username, "connection closed cleanly");
                break;
            }
            Err(e) => {
                debug!(player = %session.username, error = %e, "recv error");
                break;
            }
        };

        let command: Command = match frame.parse() {
            Ok(command) => command,
            Err(e) => {
                debug!(player = %session.username, error = %e, %frame, "ignoring frame");
                continue;
            }
        };

        if session.dispatch(command).await.is_break() {
            info!(player = %session.username, "client exited");
            break;
        }
    }

    writer.abort();
    if let Err(e) = conn.close().await {
        debug!(%conn_id, error = %e, "close failed");
    }
    // _guard drops here → leave and unregister run.
    Ok(())
}

/// Waits for a successful `LOGIN`. Failed attempts answer `LOGIN_FAIL`
/// and may be retried until the login window closes.
///
/// On success the player is registered online; the caller owns the
/// cleanup from then on.
async fn perform_login<A: Authenticator>(
    conn: &WebSocketConnection,
    state: &ServerState<A>,
) -> Result<Username, TricardError> {
    let deadline = Instant::now() + LOGIN_TIMEOUT;

    loop {
        let frame = match tokio::time::timeout_at(deadline, conn.recv()).await {
            Ok(Ok(Some(frame))) => frame,
            Ok(Ok(None)) => return Err(TricardError::LoginAborted("closed before login")),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(TricardError::LoginAborted("login timed out")),
        };

        match frame.parse::<Command>() {
            Ok(Command::Login { username, password }) => {
                match login(state, &username, &password).await {
                    Ok(()) => return Ok(username),
                    Err(e) => debug!(player = %username, error = %e, "login refused"),
                }
            }
            Ok(other) => debug!(command = other.keyword(), "command before login"),
            Err(e) => debug!(error = %e, %frame, "ignoring frame before login"),
        }
        conn.send(&Event::LoginFail.to_string()).await?;
    }
}

/// Checks credentials, marks the player online and loads their total.
async fn login<A: Authenticator>(
    state: &ServerState<A>,
    username: &Username,
    password: &str,
) -> Result<(), SessionError> {
    state.auth.authenticate(username, password).await?;
    state.players.register(username)?;

    let recorder = state.scores.recorder();
    recorder.ensure_player(username);
    if let Some(total) = recorder.total_points(username).await {
        state.scores.ledger().seed(username, total);
    }
    Ok(())
}

/// Writes the player's events to the socket in order.
async fn write_events(conn: Arc<WebSocketConnection>, mut outbound: mpsc::UnboundedReceiver<Event>) {
    while let Some(event) = outbound.recv().await {
        if let Err(e) = conn.send(&event.to_string()).await {
            debug!(conn_id = %conn.id(), error = %e, "write failed");
            break;
        }
    }
}

/// Leaves the player's room and removes them from the online list.
async fn disconnect<A: Authenticator>(state: &ServerState<A>, username: &Username) {
    if let Err(e) = leave_room(state, username).await {
        debug!(player = %username, error = %e, "leave on disconnect failed");
    }
    state.players.unregister(username);
    info!(player = %username, "player offline");
}

/// The handle of the room `username` is seated in.
async fn current_room<A: Authenticator>(
    state: &ServerState<A>,
    username: &Username,
) -> Option<RoomHandle> {
    let name = state.players.room_of(username)?;
    state.rooms.lock().await.get(&name)
}

/// Shared by `LEAVE_ROOM` and disconnect. Drops the registry entry of a
/// room the leave emptied.
async fn leave_room<A: Authenticator>(
    state: &ServerState<A>,
    username: &Username,
) -> Result<(), RoomError> {
    let Some(handle) = current_room(state, username).await else {
        return Ok(());
    };
    let outcome = handle.leave(username).await?;
    if outcome.room_empty {
        state.rooms.lock().await.remove(&handle);
    }
    Ok(())
}

/// One logged-in player's view of the server.
struct Session<'a, A: Authenticator> {
    state: &'a ServerState<A>,
    username: Username,
    /// Every event for this player goes through here, room events and
    /// direct replies alike, so the writer keeps them in order.
    events: PlayerSender,
}

impl<A: Authenticator> Session<'_, A> {
    fn send(&self, event: Event) {
        // Only fails once the writer is gone, i.e. the connection is closing.
        let _ = self.events.send(event);
    }

    /// Runs one command. Breaks when the connection should close.
    async fn dispatch(&self, command: Command) -> ControlFlow<()> {
        debug!(player = %self.username, command = command.keyword(), "command");
        let result = match command {
            Command::Login { .. } => {
                debug!(player = %self.username, "already logged in");
                Ok(())
            }
            Command::Create => self.create().await,
            Command::Join(room) => self.join(&room).await,
            Command::Ready { room, ready } => match self.lookup(&room).await {
                Ok(handle) => handle.ready(&self.username, ready).await,
                Err(e) => Err(e),
            },
            Command::Start(room) => match self.lookup(&room).await {
                Ok(handle) => handle.start(&self.username).await,
                Err(e) => Err(e),
            },
            Command::Draw(room) => match self.lookup(&room).await {
                Ok(handle) => handle.draw(&self.username).await,
                Err(e) => Err(e),
            },
            Command::KickPlayer(target) => self.kick(&target).await,
            Command::LeaveRoom(_) => leave_room(self.state, &self.username).await,
            Command::GetRoomUpdate(room) => match self.lookup(&room).await {
                Ok(handle) => handle.resync(&self.username).await,
                Err(e) => Err(e),
            },
            Command::GetPlayerList => {
                self.player_list();
                Ok(())
            }
            Command::GetRooms => {
                self.room_list().await;
                Ok(())
            }
            Command::GetHistory => {
                let matches = self.state.scores.recorder().history(HISTORY_LIMIT).await;
                self.send(Event::History(matches));
                Ok(())
            }
            Command::GetHistoryDetail => {
                let matches = self.state.scores.recorder().history_detail(DETAIL_LIMIT).await;
                self.send(Event::HistoryDetail(matches));
                Ok(())
            }
            Command::GetMatchDetail(Some(id)) => {
                let detail = self.state.scores.recorder().match_detail(MatchId(id)).await;
                self.send(Event::MatchDetail(detail));
                Ok(())
            }
            Command::GetMatchDetail(None) => {
                self.send(Event::InvalidMatchId);
                Ok(())
            }
            Command::Invite(target) => {
                self.invite(&target);
                Ok(())
            }
            Command::Exit => return ControlFlow::Break(()),
        };

        if let Err(e) = result {
            self.reject(e);
        }
        ControlFlow::Continue(())
    }

    /// Rejections go back to the player; anything else is logged.
    fn reject(&self, err: RoomError) {
        match err {
            RoomError::Rejected(rejection) => {
                debug!(player = %self.username, %rejection, "command rejected");
                self.send(rejection.into());
            }
            other => debug!(player = %self.username, error = %other, "command dropped"),
        }
    }

    async fn lookup(&self, name: &RoomName) -> Result<RoomHandle, RoomError> {
        let handle = self.state.rooms.lock().await.get(name);
        handle.ok_or_else(|| RoomError::NotFound(name.clone()))
    }

    async fn create(&self) -> Result<(), RoomError> {
        if let Some(room) = self.state.players.room_of(&self.username) {
            debug!(player = %self.username, %room, "create while seated");
            return Err(Rejection::JoinFailed.into());
        }
        let handle = {
            let mut rooms = self.state.rooms.lock().await;
            let name = rooms.create(&self.username, self.events.clone());
            rooms.get(&name)
        };
        // The actor seats its creator before answering anything, so once
        // this returns the next command already sees the player seated.
        if let Some(handle) = handle {
            handle.info().await?;
        }
        Ok(())
    }

    async fn join(&self, name: &RoomName) -> Result<(), RoomError> {
        if self.state.players.room_of(&self.username).is_some() {
            return Err(Rejection::JoinFailed.into());
        }
        let joined = match self.lookup(name).await {
            Ok(handle) => handle.join(&self.username, self.events.clone()).await,
            Err(e) => Err(e),
        };
        match joined {
            Ok(()) => Ok(()),
            Err(RoomError::Rejected(rejection)) => Err(rejection.into()),
            Err(e) => {
                debug!(player = %self.username, room = %name, error = %e, "join failed");
                Err(Rejection::JoinFailed.into())
            }
        }
    }

    async fn kick(&self, target: &Username) -> Result<(), RoomError> {
        match current_room(self.state, &self.username).await {
            Some(handle) => handle.kick(&self.username, target).await,
            None => {
                debug!(player = %self.username, %target, "kick outside a room");
                Ok(())
            }
        }
    }

    /// Sends `INVITE` to a free player, naming the inviter's room.
    fn invite(&self, target: &Username) {
        let players = &self.state.players;
        let Some(room) = players.room_of(&self.username) else {
            debug!(player = %self.username, %target, "invite outside a room");
            return;
        };
        let reason = match players.presence(target) {
            None => "Player is not online",
            Some(presence) if presence.status != PlayerStatus::Free => "Player is busy",
            Some(_) => {
                let invite = Event::Invite {
                    from: self.username.clone(),
                    room,
                };
                if players.send_to(target, invite) {
                    debug!(player = %self.username, %target, "invite sent");
                    return;
                }
                "Player is not online"
            }
        };
        self.send(Event::InviteFail(reason.to_string()));
    }

    fn player_list(&self) {
        let ledger = self.state.scores.ledger();
        let entries = self
            .state
            .players
            .list()
            .into_iter()
            .map(|(username, presence)| PlayerListEntry {
                points: ledger.total(&username),
                username,
                status: presence.status,
            })
            .collect();
        self.send(Event::PlayerList(entries));
    }

    async fn room_list(&self) {
        let handles = self.state.rooms.lock().await.handles();

        let mut entries = Vec::with_capacity(handles.len());
        for handle in &handles {
            if let Ok(info) = handle.info().await {
                entries.push(RoomListEntry {
                    room: info.name,
                    players: info.player_count,
                    max_players: info.max_players,
                });
            }
        }
        self.send(Event::RoomsList(entries));
    }
}
