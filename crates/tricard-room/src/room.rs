//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Commands arrive on a bounded mpsc channel and the turn timer is polled
//! in the same `select!`, so a `DRAW` and a timeout can never interleave.
//! Each transition's events are written to the players' outbound channels
//! only after the transition has finished.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use tricard_protocol::{Event, RoomName, Username};
use tricard_session::PlayerRegistry;

use crate::{Outbox, PresenceChange, Room, RoomError, RoomPhase, RoomSnapshot};

/// Channel sender for delivering outbound events to a player's
/// connection.
pub type PlayerSender = mpsc::UnboundedSender<Event>;

/// Room metadata for lobby listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub name: RoomName,
    pub phase: RoomPhase,
    pub player_count: usize,
    pub max_players: usize,
}

/// What a leave request found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// The player was seated and has been removed.
    pub was_member: bool,
    /// Nobody is left; the actor has stopped.
    pub room_empty: bool,
}

type Reply<T> = oneshot::Sender<T>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        username: Username,
        sender: PlayerSender,
        reply: Reply<Result<(), RoomError>>,
    },
    Leave {
        username: Username,
        reply: Reply<LeaveOutcome>,
    },
    Ready {
        username: Username,
        ready: bool,
        reply: Reply<Result<(), RoomError>>,
    },
    Start {
        username: Username,
        reply: Reply<Result<(), RoomError>>,
    },
    Draw {
        username: Username,
        reply: Reply<Result<(), RoomError>>,
    },
    Kick {
        requester: Username,
        target: Username,
        reply: Reply<Result<(), RoomError>>,
    },
    Resync {
        username: Username,
        reply: Reply<Result<(), RoomError>>,
    },
    Info {
        reply: Reply<RoomInfo>,
    },
    Snapshot {
        reply: Reply<RoomSnapshot>,
    },
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone. Callers clone it out of the registry, release the
/// registry lock, then await the request.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    name: RoomName,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn name(&self) -> &RoomName {
        &self.name
    }

    /// True once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Whether both handles address the same actor. A recycled room name
    /// belongs to a different actor.
    pub fn same_room(&self, other: &RoomHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.name.clone())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Seats a player. Their events go to `sender` from now on.
    pub async fn join(&self, username: &Username, sender: PlayerSender) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Join {
            username: username.clone(),
            sender,
            reply,
        })
        .await?
    }

    /// Removes a player. Leaving a room one is not seated in is a no-op.
    pub async fn leave(&self, username: &Username) -> Result<LeaveOutcome, RoomError> {
        self.request(|reply| RoomCommand::Leave {
            username: username.clone(),
            reply,
        })
        .await
    }

    pub async fn ready(&self, username: &Username, ready: bool) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Ready {
            username: username.clone(),
            ready,
            reply,
        })
        .await?
    }

    pub async fn start(&self, username: &Username) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start {
            username: username.clone(),
            reply,
        })
        .await?
    }

    pub async fn draw(&self, username: &Username) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Draw {
            username: username.clone(),
            reply,
        })
        .await?
    }

    pub async fn kick(&self, requester: &Username, target: &Username) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Kick {
            requester: requester.clone(),
            target: target.clone(),
            reply,
        })
        .await?
    }

    /// Unicasts the roster and ready snapshot to `username`.
    pub async fn resync(&self, username: &Username) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Resync {
            username: username.clone(),
            reply,
        })
        .await?
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::Info { reply }).await
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct RoomActor {
    room: Room,
    /// Outbound channels of seated players, plus anyone removed by the
    /// transition being delivered.
    senders: HashMap<Username, PlayerSender>,
    players: Arc<PlayerRegistry>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self, creator: Username, sender: PlayerSender) {
        info!(room = %self.room.name(), "room actor started");
        if let Err(e) = self.handle_join(creator, sender) {
            warn!(room = %self.room.name(), error = %e, "creator could not be seated");
        }

        while !self.room.is_empty() {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                expiry = self.room.timer_mut().expired() => {
                    if let Some((eliminated, out)) = self.room.on_turn_timeout(expiry) {
                        debug!(
                            room = %self.room.name(),
                            player = %eliminated.username,
                            seat = eliminated.seat,
                            "timeout delivered"
                        );
                        self.deliver(out);
                    }
                }
            }
        }

        self.room.shutdown();
        info!(room = %self.room.name(), "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { username, sender, reply } => {
                let _ = reply.send(self.handle_join(username, sender));
            }
            RoomCommand::Leave { username, reply } => {
                let was_member = match self.room.leave(&username) {
                    Some(out) => {
                        self.deliver(out);
                        true
                    }
                    None => false,
                };
                let _ = reply.send(LeaveOutcome {
                    was_member,
                    room_empty: self.room.is_empty(),
                });
            }
            RoomCommand::Ready { username, ready, reply } => {
                let result = self.room.set_ready(&username, ready);
                let _ = reply.send(self.complete(result));
            }
            RoomCommand::Start { username, reply } => {
                let result = self.room.start(&username);
                let _ = reply.send(self.complete(result));
            }
            RoomCommand::Draw { username, reply } => {
                let result = self.room.draw(&username);
                let _ = reply.send(self.complete(result));
            }
            RoomCommand::Kick { requester, target, reply } => {
                let result = self.room.kick(&requester, &target);
                let _ = reply.send(self.complete(result));
            }
            RoomCommand::Resync { username, reply } => {
                let result = self.room.resync(&username);
                let _ = reply.send(self.complete(result));
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.room.info());
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.room.snapshot());
            }
        }
    }

    fn handle_join(&mut self, username: Username, sender: PlayerSender) -> Result<(), RoomError> {
        let out = self.room.join(&username)?;
        self.senders.insert(username, sender);
        self.deliver(out);
        Ok(())
    }

    fn complete(&mut self, result: Result<Outbox, RoomError>) -> Result<(), RoomError> {
        result.map(|out| self.deliver(out))
    }

    /// Applies presence changes, writes every event, then forgets the
    /// channels of players who are no longer seated.
    fn deliver(&mut self, out: Outbox) {
        let name = self.room.name().clone();
        for change in out.presence_changes() {
            match change {
                PresenceChange::Seated(username) => {
                    if let Err(e) = self.players.seat(username, &name) {
                        debug!(room = %name, player = %username, error = %e, "presence not updated");
                    }
                }
                PresenceChange::Status(username, status) => {
                    self.players.set_status(username, &name, *status);
                }
                PresenceChange::Unseated(username) => {
                    self.players.unseat(username, &name);
                }
            }
        }

        let members = self.room.members();
        for (target, event) in out.resolve(&members) {
            if let Some(sender) = self.senders.get(target) {
                // A closed channel means the connection is going away; its
                // leave is already queued.
                let _ = sender.send(event.clone());
            }
        }
        self.senders.retain(|username, _| members.contains(username));
    }
}

/// Spawns a room actor with `creator` already seated.
pub(crate) fn spawn_room(
    room: Room,
    players: Arc<PlayerRegistry>,
    creator: Username,
    sender: PlayerSender,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let handle = RoomHandle {
        name: room.name().clone(),
        sender: tx,
    };
    let actor = RoomActor {
        room,
        senders: HashMap::new(),
        players,
        receiver: rx,
    };
    tokio::spawn(actor.run(creator, sender));
    handle
}
