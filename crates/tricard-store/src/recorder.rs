//! Non-blocking front end for a [`MatchStore`].
//!
//! Room actors and connection tasks push operations into an unbounded
//! channel and move on. A dedicated OS thread owns the store and applies
//! the operations in order. Failures are logged at `warn` and dropped.
//!
//! ```text
//! room actor ──open_match()──→ ticket ─┐
//! room actor ──finish_match(ticket)────┤   (channel, FIFO)
//! handler    ──update_points()─────────┤
//! handler    ──verify_login()/history()┤ ←── oneshot reply
//!                                      ▼
//!                       worker thread: MatchStore
//! ```
//!
//! A [`MatchTicket`] is handed out immediately. The worker maps it to the
//! store's [`MatchId`] when it processes the open; if that failed, later
//! operations on the ticket are skipped.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, oneshot};
use tricard_protocol::{MatchDetail, MatchSummary, Username};

use crate::{Credentials, MatchId, MatchResult, MatchStore, StoreError};

/// Local handle for a match whose store id may not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchTicket(u64);

/// One player's finishing line, keyed by username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub username: Username,
    pub position: u32,
    pub score: i64,
    pub hand: String,
    pub cards: String,
}

enum Op {
    EnsurePlayer(Username),
    OpenMatch {
        ticket: MatchTicket,
        player_count: usize,
    },
    UpdatePoints {
        username: Username,
        delta: i64,
    },
    FinishMatch {
        ticket: MatchTicket,
        rows: Vec<ResultRow>,
        winner: Option<Username>,
    },
    TotalPoints {
        username: Username,
        reply: oneshot::Sender<Option<i64>>,
    },
    VerifyLogin {
        username: Username,
        password_hash: String,
        reply: oneshot::Sender<Option<Credentials>>,
    },
    History {
        limit: usize,
        reply: oneshot::Sender<Vec<MatchSummary>>,
    },
    HistoryDetail {
        limit: usize,
        reply: oneshot::Sender<Vec<MatchDetail>>,
    },
    MatchDetail {
        match_id: MatchId,
        reply: oneshot::Sender<Option<MatchDetail>>,
    },
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle to the persistence worker.
#[derive(Debug, Clone)]
pub struct Recorder {
    tx: Option<mpsc::UnboundedSender<Op>>,
    tickets: Arc<AtomicU64>,
}

impl std::fmt::Debug for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::EnsurePlayer(_) => "EnsurePlayer",
            Self::OpenMatch { .. } => "OpenMatch",
            Self::UpdatePoints { .. } => "UpdatePoints",
            Self::FinishMatch { .. } => "FinishMatch",
            Self::TotalPoints { .. } => "TotalPoints",
            Self::VerifyLogin { .. } => "VerifyLogin",
            Self::History { .. } => "History",
            Self::HistoryDetail { .. } => "HistoryDetail",
            Self::MatchDetail { .. } => "MatchDetail",
            Self::Flush(_) => "Flush",
        })
    }
}

impl Recorder {
    /// Starts a worker thread that owns `store`.
    ///
    /// The worker exits once every clone of the returned handle is
    /// dropped. If the thread cannot be spawned the recorder runs
    /// disabled.
    pub fn spawn<S: MatchStore>(store: S) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let spawned = std::thread::Builder::new()
            .name("tricard-store".into())
            .spawn(move || Worker::new(store).run(rx));
        match spawned {
            Ok(_) => Self {
                tx: Some(tx),
                tickets: Arc::new(AtomicU64::new(1)),
            },
            Err(error) => {
                tracing::warn!(%error, "could not start store worker, persistence disabled");
                Self::disabled()
            }
        }
    }

    /// A recorder that drops every operation.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            tickets: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    fn send(&self, op: Op) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(rejected) = tx.send(op) {
            tracing::warn!(op = ?rejected.0, "store worker gone, dropping operation");
        }
    }

    /// Creates the player's row if it does not exist yet.
    pub fn ensure_player(&self, username: &Username) {
        self.send(Op::EnsurePlayer(username.clone()));
    }

    /// Queues a new match record and returns its ticket.
    pub fn open_match(&self, player_count: usize) -> MatchTicket {
        let ticket = MatchTicket(self.tickets.fetch_add(1, Ordering::Relaxed));
        self.send(Op::OpenMatch {
            ticket,
            player_count,
        });
        ticket
    }

    pub fn update_points(&self, username: &Username, delta: i64) {
        self.send(Op::UpdatePoints {
            username: username.clone(),
            delta,
        });
    }

    /// Writes the result rows of a match, then closes it.
    pub fn finish_match(&self, ticket: MatchTicket, rows: Vec<ResultRow>, winner: Option<Username>) {
        self.send(Op::FinishMatch {
            ticket,
            rows,
            winner,
        });
    }

    /// The player's stored total. `None` when disabled, unknown, or failed.
    pub async fn total_points(&self, username: &Username) -> Option<i64> {
        let (reply, rx) = oneshot::channel();
        self.send(Op::TotalPoints {
            username: username.clone(),
            reply,
        });
        rx.await.ok().flatten()
    }

    /// Checks a login against the stored accounts, creating the account
    /// on first sight. `None` when the store is disabled or failed.
    pub async fn verify_login(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Option<Credentials> {
        let (reply, rx) = oneshot::channel();
        self.send(Op::VerifyLogin {
            username: username.clone(),
            password_hash: password_hash.to_string(),
            reply,
        });
        rx.await.ok().flatten()
    }

    /// Up to `limit` match summaries, newest first. Empty on failure.
    pub async fn history(&self, limit: usize) -> Vec<MatchSummary> {
        let (reply, rx) = oneshot::channel();
        self.send(Op::History { limit, reply });
        rx.await.unwrap_or_default()
    }

    /// Like [`history`](Self::history), with every match's result lines.
    pub async fn history_detail(&self, limit: usize) -> Vec<MatchDetail> {
        let (reply, rx) = oneshot::channel();
        self.send(Op::HistoryDetail { limit, reply });
        rx.await.unwrap_or_default()
    }

    pub async fn match_detail(&self, match_id: MatchId) -> Option<MatchDetail> {
        let (reply, rx) = oneshot::channel();
        self.send(Op::MatchDetail { match_id, reply });
        rx.await.ok().flatten()
    }

    /// Resolves once every operation queued before it has been applied.
    pub async fn flush(&self) {
        let (reply, rx) = oneshot::channel();
        self.send(Op::Flush(reply));
        let _ = rx.await;
    }
}

struct Worker<S> {
    store: S,
    matches: HashMap<MatchTicket, Option<MatchId>>,
}

impl<S: MatchStore> Worker<S> {
    fn new(store: S) -> Self {
        Self {
            store,
            matches: HashMap::new(),
        }
    }

    fn run(mut self, mut rx: mpsc::UnboundedReceiver<Op>) {
        tracing::debug!("store worker started");
        while let Some(op) = rx.blocking_recv() {
            self.apply(op);
        }
        tracing::debug!("store worker stopped");
    }

    fn apply(&mut self, op: Op) {
        match op {
            Op::EnsurePlayer(username) => {
                if let Err(error) = self.store.ensure_player(&username) {
                    tracing::warn!(player = %username, %error, "ensure_player failed");
                }
            }
            Op::OpenMatch {
                ticket,
                player_count,
            } => {
                let id = match self.store.create_match(player_count) {
                    Ok(id) => Some(id),
                    Err(error) => {
                        tracing::warn!(%error, "create_match failed");
                        None
                    }
                };
                self.matches.insert(ticket, id);
            }
            Op::UpdatePoints { username, delta } => match self.store.player_id(&username) {
                Ok(Some(player)) => {
                    if let Err(error) = self.store.update_points(player, delta) {
                        tracing::warn!(player = %username, delta, %error, "update_points failed");
                    }
                }
                Ok(None) => tracing::debug!(player = %username, "no stored player, points not saved"),
                Err(error) => tracing::warn!(player = %username, %error, "player lookup failed"),
            },
            Op::FinishMatch {
                ticket,
                rows,
                winner,
            } => self.finish(ticket, rows, winner),
            Op::TotalPoints { username, reply } => {
                let total = match self.store.player_id(&username) {
                    Ok(Some(player)) => self.store.total_points(player).ok(),
                    _ => None,
                };
                let _ = reply.send(total);
            }
            Op::VerifyLogin {
                username,
                password_hash,
                reply,
            } => {
                let outcome = match self.store.verify_or_create(&username, &password_hash) {
                    Ok(outcome) => Some(outcome),
                    Err(error) => {
                        tracing::warn!(player = %username, %error, "credential check failed");
                        None
                    }
                };
                let _ = reply.send(outcome);
            }
            Op::History { limit, reply } => {
                let matches = self.store.recent_matches(limit).unwrap_or_else(|error| {
                    tracing::warn!(%error, "history query failed");
                    Vec::new()
                });
                let _ = reply.send(matches);
            }
            Op::HistoryDetail { limit, reply } => {
                let details = self.history_detail(limit).unwrap_or_else(|error| {
                    tracing::warn!(%error, "history detail query failed");
                    Vec::new()
                });
                let _ = reply.send(details);
            }
            Op::MatchDetail { match_id, reply } => {
                let detail = self.detail(match_id).unwrap_or_else(|error| {
                    tracing::warn!(%match_id, %error, "match detail query failed");
                    None
                });
                let _ = reply.send(detail);
            }
            Op::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }

    fn detail(&self, match_id: MatchId) -> Result<Option<MatchDetail>, StoreError> {
        let Some(summary) = self.store.match_summary(match_id)? else {
            return Ok(None);
        };
        let lines = self.store.match_lines(match_id)?;
        Ok(Some(MatchDetail { summary, lines }))
    }

    fn history_detail(&self, limit: usize) -> Result<Vec<MatchDetail>, StoreError> {
        self.store
            .recent_matches(limit)?
            .into_iter()
            .map(|summary| {
                let lines = self.store.match_lines(MatchId(summary.id))?;
                Ok(MatchDetail { summary, lines })
            })
            .collect()
    }

    fn finish(&mut self, ticket: MatchTicket, rows: Vec<ResultRow>, winner: Option<Username>) {
        let Some(Some(match_id)) = self.matches.remove(&ticket) else {
            tracing::debug!(?ticket, "match was never stored, skipping results");
            return;
        };
        for row in rows {
            let player = match self.store.player_id(&row.username) {
                Ok(Some(player)) => player,
                Ok(None) => continue,
                Err(error) => {
                    tracing::warn!(player = %row.username, %error, "player lookup failed");
                    continue;
                }
            };
            let result = MatchResult {
                player,
                position: row.position,
                score: row.score,
                hand: row.hand,
                cards: row.cards,
            };
            if let Err(error) = self.store.insert_result(match_id, &result) {
                tracing::warn!(%match_id, %error, "insert_result failed");
            }
        }
        let winner = winner.and_then(|name| self.store.player_id(&name).ok().flatten());
        if let Err(error) = self.store.end_match(match_id, winner) {
            tracing::warn!(%match_id, %error, "end_match failed");
        }
    }
}
