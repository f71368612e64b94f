//! Outbound events.
//!
//! `Display` renders the exact wire text. List payloads terminate every
//! entry with `|`, so an empty list renders as just the header and a
//! trailing `|`.

use std::fmt;

use tricard_cards::{Card, HandCategory};

use crate::{PlayerStatus, RoomName, Username};

/// Why a kick was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickBlock {
    GameRunning,
    PlayerNotFound,
    CannotKickSelf,
}

impl KickBlock {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GameRunning => "GAME_RUNNING",
            Self::PlayerNotFound => "PLAYER_NOT_FOUND",
            Self::CannotKickSelf => "CANNOT_KICK_SELF",
        }
    }
}

/// Why a start was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartBlock {
    NotEnoughPlayers,
    NotAllReady,
    GameRunning,
}

impl StartBlock {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotEnoughPlayers => "NOT_ENOUGH_PLAYERS",
            Self::NotAllReady => "NOT_ALL_READY",
            Self::GameRunning => "GAME_RUNNING",
        }
    }
}

/// One `HAND_RANKS` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandRankEntry {
    pub username: Username,
    pub category: HandCategory,
    /// Modulo points for HighCard, composite score otherwise.
    pub score: i64,
}

/// One `RANKING` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingEntry {
    pub username: Username,
    /// Ledger total after this round's delta.
    pub total: i64,
    pub delta: i64,
}

/// One `PLAYER_LIST` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerListEntry {
    pub username: Username,
    pub status: PlayerStatus,
    pub points: i64,
}

/// One `ROOMS_LIST` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomListEntry {
    pub room: RoomName,
    pub players: usize,
    pub max_players: usize,
}

/// One finished or running match, as listed by `HISTORY_DATA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSummary {
    pub id: u64,
    /// UTC timestamp, `YYYY-MM-DD HH:MM:SS`.
    pub started: String,
    /// `None` while the match is still open.
    pub ended: Option<String>,
    pub player_count: usize,
    pub winner: Option<Username>,
}

/// One player's finishing line in a stored match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLine {
    pub position: u32,
    pub username: Username,
    /// Category name, e.g. `Straight`.
    pub hand: String,
    /// Cards as shown on the wire, e.g. `K♠,Q♠,J♠`.
    pub cards: String,
}

/// A match header and its result lines, best first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDetail {
    pub summary: MatchSummary,
    pub lines: Vec<MatchLine>,
}

/// How a round's winner was decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WinnerOutcome {
    /// Won the showdown. `points` is set for HighCard wins.
    Showdown {
        category: HandCategory,
        points: Option<u8>,
    },
    /// Last player standing after every opponent was eliminated.
    Walkover,
}

/// Every event the server sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    LoginOk,
    LoginFail,
    RoomCreated(RoomName),
    JoinOk(RoomName),
    JoinFail,
    RoomFull,
    /// Full roster snapshot in seating order.
    RoomUpdate {
        room: RoomName,
        host_index: usize,
        players: Vec<Username>,
    },
    /// Full ready-flag snapshot in seating order.
    ReadyStatus(Vec<(Username, bool)>),
    YouAreHost,
    GameStart(RoomName),
    YourTurn,
    Wait,
    /// Private: the card just drawn.
    Draw(Card),
    ShowHands(Vec<(Username, Vec<Card>)>),
    HandRanks(Vec<HandRankEntry>),
    Winner {
        username: Username,
        outcome: WinnerOutcome,
    },
    Ranking(Vec<RankingEntry>),
    End(RoomName),
    Eliminated(String),
    Kicked(String),
    NotHost,
    NotYourTurn,
    KickBlocked(KickBlock),
    StartBlocked(StartBlock),
    PlayerList(Vec<PlayerListEntry>),
    RoomsList(Vec<RoomListEntry>),
    /// Most recent matches first.
    History(Vec<MatchSummary>),
    /// Most recent matches first, each with its result lines.
    HistoryDetail(Vec<MatchDetail>),
    /// `None` when no such match is stored.
    MatchDetail(Option<MatchDetail>),
    /// `GET_MATCH_DETAIL` named something that is not a match id.
    InvalidMatchId,
    /// Sent to the invited player.
    Invite { from: Username, room: RoomName },
    InviteFail(String),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginOk => f.write_str("LOGIN_OK"),
            Self::LoginFail => f.write_str("LOGIN_FAIL"),
            Self::RoomCreated(room) => write!(f, "ROOM_CREATED;{room}"),
            Self::JoinOk(room) => write!(f, "JOIN_OK;{room}"),
            Self::JoinFail => f.write_str("JOIN_FAIL"),
            Self::RoomFull => f.write_str("ROOM_FULL"),
            Self::RoomUpdate { room, host_index, players } => {
                write!(f, "ROOM_UPDATE|{room}|{host_index}|")?;
                write_joined(f, players, ",")
            }
            Self::ReadyStatus(flags) => {
                f.write_str("READY_STATUS|")?;
                for (user, ready) in flags {
                    write!(f, "{user}:{ready}|")?;
                }
                Ok(())
            }
            Self::YouAreHost => f.write_str("YOU_ARE_HOST"),
            Self::GameStart(room) => write!(f, "GAME_START;{room}"),
            Self::YourTurn => f.write_str("YOUR_TURN"),
            Self::Wait => f.write_str("WAIT"),
            Self::Draw(card) => write!(f, "DRAW;{card}"),
            Self::ShowHands(hands) => {
                f.write_str("SHOW_HANDS_ALL|")?;
                for (user, cards) in hands {
                    write!(f, "{user}=")?;
                    write_joined(f, cards, ",")?;
                    f.write_str("|")?;
                }
                Ok(())
            }
            Self::HandRanks(entries) => {
                f.write_str("HAND_RANKS|")?;
                for e in entries {
                    write!(
                        f,
                        "{}:{}:{}:{}|",
                        e.username,
                        e.category.value(),
                        e.category.name(),
                        e.score
                    )?;
                }
                Ok(())
            }
            Self::Winner { username, outcome } => match outcome {
                WinnerOutcome::Showdown { category, points: Some(points) } => {
                    write!(f, "WINNER {username} hand={category} points={points}")
                }
                WinnerOutcome::Showdown { category, points: None } => {
                    write!(f, "WINNER {username} hand={category}")
                }
                WinnerOutcome::Walkover => write!(f, "WINNER {username} walkover"),
            },
            Self::Ranking(entries) => {
                f.write_str("RANKING|")?;
                for e in entries {
                    write!(f, "{}:{}:{:+}|", e.username, e.total, e.delta)?;
                }
                Ok(())
            }
            Self::End(room) => write!(f, "END;{room}"),
            Self::Eliminated(reason) => write!(f, "ELIMINATED;{reason}"),
            Self::Kicked(reason) => write!(f, "KICKED;{reason}"),
            Self::NotHost => f.write_str("NOT_HOST"),
            Self::NotYourTurn => f.write_str("NOT_YOUR_TURN"),
            Self::KickBlocked(reason) => write!(f, "KICK_BLOCKED;{}", reason.as_str()),
            Self::StartBlocked(reason) => write!(f, "START_BLOCKED;{}", reason.as_str()),
            Self::PlayerList(entries) => {
                f.write_str("PLAYER_LIST|")?;
                for e in entries {
                    write!(f, "{}:{}:{}|", e.username, e.status, e.points)?;
                }
                Ok(())
            }
            Self::RoomsList(entries) => {
                f.write_str("ROOMS_LIST|")?;
                for e in entries {
                    write!(f, "{}:{}/{}|", e.room, e.players, e.max_players)?;
                }
                Ok(())
            }
            Self::History(matches) => {
                f.write_str("HISTORY_DATA|")?;
                for m in matches {
                    write_summary(f, m)?;
                }
                Ok(())
            }
            Self::HistoryDetail(matches) => {
                f.write_str("HISTORY_DETAIL_DATA|")?;
                for m in matches {
                    write_detail(f, m)?;
                    f.write_str("\n")?;
                }
                Ok(())
            }
            Self::MatchDetail(detail) => {
                f.write_str("MATCH_DETAIL_DATA|")?;
                match detail {
                    Some(detail) => write_detail(f, detail),
                    None => Ok(()),
                }
            }
            Self::InvalidMatchId => f.write_str("MATCH_DETAIL_DATA|ERROR Invalid MatchID"),
            Self::Invite { from, room } => write!(f, "INVITE;{from};{room}"),
            Self::InviteFail(reason) => write!(f, "INVITE_FAIL;{reason}"),
        }
    }
}

/// `id|started|ended|players|winner`, one line. Missing values render
/// as `N/A`.
fn write_summary(f: &mut fmt::Formatter<'_>, m: &MatchSummary) -> fmt::Result {
    write!(
        f,
        "{}|{}|{}|{}|",
        m.id,
        m.started,
        m.ended.as_deref().unwrap_or("N/A"),
        m.player_count
    )?;
    match &m.winner {
        Some(winner) => writeln!(f, "{winner}"),
        None => writeln!(f, "N/A"),
    }
}

fn write_detail(f: &mut fmt::Formatter<'_>, detail: &MatchDetail) -> fmt::Result {
    f.write_str("MATCH|")?;
    write_summary(f, &detail.summary)?;
    for line in &detail.lines {
        writeln!(
            f,
            "RESULT|{}|{}|{}|{}",
            line.position, line.username, line.hand, line.cards
        )?;
    }
    Ok(())
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    sep: &str,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
