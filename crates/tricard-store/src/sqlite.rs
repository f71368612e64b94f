//! SQLite-backed store.
//!
//! Three tables: `players` holds accounts and cumulative points,
//! `matches` one row per round, `match_results` one row per player per
//! showdown. Timestamps are SQLite's `CURRENT_TIMESTAMP` (UTC).

use std::path::Path;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tricard_protocol::{MatchLine, MatchSummary, Username};

use crate::{Credentials, MatchId, MatchResult, MatchStore, PlayerKey, StoreError};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS players (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        username      TEXT    NOT NULL UNIQUE,
        password_hash TEXT    NOT NULL DEFAULT '',
        total_points  INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS matches (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        player_count INTEGER NOT NULL,
        started_at   TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP,
        ended_at     TEXT,
        winner_id    INTEGER REFERENCES players(id)
    );

    CREATE TABLE IF NOT EXISTS match_results (
        match_id      INTEGER NOT NULL REFERENCES matches(id),
        player_id     INTEGER NOT NULL REFERENCES players(id),
        rank_position INTEGER NOT NULL,
        score         INTEGER NOT NULL,
        hand_type     TEXT    NOT NULL,
        cards         TEXT    NOT NULL,
        PRIMARY KEY (match_id, player_id)
    );
";

const SUMMARY_SELECT: &str = "
    SELECT m.id, m.started_at, m.ended_at, m.player_count, w.username
    FROM matches m
    LEFT JOIN players w ON w.id = m.winner_id";

/// A store backed by one SQLite database.
///
/// # Example
///
/// ```rust
/// use tricard_protocol::Username;
/// use tricard_store::{MatchStore, SqliteStore};
///
/// let mut store = SqliteStore::in_memory()?;
/// let alice = store.ensure_player(&Username::parse("alice")?)?;
/// store.update_points(alice, 2)?;
/// assert_eq!(store.total_points(alice)?, 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and its tables.
    ///
    /// # Errors
    /// [`StoreError::Io`] if the parent directory cannot be created, or
    /// [`StoreError::Sqlite`] if the file is not a usable database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self::with_connection(Connection::open(path)?)?;
        tracing::info!(path = %path.display(), "match store opened");
        Ok(store)
    }

    /// A private database that lives as long as the store.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

impl MatchStore for SqliteStore {
    fn ensure_player(&mut self, username: &Username) -> Result<PlayerKey, StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO players (username) VALUES (?1)",
            params![username.as_str()],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM players WHERE username = ?1",
            params![username.as_str()],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn verify_or_create(
        &mut self,
        username: &Username,
        password_hash: &str,
    ) -> Result<Credentials, StoreError> {
        let stored: Option<(PlayerKey, String)> = self
            .conn
            .query_row(
                "SELECT id, password_hash FROM players WHERE username = ?1",
                params![username.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match stored {
            Some((id, hash)) if hash == password_hash => Ok(Credentials::Verified(id)),
            Some((id, hash)) if hash.is_empty() => {
                self.conn.execute(
                    "UPDATE players SET password_hash = ?1 WHERE id = ?2",
                    params![password_hash, id],
                )?;
                Ok(Credentials::Created(id))
            }
            Some(_) => Ok(Credentials::Mismatch),
            None => {
                let id = self.conn.query_row(
                    "INSERT INTO players (username, password_hash) VALUES (?1, ?2) RETURNING id",
                    params![username.as_str(), password_hash],
                    |row| row.get(0),
                )?;
                Ok(Credentials::Created(id))
            }
        }
    }

    fn player_id(&self, username: &Username) -> Result<Option<PlayerKey>, StoreError> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM players WHERE username = ?1",
                params![username.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn create_match(&mut self, player_count: usize) -> Result<MatchId, StoreError> {
        let id = self.conn.query_row(
            "INSERT INTO matches (player_count) VALUES (?1) RETURNING id",
            params![player_count as i64],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn update_points(&mut self, player: PlayerKey, delta: i64) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE players SET total_points = total_points + ?1 WHERE id = ?2",
            params![delta, player],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownPlayer(player));
        }
        Ok(())
    }

    fn insert_result(&mut self, match_id: MatchId, result: &MatchResult) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO match_results
                 (match_id, player_id, rank_position, score, hand_type, cards)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                match_id,
                result.player,
                result.position,
                result.score,
                result.hand,
                result.cards
            ],
        )?;
        Ok(())
    }

    fn end_match(
        &mut self,
        match_id: MatchId,
        winner: Option<PlayerKey>,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE matches SET ended_at = CURRENT_TIMESTAMP, winner_id = ?1 WHERE id = ?2",
            params![winner, match_id],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownMatch(match_id));
        }
        Ok(())
    }

    fn total_points(&self, player: PlayerKey) -> Result<i64, StoreError> {
        self.conn
            .query_row(
                "SELECT total_points FROM players WHERE id = ?1",
                params![player],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::UnknownPlayer(player))
    }

    fn recent_matches(&self, limit: usize) -> Result<Vec<MatchSummary>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SUMMARY_SELECT} ORDER BY m.id DESC LIMIT ?1"))?;
        let rows = stmt.query_map(params![limit as i64], summary_from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn match_summary(&self, match_id: MatchId) -> Result<Option<MatchSummary>, StoreError> {
        let summary = self
            .conn
            .query_row(
                &format!("{SUMMARY_SELECT} WHERE m.id = ?1"),
                params![match_id],
                summary_from_row,
            )
            .optional()?;
        Ok(summary)
    }

    fn match_lines(&self, match_id: MatchId) -> Result<Vec<MatchLine>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT r.rank_position, p.username, r.hand_type, r.cards
             FROM match_results r
             JOIN players p ON p.id = r.player_id
             WHERE r.match_id = ?1
             ORDER BY r.rank_position",
        )?;
        let rows = stmt.query_map(params![match_id], |row| {
            Ok(MatchLine {
                position: row.get(0)?,
                username: username_at(row, 1)?,
                hand: row.get(2)?,
                cards: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<MatchSummary> {
    let id: MatchId = row.get(0)?;
    let player_count: i64 = row.get(3)?;
    let winner = match row.get::<_, Option<String>>(4)? {
        Some(_) => Some(username_at(row, 4)?),
        None => None,
    };
    Ok(MatchSummary {
        id: id.0,
        started: row.get(1)?,
        ended: row.get(2)?,
        player_count: usize::try_from(player_count).unwrap_or_default(),
        winner,
    })
}

fn username_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Username> {
    let raw: String = row.get(idx)?;
    Username::parse(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// Row ids are SQLite integers; keys keep them unsigned.

fn key_to_sql(id: u64) -> rusqlite::Result<ToSqlOutput<'static>> {
    i64::try_from(id)
        .map(ToSqlOutput::from)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn key_from_sql(value: ValueRef<'_>) -> FromSqlResult<u64> {
    let raw = i64::column_result(value)?;
    u64::try_from(raw).map_err(|_| FromSqlError::OutOfRange(raw))
}

impl ToSql for PlayerKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        key_to_sql(self.0)
    }
}

impl FromSql for PlayerKey {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        key_from_sql(value).map(Self)
    }
}

impl ToSql for MatchId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        key_to_sql(self.0)
    }
}

impl FromSql for MatchId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        key_from_sql(value).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    #[test]
    fn test_verify_or_create_registers_then_checks() {
        let mut store = SqliteStore::in_memory().unwrap();
        let created = store.verify_or_create(&user("alice"), "h1").unwrap();
        let Credentials::Created(id) = created else {
            panic!("expected a new account, got {created:?}");
        };
        assert_eq!(
            store.verify_or_create(&user("alice"), "h1").unwrap(),
            Credentials::Verified(id)
        );
        assert_eq!(
            store.verify_or_create(&user("alice"), "h2").unwrap(),
            Credentials::Mismatch
        );
    }

    #[test]
    fn test_passwordless_row_is_claimed_once() {
        let mut store = SqliteStore::in_memory().unwrap();
        let id = store.ensure_player(&user("bob")).unwrap();
        assert_eq!(
            store.verify_or_create(&user("bob"), "h1").unwrap(),
            Credentials::Created(id)
        );
        assert_eq!(
            store.verify_or_create(&user("bob"), "other").unwrap(),
            Credentials::Mismatch
        );
        assert_eq!(store.ensure_player(&user("bob")).unwrap(), id);
    }

    #[test]
    fn test_unknown_ids_are_rejected() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert!(matches!(
            store.update_points(PlayerKey(9), 1),
            Err(StoreError::UnknownPlayer(PlayerKey(9)))
        ));
        assert!(matches!(
            store.end_match(MatchId(3), None),
            Err(StoreError::UnknownMatch(MatchId(3)))
        ));
        assert!(matches!(
            store.total_points(PlayerKey(9)),
            Err(StoreError::UnknownPlayer(_))
        ));
        let result = MatchResult {
            player: PlayerKey(9),
            position: 1,
            score: 0,
            hand: "HighCard".into(),
            cards: String::new(),
        };
        let id = store.create_match(2).unwrap();
        assert!(matches!(store.insert_result(id, &result), Err(StoreError::Sqlite(_))));
    }

    #[test]
    fn test_match_summary_tracks_lifecycle() {
        let mut store = SqliteStore::in_memory().unwrap();
        let alice = store.ensure_player(&user("alice")).unwrap();
        let id = store.create_match(2).unwrap();

        let open = store.match_summary(id).unwrap().unwrap();
        assert_eq!(open.id, id.0);
        assert_eq!(open.ended, None);
        assert_eq!(open.winner, None);
        assert_eq!(open.started.len(), "2026-10-18 09:00:00".len());

        store.end_match(id, Some(alice)).unwrap();
        let closed = store.match_summary(id).unwrap().unwrap();
        assert!(closed.ended.is_some());
        assert_eq!(closed.winner, Some(user("alice")));
        assert_eq!(store.match_summary(MatchId(99)).unwrap(), None);
    }
}
