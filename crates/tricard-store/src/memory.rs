//! In-process store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tricard_protocol::{MatchLine, MatchSummary, Username};

use crate::{Credentials, MatchId, MatchResult, MatchStore, PlayerKey, StoreError};

/// A stored player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRow {
    pub id: PlayerKey,
    pub username: Username,
    /// Empty until the player logs in through the store.
    pub password_hash: String,
    pub points: i64,
}

/// A stored match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRow {
    pub id: MatchId,
    pub player_count: usize,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub winner: Option<PlayerKey>,
    pub results: Vec<MatchResult>,
}

impl MatchRow {
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

#[derive(Debug, Default)]
struct Tables {
    players: BTreeMap<PlayerKey, PlayerRow>,
    by_name: HashMap<Username, PlayerKey>,
    matches: BTreeMap<MatchId, MatchRow>,
    last_player: u64,
    last_match: u64,
}

impl Tables {
    fn insert_player(&mut self, username: &Username, password_hash: &str) -> PlayerKey {
        self.last_player += 1;
        let id = PlayerKey(self.last_player);
        self.players.insert(
            id,
            PlayerRow {
                id,
                username: username.clone(),
                password_hash: password_hash.to_string(),
                points: 0,
            },
        );
        self.by_name.insert(username.clone(), id);
        id
    }

    fn player_mut(&mut self, id: PlayerKey) -> Result<&mut PlayerRow, StoreError> {
        self.players.get_mut(&id).ok_or(StoreError::UnknownPlayer(id))
    }

    fn summary(&self, row: &MatchRow) -> MatchSummary {
        MatchSummary {
            id: row.id.0,
            started: row.started_at.clone(),
            ended: row.ended_at.clone(),
            player_count: row.player_count,
            winner: row
                .winner
                .and_then(|id| self.players.get(&id))
                .map(|p| p.username.clone()),
        }
    }
}

fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Tables held in memory for the life of the process.
///
/// Clones share the same tables, so a test can hand one clone to a
/// [`Recorder`](crate::Recorder) and inspect the rows through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn players(&self) -> Vec<PlayerRow> {
        self.lock().players.values().cloned().collect()
    }

    pub fn matches(&self) -> Vec<MatchRow> {
        self.lock().matches.values().cloned().collect()
    }

    /// Stored total for `username`, if the player row exists.
    pub fn points_of(&self, username: &Username) -> Option<i64> {
        let tables = self.lock();
        let id = tables.by_name.get(username)?;
        tables.players.get(id).map(|p| p.points)
    }
}

impl MatchStore for MemoryStore {
    fn ensure_player(&mut self, username: &Username) -> Result<PlayerKey, StoreError> {
        let mut tables = self.lock();
        match tables.by_name.get(username) {
            Some(id) => Ok(*id),
            None => Ok(tables.insert_player(username, "")),
        }
    }

    fn verify_or_create(
        &mut self,
        username: &Username,
        password_hash: &str,
    ) -> Result<Credentials, StoreError> {
        let mut tables = self.lock();
        let Some(id) = tables.by_name.get(username).copied() else {
            return Ok(Credentials::Created(tables.insert_player(username, password_hash)));
        };
        let row = tables.player_mut(id)?;
        if row.password_hash == password_hash {
            Ok(Credentials::Verified(id))
        } else if row.password_hash.is_empty() {
            row.password_hash = password_hash.to_string();
            Ok(Credentials::Created(id))
        } else {
            Ok(Credentials::Mismatch)
        }
    }

    fn player_id(&self, username: &Username) -> Result<Option<PlayerKey>, StoreError> {
        Ok(self.lock().by_name.get(username).copied())
    }

    fn create_match(&mut self, player_count: usize) -> Result<MatchId, StoreError> {
        let mut tables = self.lock();
        tables.last_match += 1;
        let id = MatchId(tables.last_match);
        tables.matches.insert(
            id,
            MatchRow {
                id,
                player_count,
                started_at: now(),
                ended_at: None,
                winner: None,
                results: Vec::new(),
            },
        );
        Ok(id)
    }

    fn update_points(&mut self, player: PlayerKey, delta: i64) -> Result<(), StoreError> {
        self.lock().player_mut(player)?.points += delta;
        Ok(())
    }

    fn insert_result(&mut self, match_id: MatchId, result: &MatchResult) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables.players.contains_key(&result.player) {
            return Err(StoreError::UnknownPlayer(result.player));
        }
        let row = tables
            .matches
            .get_mut(&match_id)
            .ok_or(StoreError::UnknownMatch(match_id))?;
        row.results.push(result.clone());
        Ok(())
    }

    fn end_match(
        &mut self,
        match_id: MatchId,
        winner: Option<PlayerKey>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if let Some(winner) = winner.filter(|w| !tables.players.contains_key(w)) {
            return Err(StoreError::UnknownPlayer(winner));
        }
        let row = tables
            .matches
            .get_mut(&match_id)
            .ok_or(StoreError::UnknownMatch(match_id))?;
        row.ended_at = Some(now());
        row.winner = winner;
        Ok(())
    }

    fn total_points(&self, player: PlayerKey) -> Result<i64, StoreError> {
        self.lock()
            .players
            .get(&player)
            .map(|p| p.points)
            .ok_or(StoreError::UnknownPlayer(player))
    }

    fn recent_matches(&self, limit: usize) -> Result<Vec<MatchSummary>, StoreError> {
        let tables = self.lock();
        Ok(tables
            .matches
            .values()
            .rev()
            .take(limit)
            .map(|row| tables.summary(row))
            .collect())
    }

    fn match_summary(&self, match_id: MatchId) -> Result<Option<MatchSummary>, StoreError> {
        let tables = self.lock();
        Ok(tables.matches.get(&match_id).map(|row| tables.summary(row)))
    }

    fn match_lines(&self, match_id: MatchId) -> Result<Vec<MatchLine>, StoreError> {
        let tables = self.lock();
        let Some(row) = tables.matches.get(&match_id) else {
            return Ok(Vec::new());
        };
        let mut lines: Vec<MatchLine> = row
            .results
            .iter()
            .filter_map(|r| {
                let player = tables.players.get(&r.player)?;
                Some(MatchLine {
                    position: r.position,
                    username: player.username.clone(),
                    hand: r.hand.clone(),
                    cards: r.cards.clone(),
                })
            })
            .collect();
        lines.sort_by_key(|line| line.position);
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    #[test]
    fn test_ensure_player_is_idempotent() {
        let mut store = MemoryStore::new();
        let first = store.ensure_player(&user("alice")).unwrap();
        let again = store.ensure_player(&user("alice")).unwrap();
        let other = store.ensure_player(&user("bob")).unwrap();
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(store.player_id(&user("carol")).unwrap(), None);
    }

    #[test]
    fn test_points_accumulate() {
        let mut store = MemoryStore::new();
        let alice = store.ensure_player(&user("alice")).unwrap();
        store.update_points(alice, 2).unwrap();
        store.update_points(alice, -1).unwrap();
        assert_eq!(store.total_points(alice).unwrap(), 1);
        assert_eq!(store.points_of(&user("alice")), Some(1));
    }

    #[test]
    fn test_credentials_match_the_sqlite_rules() {
        let mut store = MemoryStore::new();
        let Credentials::Created(id) = store.verify_or_create(&user("alice"), "h1").unwrap()
        else {
            panic!("first login should create the account");
        };
        assert_eq!(
            store.verify_or_create(&user("alice"), "h1").unwrap(),
            Credentials::Verified(id)
        );
        assert_eq!(
            store.verify_or_create(&user("alice"), "h2").unwrap(),
            Credentials::Mismatch
        );
        assert_eq!(store.players()[0].password_hash, "h1");
    }

    #[test]
    fn test_unknown_ids_are_rejected() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.update_points(PlayerKey(9), 1),
            Err(StoreError::UnknownPlayer(PlayerKey(9)))
        ));
        assert!(matches!(
            store.end_match(MatchId(3), None),
            Err(StoreError::UnknownMatch(MatchId(3)))
        ));
    }

    #[test]
    fn test_match_lifecycle_is_visible_through_clones() {
        let mut store = MemoryStore::new();
        let view = store.clone();
        let alice = store.ensure_player(&user("alice")).unwrap();
        let id = store.create_match(2).unwrap();
        let result = MatchResult {
            player: alice,
            position: 1,
            score: 1,
            hand: "Flush".into(),
            cards: "2♠,7♠,9♠".into(),
        };
        store.insert_result(id, &result).unwrap();
        store.end_match(id, Some(alice)).unwrap();

        let matches = view.matches();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].player_count, 2);
        assert_eq!(matches[0].results, vec![result]);
        assert!(matches[0].is_ended());
        assert_eq!(matches[0].winner, Some(alice));

        let summary = view.match_summary(id).unwrap().unwrap();
        assert_eq!(summary.winner, Some(user("alice")));
        assert_eq!(view.match_lines(id).unwrap()[0].hand, "Flush");
    }
}
