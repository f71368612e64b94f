//! Point ledger and zero-sum settlement.
//!
//! Let `N` be the round's participants: the players still seated at the
//! end plus everyone eliminated by timeout. The winner gains `N - 1`,
//! every other participant loses 1. Timed-out players pay their point
//! at the moment of elimination, so settlement only charges the losers
//! still seated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tricard_protocol::{RankingEntry, Username};
use tricard_store::Recorder;

// ---------------------------------------------------------------------------
// ScoreLedger
// ---------------------------------------------------------------------------

/// Process-wide cumulative points, one entry per username.
///
/// The internal mutex is a leaf lock: no method calls out while holding
/// it.
#[derive(Debug, Default)]
pub struct ScoreLedger {
    totals: Mutex<HashMap<Username, i64>>,
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Username, i64>> {
        self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current total (0 for players never scored).
    pub fn total(&self, username: &Username) -> i64 {
        self.lock().get(username).copied().unwrap_or(0)
    }

    /// Adds `delta` and returns the new total.
    pub fn apply(&self, username: &Username, delta: i64) -> i64 {
        let mut totals = self.lock();
        let total = totals.entry(username.clone()).or_insert(0);
        *total += delta;
        *total
    }

    /// Overwrites a total, e.g. with the stored value at login.
    pub fn seed(&self, username: &Username, total: i64) {
        self.lock().insert(username.clone(), total);
    }
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// The point deltas of one finished round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// `(username, delta)` with the winner first, then the seated losers
    /// in ranking order.
    pub deltas: Vec<(Username, i64)>,
    /// Participants already charged by timeout elimination.
    pub eliminated: usize,
}

impl Settlement {
    /// Applies the zero-sum rule.
    pub fn zero_sum(winner: &Username, losers: &[Username], eliminated: usize) -> Self {
        let participants = 1 + losers.len() + eliminated;
        let gain = participants as i64 - 1;
        let mut deltas = Vec::with_capacity(1 + losers.len());
        deltas.push((winner.clone(), gain));
        deltas.extend(losers.iter().map(|loser| (loser.clone(), -1)));
        Self { deltas, eliminated }
    }

    pub fn participants(&self) -> usize {
        self.deltas.len() + self.eliminated
    }

    /// Sum of every delta of the round, including timeout penalties.
    /// Always zero.
    pub fn net(&self) -> i64 {
        self.deltas.iter().map(|(_, d)| d).sum::<i64>() - self.eliminated as i64
    }
}

// ---------------------------------------------------------------------------
// ScoreManager
// ---------------------------------------------------------------------------

/// Applies point changes to the ledger and mirrors them to the store.
#[derive(Debug, Clone)]
pub struct ScoreManager {
    ledger: Arc<ScoreLedger>,
    recorder: Recorder,
}

impl ScoreManager {
    pub fn new(ledger: Arc<ScoreLedger>, recorder: Recorder) -> Self {
        Self { ledger, recorder }
    }

    /// A manager with its own ledger and no persistence.
    pub fn detached() -> Self {
        Self::new(Arc::new(ScoreLedger::new()), Recorder::disabled())
    }

    pub fn ledger(&self) -> &Arc<ScoreLedger> {
        &self.ledger
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Charges the immediate timeout penalty. Returns the new total.
    pub fn penalize_timeout(&self, username: &Username) -> i64 {
        self.recorder.update_points(username, -1);
        self.ledger.apply(username, -1)
    }

    /// Applies a settlement and returns the `RANKING` entries in the
    /// settlement's order.
    pub fn settle(&self, settlement: &Settlement) -> Vec<RankingEntry> {
        settlement
            .deltas
            .iter()
            .map(|(username, delta)| {
                if *delta != 0 {
                    self.recorder.update_points(username, *delta);
                }
                RankingEntry {
                    username: username.clone(),
                    total: self.ledger.apply(username, *delta),
                    delta: *delta,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    #[test]
    fn test_ledger_apply_and_seed() {
        let ledger = ScoreLedger::new();
        assert_eq!(ledger.total(&user("a")), 0);
        assert_eq!(ledger.apply(&user("a"), 3), 3);
        assert_eq!(ledger.apply(&user("a"), -1), 2);
        ledger.seed(&user("a"), 10);
        assert_eq!(ledger.total(&user("a")), 10);
    }

    #[test]
    fn test_zero_sum_without_timeouts() {
        let s = Settlement::zero_sum(&user("w"), &[user("x"), user("y")], 0);
        assert_eq!(
            s.deltas,
            vec![(user("w"), 2), (user("x"), -1), (user("y"), -1)]
        );
        assert_eq!(s.participants(), 3);
        assert_eq!(s.net(), 0);
    }

    #[test]
    fn test_zero_sum_counts_timeouts_in_winner_gain() {
        let s = Settlement::zero_sum(&user("w"), &[user("x")], 2);
        assert_eq!(s.deltas, vec![(user("w"), 3), (user("x"), -1)]);
        assert_eq!(s.participants(), 4);
        assert_eq!(s.net(), 0);
    }

    #[test]
    fn test_walkover_gain_is_eliminated_count() {
        let s = Settlement::zero_sum(&user("w"), &[], 2);
        assert_eq!(s.deltas, vec![(user("w"), 2)]);
        assert_eq!(s.net(), 0);
    }

    #[test]
    fn test_settle_reports_totals_after_delta() {
        let scores = ScoreManager::detached();
        scores.ledger().seed(&user("w"), 5);
        scores.penalize_timeout(&user("t"));
        let ranking = scores.settle(&Settlement::zero_sum(&user("w"), &[user("x")], 1));
        assert_eq!(
            ranking,
            vec![
                RankingEntry { username: user("w"), total: 7, delta: 2 },
                RankingEntry { username: user("x"), total: -1, delta: -1 },
            ]
        );
        assert_eq!(scores.ledger().total(&user("t")), -1);
    }
}
