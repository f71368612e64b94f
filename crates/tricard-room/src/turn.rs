//! Turn rotation and the per-room turn timer.
//!
//! Turns walk the seating order backward: from seat `i` to `i - 1`,
//! wrapping from seat 0 to the last seat. Seats that already hold a full
//! hand are skipped. Every transition re-arms or cancels the timer, so at
//! most one deadline is pending per room.

use std::time::Duration;

use tricard_timer::{TurnExpiry, TurnTimer};

/// Current-turn index plus the countdown for it.
#[derive(Debug)]
pub struct TurnManager {
    current: usize,
    timer: TurnTimer,
}

impl TurnManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            current: 0,
            timer: TurnTimer::new(timeout),
        }
    }

    /// Seat index of the turn holder.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Gives the first turn of a round to `seat` and starts its countdown.
    pub fn begin(&mut self, seat: usize) {
        self.current = seat;
        self.timer.arm();
    }

    /// Moves the turn backward to the next seat for which `eligible`
    /// holds, trying each of the `seats` at most once.
    ///
    /// Arms a fresh countdown and returns the new holder, or cancels the
    /// timer and returns `None` when nobody is eligible (round over).
    pub fn advance(&mut self, seats: usize, eligible: impl Fn(usize) -> bool) -> Option<usize> {
        for _ in 0..seats {
            self.current = if self.current == 0 || self.current > seats {
                seats - 1
            } else {
                self.current - 1
            };
            if eligible(self.current) {
                self.timer.arm();
                return Some(self.current);
            }
        }
        self.timer.cancel();
        None
    }

    /// Keeps the turn on the same player after seat `removed` is vacated.
    ///
    /// Returns `true` if the removed seat was the turn holder; the caller
    /// must then [`advance`](Self::advance), which continues the rotation
    /// from the vacated position.
    pub fn seat_removed(&mut self, removed: usize) -> bool {
        if removed < self.current {
            self.current -= 1;
            false
        } else {
            removed == self.current
        }
    }

    /// Stops the countdown, e.g. at round end or room shutdown.
    pub fn cancel(&mut self) -> bool {
        self.timer.cancel()
    }

    /// Whether `expiry` belongs to the current turn.
    pub fn is_current(&self, expiry: &TurnExpiry) -> bool {
        self.timer.is_current(expiry)
    }

    pub fn timer(&self) -> &TurnTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut TurnTimer {
        &mut self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns() -> TurnManager {
        TurnManager::new(Duration::from_secs(10))
    }

    #[test]
    fn test_advance_walks_backward_and_wraps() {
        let mut t = turns();
        t.begin(0);
        assert_eq!(t.advance(3, |_| true), Some(2));
        assert_eq!(t.advance(3, |_| true), Some(1));
        assert_eq!(t.advance(3, |_| true), Some(0));
        assert_eq!(t.advance(3, |_| true), Some(2));
    }

    #[test]
    fn test_advance_skips_ineligible_seats() {
        let mut t = turns();
        t.begin(0);
        assert_eq!(t.advance(4, |seat| seat != 3 && seat != 2), Some(1));
    }

    #[test]
    fn test_advance_may_return_to_the_same_seat() {
        let mut t = turns();
        t.begin(1);
        assert_eq!(t.advance(3, |seat| seat == 1), Some(1));
    }

    #[test]
    fn test_advance_with_nobody_eligible_cancels_timer() {
        let mut t = turns();
        t.begin(0);
        assert!(t.timer().is_armed());
        assert_eq!(t.advance(3, |_| false), None);
        assert!(!t.timer().is_armed());
    }

    #[test]
    fn test_every_transition_rearms() {
        let mut t = turns();
        t.begin(0);
        let first = t.timer().epoch();
        t.advance(2, |_| true);
        assert_eq!(t.timer().epoch(), first + 1);
        assert_eq!(t.timer().metrics().cancelled, 1);
    }

    #[test]
    fn test_seat_removed_below_turn_keeps_holder() {
        let mut t = turns();
        t.begin(2);
        assert!(!t.seat_removed(0));
        assert_eq!(t.current(), 1);
    }

    #[test]
    fn test_seat_removed_above_turn_is_ignored() {
        let mut t = turns();
        t.begin(1);
        assert!(!t.seat_removed(2));
        assert_eq!(t.current(), 1);
    }

    #[test]
    fn test_removed_holder_passes_turn_to_previous_seat() {
        // Seats a,b,c with b holding the turn; b is removed.
        let mut t = turns();
        t.begin(1);
        assert!(t.seat_removed(1));
        // Remaining a,c: the rotation continues at a.
        assert_eq!(t.advance(2, |_| true), Some(0));
    }

    #[test]
    fn test_removed_last_seat_holder_wraps_correctly() {
        // Seats a,b,c with c holding the turn; c is removed.
        let mut t = turns();
        t.begin(2);
        assert!(t.seat_removed(2));
        assert_eq!(t.advance(2, |_| true), Some(1));
    }

    #[test]
    fn test_stale_expiry_is_not_current() {
        let mut t = turns();
        t.begin(0);
        let old = t.timer_mut().fire_now().unwrap();
        assert!(t.is_current(&old));
        t.advance(2, |_| true);
        assert!(!t.is_current(&old));
    }
}
