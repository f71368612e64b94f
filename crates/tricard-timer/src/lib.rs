//! Cancellable single-shot turn timer for Tricard.
//!
//! A room holds exactly one [`TurnTimer`]. Every turn transition re-arms
//! it (which implicitly cancels the previous deadline) or cancels it
//! outright when the round ends. It never re-arms itself: once it fires,
//! it stays idle until the room arms it again.
//!
//! # Integration
//!
//! The timer is designed to sit inside a room actor's `tokio::select!` loop
//! next to the command channel, so a player command and an expiry can
//! never be processed at the same time:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         expiry = room.timer_mut().expired() => {
//!             room.on_turn_timeout(expiry);
//!         }
//!     }
//! }
//! ```
//!
//! # Stale fires
//!
//! Every arm bumps the timer's epoch and every [`TurnExpiry`] carries the
//! epoch it was armed under. A consumer that compares the two with
//! [`TurnTimer::is_current`] can never act on a deadline that belonged to
//! an earlier turn.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

/// Returned by [`TurnTimer::expired`] when an armed deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnExpiry {
    /// Epoch of the arm that produced this expiry.
    pub epoch: u64,
    /// How far past the deadline the expiry was observed.
    pub late_by: Duration,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Lifetime counters for one timer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerMetrics {
    /// Times the timer was armed.
    pub armed: u64,
    /// Armed deadlines discarded before they fired.
    pub cancelled: u64,
    /// Deadlines that fired.
    pub fired: u64,
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// One countdown per room.
#[derive(Debug)]
pub struct TurnTimer {
    timeout: Duration,
    deadline: Option<Instant>,
    epoch: u64,
    metrics: TimerMetrics,
}

impl TurnTimer {
    /// Shortest accepted timeout.
    pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

    /// Lateness past which an expiry is logged as a warning.
    const LATE_WARN: Duration = Duration::from_secs(1);

    /// Creates an idle timer with the given turn length.
    pub fn new(timeout: Duration) -> Self {
        let timeout = if timeout < Self::MIN_TIMEOUT {
            warn!(
                requested_ms = timeout.as_millis() as u64,
                min_ms = Self::MIN_TIMEOUT.as_millis() as u64,
                "turn timeout below minimum, clamping"
            );
            Self::MIN_TIMEOUT
        } else {
            timeout
        };
        Self {
            timeout,
            deadline: None,
            epoch: 0,
            metrics: TimerMetrics::default(),
        }
    }

    /// The configured turn length.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Starts a fresh countdown, discarding any pending one. Returns the
    /// new epoch.
    pub fn arm(&mut self) -> u64 {
        if self.deadline.is_some() {
            self.metrics.cancelled += 1;
        }
        self.epoch += 1;
        self.deadline = Some(Instant::now() + self.timeout);
        self.metrics.armed += 1;
        trace!(epoch = self.epoch, "turn timer armed");
        self.epoch
    }

    /// Discards the pending countdown. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.deadline.take() {
            Some(_) => {
                self.metrics.cancelled += 1;
                trace!(epoch = self.epoch, "turn timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Epoch of the most recent arm (0 if never armed).
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether `expiry` belongs to the most recent arm.
    pub fn is_current(&self, expiry: &TurnExpiry) -> bool {
        expiry.epoch == self.epoch
    }

    /// Time left on the pending countdown.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn metrics(&self) -> &TimerMetrics {
        &self.metrics
    }

    /// Waits for the pending deadline, then disarms and reports it.
    ///
    /// When idle this future pends forever, so `tokio::select!` keeps
    /// serving its other branches. Dropping the future before it resolves
    /// leaves the timer untouched.
    pub async fn expired(&mut self) -> TurnExpiry {
        let Some(deadline) = self.deadline else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(deadline).await;

        let late_by = Instant::now().saturating_duration_since(deadline);
        if late_by > Self::LATE_WARN {
            warn!(
                epoch = self.epoch,
                late_ms = late_by.as_millis() as u64,
                "turn timer fired late"
            );
        }
        self.fire(late_by)
    }

    /// Fires the pending deadline immediately, if any.
    ///
    /// Lets synchronous drivers walk the timeout path without a runtime.
    pub fn fire_now(&mut self) -> Option<TurnExpiry> {
        self.deadline?;
        Some(self.fire(Duration::ZERO))
    }

    fn fire(&mut self, late_by: Duration) -> TurnExpiry {
        self.deadline = None;
        self.metrics.fired += 1;
        debug!(epoch = self.epoch, "turn timer fired");
        TurnExpiry {
            epoch: self.epoch,
            late_by,
        }
    }
}
