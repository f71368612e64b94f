//! Timer behaviour under tokio's paused clock.

use std::time::Duration;

use tokio::sync::mpsc;
use tricard_timer::TurnTimer;

const TURN: Duration = Duration::from_secs(10);

#[tokio::test(start_paused = true)]
async fn test_expired_resolves_after_timeout() {
    let mut timer = TurnTimer::new(TURN);
    let epoch = timer.arm();
    let started = tokio::time::Instant::now();

    let expiry = timer.expired().await;

    assert_eq!(expiry.epoch, epoch);
    assert!(started.elapsed() >= TURN);
    assert!(!timer.is_armed());
    assert_eq!(timer.metrics().fired, 1);
}

#[tokio::test(start_paused = true)]
async fn test_idle_timer_never_resolves() {
    let mut timer = TurnTimer::new(TURN);
    let result = tokio::time::timeout(Duration::from_secs(3600), timer.expired()).await;
    assert!(result.is_err(), "an idle timer must pend forever");
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_timer_does_not_fire() {
    let mut timer = TurnTimer::new(TURN);
    timer.arm();
    tokio::time::advance(Duration::from_secs(5)).await;
    timer.cancel();

    let result = tokio::time::timeout(TURN * 2, timer.expired()).await;
    assert!(result.is_err());
    assert_eq!(timer.metrics().fired, 0);
}

#[tokio::test(start_paused = true)]
async fn test_rearm_restarts_the_full_window() {
    let mut timer = TurnTimer::new(TURN);
    timer.arm();
    tokio::time::advance(Duration::from_secs(8)).await;
    let second = timer.arm();

    // The first deadline (2s away) must not fire.
    let early = tokio::time::timeout(Duration::from_secs(9), timer.expired()).await;
    assert!(early.is_err());

    let expiry = timer.expired().await;
    assert_eq!(expiry.epoch, second);
}

#[tokio::test(start_paused = true)]
async fn test_select_prefers_nothing_but_serves_both_branches() {
    let (tx, mut rx) = mpsc::channel::<&'static str>(4);
    let mut timer = TurnTimer::new(TURN);
    timer.arm();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        let _ = tx.send("DRAW").await;
    });

    let mut log = Vec::new();
    for _ in 0..2 {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                log.push(cmd);
                // A draw moves the turn on: a new window starts.
                timer.arm();
            }
            expiry = timer.expired() => {
                assert!(timer.is_current(&expiry));
                log.push("TIMEOUT");
            }
        }
    }

    assert_eq!(log, vec!["DRAW", "TIMEOUT"]);
    assert_eq!(timer.metrics().armed, 2);
    assert_eq!(timer.metrics().cancelled, 1);
}
