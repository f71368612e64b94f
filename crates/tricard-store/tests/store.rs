//! SQLite persistence and the recorder worker.

use tricard_protocol::Username;
use tricard_store::{
    Credentials, MatchId, MatchResult, MatchStore, MemoryStore, Recorder, ResultRow, SqliteStore,
    StoreError,
};

fn user(name: &str) -> Username {
    Username::parse(name).unwrap()
}

fn row(name: &str, position: u32, score: i64) -> ResultRow {
    ResultRow {
        username: user(name),
        position,
        score,
        hand: "HighCard".into(),
        cards: "2♠,5♥,9♦".into(),
    }
}

#[test]
fn test_sqlite_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tricard.db");

    let id = {
        let mut store = SqliteStore::open(&path).unwrap();
        let alice = store.ensure_player(&user("alice")).unwrap();
        let bob = store.ensure_player(&user("bob")).unwrap();
        store.update_points(alice, 1).unwrap();
        store.update_points(bob, -1).unwrap();
        let id = store.create_match(2).unwrap();
        store
            .insert_result(
                id,
                &MatchResult {
                    player: alice,
                    position: 1,
                    score: 3_060_500,
                    hand: "Straight".into(),
                    cards: "4♠,5♥,6♦".into(),
                },
            )
            .unwrap();
        store
            .insert_result(
                id,
                &MatchResult {
                    player: bob,
                    position: 2,
                    score: 7,
                    hand: "HighCard".into(),
                    cards: "2♠,9♥,6♣".into(),
                },
            )
            .unwrap();
        store.end_match(id, Some(alice)).unwrap();
        id
    };

    let store = SqliteStore::open(&path).unwrap();
    let alice = store.player_id(&user("alice")).unwrap().unwrap();
    let bob = store.player_id(&user("bob")).unwrap().unwrap();
    assert_eq!(store.total_points(alice).unwrap(), 1);
    assert_eq!(store.total_points(bob).unwrap(), -1);

    let summary = store.match_summary(id).unwrap().unwrap();
    assert_eq!(summary.player_count, 2);
    assert_eq!(summary.winner, Some(user("alice")));
    assert!(summary.ended.is_some());

    let lines = store.match_lines(id).unwrap();
    let names: Vec<_> = lines.iter().map(|l| l.username.to_string()).collect();
    assert_eq!(names, ["alice", "bob"]);
    assert_eq!(lines[0].cards, "4♠,5♥,6♦");
    assert_eq!(lines[1].hand, "HighCard");
}

#[test]
fn test_sqlite_store_keeps_credentials_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/dir/tricard.db");

    let created = {
        let mut store = SqliteStore::open(&path).unwrap();
        store.verify_or_create(&user("alice"), "hash-a").unwrap()
    };
    let Credentials::Created(id) = created else {
        panic!("first login should create the account, got {created:?}");
    };

    let mut store = SqliteStore::open(&path).unwrap();
    assert_eq!(
        store.verify_or_create(&user("alice"), "hash-b").unwrap(),
        Credentials::Mismatch
    );
    assert_eq!(
        store.verify_or_create(&user("alice"), "hash-a").unwrap(),
        Credentials::Verified(id)
    );
}

#[test]
fn test_sqlite_store_continues_ids_and_lists_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tricard.db");

    let first = {
        let mut store = SqliteStore::open(&path).unwrap();
        store.create_match(3).unwrap()
    };
    let mut store = SqliteStore::open(&path).unwrap();
    let second = store.create_match(2).unwrap();
    let third = store.create_match(4).unwrap();
    assert!(second.0 > first.0);

    let ids: Vec<_> = store
        .recent_matches(2)
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, [third.0, second.0]);
    assert_eq!(store.recent_matches(10).unwrap().len(), 3);
}

#[test]
fn test_sqlite_store_rejects_a_file_that_is_not_a_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tricard.db");
    std::fs::write(&path, "not a database\n".repeat(100)).unwrap();

    let err = SqliteStore::open(&path).unwrap_err();
    assert!(matches!(err, StoreError::Sqlite(_)));
}

#[tokio::test]
async fn test_recorder_writes_full_match() {
    let store = MemoryStore::new();
    let recorder = Recorder::spawn(store.clone());

    for name in ["alice", "bob", "carol"] {
        recorder.ensure_player(&user(name));
    }
    let ticket = recorder.open_match(3);
    recorder.update_points(&user("carol"), -1);
    recorder.update_points(&user("alice"), 2);
    recorder.update_points(&user("bob"), -1);
    recorder.finish_match(
        ticket,
        vec![row("alice", 1, 2), row("bob", 2, -1)],
        Some(user("alice")),
    );
    recorder.flush().await;

    assert_eq!(store.points_of(&user("alice")), Some(2));
    assert_eq!(store.points_of(&user("bob")), Some(-1));
    assert_eq!(store.points_of(&user("carol")), Some(-1));
    let matches = store.matches();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].player_count, 3);
    assert_eq!(matches[0].results.len(), 2);
    assert!(matches[0].is_ended());
    assert_eq!(recorder.total_points(&user("alice")).await, Some(2));
}

#[tokio::test]
async fn test_recorder_answers_history_queries() {
    let recorder = Recorder::spawn(SqliteStore::in_memory().unwrap());
    for name in ["alice", "bob"] {
        recorder.ensure_player(&user(name));
    }
    let first = recorder.open_match(2);
    recorder.finish_match(first, vec![row("bob", 1, 9), row("alice", 2, 4)], Some(user("bob")));
    let second = recorder.open_match(2);
    recorder.finish_match(second, Vec::new(), Some(user("alice")));

    let history = recorder.history(20).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].winner, Some(user("alice")));
    assert_eq!(history[1].winner, Some(user("bob")));

    let detail = recorder.history_detail(10).await;
    assert!(detail[0].lines.is_empty());
    assert_eq!(detail[1].lines.len(), 2);
    assert_eq!(detail[1].lines[0].username, user("bob"));

    let one = recorder.match_detail(MatchId(history[1].id)).await.unwrap();
    assert_eq!(one, detail[1]);
    assert_eq!(recorder.match_detail(MatchId(404)).await, None);
}

#[tokio::test]
async fn test_recorder_verifies_logins() {
    let recorder = Recorder::spawn(MemoryStore::new());
    let created = recorder.verify_login(&user("alice"), "h1").await;
    assert!(matches!(created, Some(Credentials::Created(_))));
    assert!(matches!(
        recorder.verify_login(&user("alice"), "h1").await,
        Some(Credentials::Verified(_))
    ));
    assert_eq!(
        recorder.verify_login(&user("alice"), "h2").await,
        Some(Credentials::Mismatch)
    );
}

#[tokio::test]
async fn test_recorder_skips_unknown_players() {
    let store = MemoryStore::new();
    let recorder = Recorder::spawn(store.clone());
    recorder.update_points(&user("ghost"), 3);
    assert_eq!(recorder.total_points(&user("ghost")).await, None);
    assert!(store.players().is_empty());
}

#[tokio::test]
async fn test_disabled_recorder_is_inert() {
    let recorder = Recorder::disabled();
    assert!(!recorder.is_enabled());
    let ticket = recorder.open_match(2);
    recorder.finish_match(ticket, vec![row("alice", 1, 1)], None);
    recorder.flush().await;
    assert_eq!(recorder.total_points(&user("alice")).await, None);
    assert_eq!(recorder.verify_login(&user("alice"), "h").await, None);
    assert!(recorder.history(20).await.is_empty());
}
