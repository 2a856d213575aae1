#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Integration tests for `RoomSyncController`.
//!
//! Several controllers share one `MemoryStore`, the way several devices share
//! one remote database. Every assertion about room state is made either on
//! the store directly or on snapshots delivered through the event channel.

mod common;

use std::sync::Arc;

use bingo_room_client::board::{BoardRepair, CELL_COUNT, CENTER_INDEX};
use bingo_room_client::kv::CUSTOM_WORDS_KEY;
use bingo_room_client::stores::StoreOpKind;
use bingo_room_client::words::CENTER_WORD;
use bingo_room_client::{
    ActionOutcome, BingoConfig, BingoError, IgnoredReason, MarkOutcome, MemoryKeyValueStore,
    MemoryStore, RoomEvent, RoomStatus, RoomStore, RoomSyncController, ValidationError,
};
use serde_json::json;
use tokio_test::assert_ok;

use common::{
    client, client_with_id, start_round, test_config, two_player_room, wait_for,
    wait_for_snapshot, CountingStore, WIN_SETTLE,
};

const ROOT: &str = "gameRooms";

fn room_path(code: &str) -> String {
    format!("{ROOT}/{code}")
}

fn player_path(code: &str, id: &str) -> String {
    format!("{ROOT}/{code}/players/{id}")
}

// ════════════════════════════════════════════════════════════════════
// Create / join
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn create_writes_waiting_room_with_host_as_sole_player() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, mut events) = client(&store, 1);
    let code = assert_ok!(host.create("  Hana ").await);

    assert_eq!(code.len(), 5);
    assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

    let doc = store.value_at(&room_path(&code)).unwrap();
    assert_eq!(doc["status"], json!("waiting"));
    assert_eq!(doc["hostId"], json!(host.player_id()));
    assert!(doc.get("winner").is_none());
    assert!(doc.get("startTime").is_none());

    let players = doc["players"].as_object().unwrap();
    assert_eq!(players.len(), 1);
    let me = &players[host.player_id()];
    assert_eq!(me["name"], json!("Hana"));
    assert_eq!(me["wins"], json!(0));
    assert_eq!(me["board"].as_array().unwrap().len(), CELL_COUNT);
    assert_eq!(me["board"][CENTER_INDEX], json!(CENTER_WORD));
    assert_eq!(me["marks"], json!(vec![false; CELL_COUNT]));

    let view = wait_for_snapshot(&mut events, |_| true).await;
    assert_eq!(view.status, RoomStatus::Waiting);
    assert!(view.is_host);
    assert_eq!(view.players.len(), 1);
    assert!(view.players[0].is_you);
}

#[tokio::test]
async fn join_adds_player_and_both_sides_see_it() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, mut host_events) = client(&store, 1);
    let (mut guest, mut guest_events) = client(&store, 2);
    let code = two_player_room(&mut host, &mut host_events, &mut guest, &mut guest_events).await;

    let doc = store.value_at(&room_path(&code)).unwrap();
    assert_eq!(doc["hostId"], json!(host.player_id()));
    assert_eq!(doc["players"][guest.player_id()]["name"], json!("Gus"));
    assert!(!guest.is_host().await);
    assert_eq!(guest.current_room_code(), Some(code.as_str()));
}

#[tokio::test]
async fn join_normalizes_the_room_code() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, _host_events) = client(&store, 1);
    let (mut guest, _guest_events) = client(&store, 2);
    let code = host.create("Hana").await.unwrap();

    let typed = format!("  {} ", code.to_lowercase());
    let joined = assert_ok!(guest.join("Gus", &typed).await);
    assert_eq!(joined, code);
}

#[tokio::test]
async fn join_unknown_room_is_not_found_and_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let (mut guest, _events) = client(&store, 2);

    let err = guest.join("Gus", "ZZZZZ").await.unwrap_err();
    assert!(matches!(err, BingoError::NotFound { ref room_code } if room_code == "ZZZZZ"));
    assert!(store.history().is_empty());
    assert!(guest.current_room_code().is_none());
}

#[tokio::test]
async fn rejoin_with_same_identity_updates_only_the_name() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, mut host_events) = client(&store, 1);
    let (mut guest, mut guest_events) = client(&store, 2);
    let code = two_player_room(&mut host, &mut host_events, &mut guest, &mut guest_events).await;
    let guest_id = guest.player_id().to_string();

    let path = player_path(&code, &guest_id);
    store.write_value(&format!("{path}/wins"), json!(3)).await.unwrap();
    let before = store.value_at(&path).unwrap();
    drop(guest);

    // Same device identity, new session, new name.
    let (mut again, mut again_events) = client_with_id(&store, &guest_id, 9);
    assert_ok!(again.join("Gustavo", &code).await);

    let after = store.value_at(&path).unwrap();
    assert_eq!(after["name"], json!("Gustavo"));
    for field in ["board", "marks", "wins", "joinedAt"] {
        assert_eq!(after[field], before[field], "{field} must be preserved");
    }
    let last = store.history().pop().unwrap();
    assert_eq!(last.kind, StoreOpKind::Update);
    assert_eq!(last.value, json!({ "name": "Gustavo" }));

    let view = wait_for_snapshot(&mut again_events, |_| true).await;
    assert_eq!(view.player_count, 2);
}

#[tokio::test]
async fn rejoin_replaces_a_malformed_board() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, _host_events) = client(&store, 1);
    let code = host.create("Hana").await.unwrap();

    let stale = player_path(&code, "old-device");
    store
        .write_value(
            &stale,
            json!({ "name": "Old", "board": ["only", "three", "words"], "wins": 2, "joinedAt": 5 }),
        )
        .await
        .unwrap();

    let (mut again, _events) = client_with_id(&store, "old-device", 4);
    again.join("Olive", &code).await.unwrap();

    let entry = store.value_at(&stale).unwrap();
    assert_eq!(entry["board"].as_array().unwrap().len(), CELL_COUNT);
    assert_eq!(entry["board"][CENTER_INDEX], json!(CENTER_WORD));
    assert_eq!(entry["marks"], json!(vec![false; CELL_COUNT]));
    assert_eq!(entry["wins"], json!(2));
    assert_eq!(entry["joinedAt"], json!(5));
}

#[tokio::test]
async fn projection_shows_the_same_repaired_board_as_snapshots() {
    let store = Arc::new(MemoryStore::new());
    let (mut c, mut events) = client(&store, 8);
    let code = c.create("Ana").await.unwrap();
    let me = c.player_id().to_string();

    store
        .write_value(
            &format!("{}/board", player_path(&code, &me)),
            json!(["half", "a", "board"]),
        )
        .await
        .unwrap();
    let view = wait_for_snapshot(&mut events, |p| {
        p.board.as_ref().is_some_and(|b| b.repair == BoardRepair::Regenerated)
    })
    .await;
    let shown = view.board.unwrap().words;

    for _ in 0..3 {
        let again = c.projection().await.unwrap().board.unwrap();
        assert_eq!(again.repair, BoardRepair::Regenerated);
        assert_eq!(again.words, shown);
    }
}

#[tokio::test]
async fn blank_input_is_rejected_before_any_store_call() {
    let store = Arc::new(CountingStore::default());
    let (mut c, _events) = RoomSyncController::new(
        Arc::clone(&store),
        MemoryKeyValueStore::new(),
        BingoConfig::default(),
    );

    let err = c.create("   ").await.unwrap_err();
    assert!(matches!(err, BingoError::Validation(ValidationError::EmptyName)));
    let err = c.join("", "ABCDE").await.unwrap_err();
    assert!(matches!(err, BingoError::Validation(ValidationError::EmptyName)));
    let err = c.join("Ana", " \t ").await.unwrap_err();
    assert!(matches!(err, BingoError::Validation(ValidationError::EmptyRoomCode)));
    assert!(err.is_validation());

    assert_eq!(store.calls(), 0);
}

// ════════════════════════════════════════════════════════════════════
// Start / mark gating
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn only_the_host_can_start() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, mut host_events) = client(&store, 1);
    let (mut guest, mut guest_events) = client(&store, 2);
    let code = two_player_room(&mut host, &mut host_events, &mut guest, &mut guest_events).await;
    let writes_before = store.mutation_count(&room_path(&code));

    assert_eq!(
        guest.start().await.unwrap(),
        ActionOutcome::Ignored(IgnoredReason::NotHost)
    );
    assert_eq!(store.mutation_count(&room_path(&code)), writes_before);

    start_round(&mut host, &mut host_events, &mut guest_events).await;
    let doc = store.value_at(&room_path(&code)).unwrap();
    assert_eq!(doc["status"], json!("active"));
    assert!(doc["startTime"].as_i64().unwrap() > 0);
    assert!(doc.get("winner").is_none());

    assert!(matches!(
        host.start().await.unwrap(),
        ActionOutcome::Ignored(IgnoredReason::WrongPhase {
            expected: RoomStatus::Waiting,
            actual: RoomStatus::Active
        })
    ));
}

#[tokio::test]
async fn marks_before_start_are_ignored() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, _events) = client(&store, 1);
    let code = host.create("Hana").await.unwrap();

    assert!(matches!(
        host.mark(0).await.unwrap(),
        MarkOutcome::Ignored(IgnoredReason::WrongPhase { .. })
    ));
    let marks = format!("{}/marks", player_path(&code, host.player_id()));
    assert_eq!(store.mutation_count(&marks), 0);
}

#[tokio::test]
async fn marking_the_same_cell_twice_writes_once() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, mut host_events) = client(&store, 1);
    let (mut guest, mut guest_events) = client(&store, 2);
    let code = two_player_room(&mut host, &mut host_events, &mut guest, &mut guest_events).await;
    start_round(&mut host, &mut host_events, &mut guest_events).await;
    let marks = format!("{}/marks", player_path(&code, guest.player_id()));

    assert_eq!(guest.mark(6).await.unwrap(), MarkOutcome::Marked);
    // Before the store echoes the mark back.
    assert_eq!(
        guest.mark(6).await.unwrap(),
        MarkOutcome::Ignored(IgnoredReason::AlreadyMarked)
    );
    wait_for_snapshot(&mut guest_events, |p| {
        p.board.as_ref().is_some_and(|b| b.marks[6])
    })
    .await;
    // After it is confirmed.
    assert_eq!(
        guest.mark(6).await.unwrap(),
        MarkOutcome::Ignored(IgnoredReason::AlreadyMarked)
    );
    assert_eq!(store.mutation_count(&marks), 1);
}

#[tokio::test]
async fn rapid_marks_do_not_overwrite_each_other() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, mut host_events) = client(&store, 1);
    let (mut guest, mut guest_events) = client(&store, 2);
    let code = two_player_room(&mut host, &mut host_events, &mut guest, &mut guest_events).await;
    start_round(&mut host, &mut host_events, &mut guest_events).await;

    for cell in [0, 7, 24] {
        assert_eq!(guest.mark(cell).await.unwrap(), MarkOutcome::Marked);
    }
    let marks = store
        .value_at(&format!("{}/marks", player_path(&code, guest.player_id())))
        .unwrap();
    let marked: Vec<usize> = marks
        .as_array()
        .unwrap()
        .iter()
        .enumerate()
        .filter_map(|(i, m)| m.as_bool().unwrap().then_some(i))
        .collect();
    assert_eq!(marked, vec![0, 7, 24]);
}

#[tokio::test]
async fn marks_only_touch_the_local_player() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, mut host_events) = client(&store, 1);
    let (mut guest, mut guest_events) = client(&store, 2);
    let code = two_player_room(&mut host, &mut host_events, &mut guest, &mut guest_events).await;
    start_round(&mut host, &mut host_events, &mut guest_events).await;

    let host_before = store.value_at(&player_path(&code, host.player_id())).unwrap();
    guest.mark(3).await.unwrap();
    assert_eq!(
        guest.mark(CELL_COUNT).await.unwrap(),
        MarkOutcome::Ignored(IgnoredReason::CellOutOfRange(CELL_COUNT))
    );
    assert_eq!(
        store.value_at(&player_path(&code, host.player_id())).unwrap(),
        host_before
    );
    let last = store.history().pop().unwrap();
    assert_eq!(last.kind, StoreOpKind::Write);
    assert!(last.path.ends_with(&format!("{}/marks", guest.player_id())));
}

// ════════════════════════════════════════════════════════════════════
// Full round
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn full_round_lifecycle() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, mut host_events) = client(&store, 1);
    let (mut guest, mut guest_events) = client(&store, 2);
    let code = two_player_room(&mut host, &mut host_events, &mut guest, &mut guest_events).await;
    let guest_id = guest.player_id().to_string();
    start_round(&mut host, &mut host_events, &mut guest_events).await;

    // Row 3: cells 15..=19.
    for cell in 15..19 {
        assert_eq!(guest.mark(cell).await.unwrap(), MarkOutcome::Marked);
    }
    assert_eq!(guest.mark(19).await.unwrap(), MarkOutcome::Bingo);

    let declared = wait_for(&mut host_events, |e| {
        matches!(e, RoomEvent::WinnerDeclared { .. })
    })
    .await;
    match declared {
        RoomEvent::WinnerDeclared { room_code, winner } => {
            assert_eq!(room_code, code);
            assert_eq!(winner.player_id, guest_id);
            assert_eq!(winner.name, "Gus");
        }
        other => panic!("expected WinnerDeclared, got {other:?}"),
    }

    let view = wait_for_snapshot(&mut guest_events, |p| {
        p.status == RoomStatus::Finished && p.players.iter().any(|t| t.is_you && t.wins == 1)
    })
    .await;
    assert!(view.winner.as_ref().unwrap().is_you);
    assert!(view.board.as_ref().unwrap().completed_lines.contains(&3));

    let doc = store.value_at(&room_path(&code)).unwrap();
    let start = doc["startTime"].as_i64().unwrap();
    let won_at = doc["winner"]["time"].as_i64().unwrap();
    assert!(won_at >= start);
    assert_eq!(view.elapsed_ms, Some(won_at - start));

    // A later line by another player changes nothing.
    wait_for_snapshot(&mut host_events, |p| p.status == RoomStatus::Finished).await;
    for cell in 0..5 {
        assert_eq!(
            host.mark(cell).await.unwrap(),
            MarkOutcome::Ignored(IgnoredReason::WrongPhase {
                expected: RoomStatus::Active,
                actual: RoomStatus::Finished
            })
        );
    }
    assert_eq!(
        store.value_at(&format!("{}/winner/playerId", room_path(&code))),
        Some(json!(guest_id))
    );

    // Reset.
    let old_board = view.board.unwrap().words;
    assert_eq!(
        guest.reset().await.unwrap(),
        ActionOutcome::Ignored(IgnoredReason::NotHost)
    );
    assert_eq!(host.reset().await.unwrap(), ActionOutcome::Applied);

    let view = wait_for_snapshot(&mut guest_events, |p| p.status == RoomStatus::Waiting).await;
    assert!(view.winner.is_none());
    assert_eq!(view.elapsed_ms, None);
    let board = view.board.unwrap();
    assert_eq!(board.marks, vec![false; CELL_COUNT]);
    assert_eq!(board.words[CENTER_INDEX], CENTER_WORD);
    assert_ne!(board.words, old_board);
    let me = view.players.iter().find(|t| t.is_you).unwrap();
    assert_eq!(me.wins, 1);

    let doc = store.value_at(&room_path(&code)).unwrap();
    assert!(doc.get("winner").is_none());
    assert!(doc.get("startTime").is_none());
    assert_eq!(doc["hostId"], json!(host.player_id()));
}

#[tokio::test]
async fn simultaneous_bingos_credit_only_the_last_writer() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, mut host_events) = client(&store, 1);
    let (mut guest, mut guest_events) = client(&store, 2);
    let code = two_player_room(&mut host, &mut host_events, &mut guest, &mut guest_events).await;
    let host_id = host.player_id().to_string();
    let guest_id = guest.player_id().to_string();
    start_round(&mut host, &mut host_events, &mut guest_events).await;

    for cell in 0..4 {
        host.mark(cell).await.unwrap();
        guest.mark(cell).await.unwrap();
    }

    // Neither client sees the other's declaration before issuing its own.
    let hold = store.hold_notifications();
    assert_eq!(host.mark(4).await.unwrap(), MarkOutcome::Bingo);
    assert_eq!(guest.mark(4).await.unwrap(), MarkOutcome::Bingo);
    hold.release();

    for events in [&mut host_events, &mut guest_events] {
        wait_for_snapshot(events, |p| {
            p.status == RoomStatus::Finished
                && p.winner.as_ref().is_some_and(|w| w.player_id == guest_id)
                && p.players.iter().any(|t| t.player_id == guest_id && t.wins == 1)
        })
        .await;
    }

    // Give the overwritten racer well past its settle delay.
    tokio::time::sleep(WIN_SETTLE * 5).await;

    let doc = store.value_at(&room_path(&code)).unwrap();
    assert_eq!(doc["winner"]["playerId"], json!(guest_id));
    assert_eq!(doc["status"], json!("finished"));
    assert_eq!(doc["players"][&host_id]["wins"], json!(0));
    assert_eq!(doc["players"][&guest_id]["wins"], json!(1));

    let host_room = host.current_room().await.unwrap();
    let guest_room = guest.current_room().await.unwrap();
    assert_eq!(host_room.winner, guest_room.winner);
}

#[tokio::test]
async fn failed_winner_write_is_retried_by_marking_again() {
    let store = Arc::new(CountingStore::default());
    let (mut c, mut events) =
        RoomSyncController::new(Arc::clone(&store), MemoryKeyValueStore::new(), test_config(3));
    let code = c.create("Ana").await.unwrap();
    let me = c.player_id().to_string();
    assert_eq!(c.start().await.unwrap(), ActionOutcome::Applied);
    wait_for_snapshot(&mut events, |p| p.status == RoomStatus::Active).await;

    for cell in 0..4 {
        assert_eq!(c.mark(cell).await.unwrap(), MarkOutcome::Marked);
    }
    store.fail_next_updates(1);
    let err = c.mark(4).await.unwrap_err();
    assert!(matches!(err, BingoError::Store(_)));
    assert_eq!(store.inner.value_at(&format!("{}/status", room_path(&code))), Some(json!("active")));

    // The marks landed; tapping a cell of the finished line again re-declares.
    assert_eq!(c.mark(4).await.unwrap(), MarkOutcome::Bingo);
    let doc = store.inner.value_at(&room_path(&code)).unwrap();
    assert_eq!(doc["status"], json!("finished"));
    assert_eq!(doc["winner"]["playerId"], json!(me));

    let view = wait_for_snapshot(&mut events, |p| {
        p.status == RoomStatus::Finished && p.players.iter().any(|t| t.is_you && t.wins == 1)
    })
    .await;
    assert!(view.winner.unwrap().is_you);
    assert!(matches!(c.mark(2).await.unwrap(), MarkOutcome::Ignored(_)));
}

#[tokio::test]
async fn round_timer_ticks_while_active() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, mut events) = client(&store, 1);
    let code = host.create("Hana").await.unwrap();
    assert_eq!(host.start().await.unwrap(), ActionOutcome::Applied);

    match wait_for(&mut events, |e| matches!(e, RoomEvent::Tick { .. })).await {
        RoomEvent::Tick {
            room_code,
            elapsed_ms,
            timer_text,
        } => {
            assert_eq!(room_code, code);
            assert!(elapsed_ms >= 0);
            assert!(timer_text.starts_with("0:0"));
        }
        other => panic!("expected Tick, got {other:?}"),
    }
}

// ════════════════════════════════════════════════════════════════════
// Leave / close / failures
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn host_leaving_keeps_room_and_host_id() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, mut host_events) = client(&store, 1);
    let (mut guest, mut guest_events) = client(&store, 2);
    let code = two_player_room(&mut host, &mut host_events, &mut guest, &mut guest_events).await;
    let host_id = host.player_id().to_string();

    assert_ok!(host.leave().await);
    assert_eq!(
        wait_for(&mut host_events, |e| matches!(e, RoomEvent::Detached { .. })).await,
        RoomEvent::Detached {
            room_code: code.clone()
        }
    );
    assert!(host.current_room_code().is_none());

    let view = wait_for_snapshot(&mut guest_events, |p| p.player_count == 1).await;
    assert_eq!(view.status, RoomStatus::Waiting);
    assert!(!view.is_host);
    assert!(store.value_at(&player_path(&code, &host_id)).is_none());
    assert_eq!(
        store.value_at(&format!("{}/hostId", room_path(&code))),
        Some(json!(host_id))
    );
    assert_eq!(
        guest.start().await.unwrap(),
        ActionOutcome::Ignored(IgnoredReason::NotHost)
    );
}

#[tokio::test]
async fn deleted_room_closes_the_session() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, mut host_events) = client(&store, 1);
    let (mut guest, mut guest_events) = client(&store, 2);
    let code = two_player_room(&mut host, &mut host_events, &mut guest, &mut guest_events).await;

    store.remove(&room_path(&code)).await.unwrap();

    assert_eq!(
        wait_for(&mut guest_events, |e| matches!(e, RoomEvent::RoomClosed { .. })).await,
        RoomEvent::RoomClosed {
            room_code: code.clone()
        }
    );
    assert!(guest.current_room_code().is_none());
    assert!(guest.current_room().await.is_none());
    assert!(matches!(
        guest.start().await,
        Err(BingoError::RoomClosed { .. })
    ));
}

#[tokio::test]
async fn failed_write_is_surfaced_and_nothing_changes() {
    let store = Arc::new(MemoryStore::new());
    let (mut host, mut events) = client(&store, 1);
    let code = host.create("Hana").await.unwrap();
    host.start().await.unwrap();
    wait_for_snapshot(&mut events, |p| p.status == RoomStatus::Active).await;

    store.set_offline(true);
    assert!(matches!(host.mark(2).await, Err(BingoError::Store(_))));
    assert!(matches!(host.leave().await, Err(BingoError::Store(_))));
    store.set_offline(false);

    let room = host.current_room().await.unwrap();
    assert!(!room.player(host.player_id()).unwrap().is_marked(2));
    assert_eq!(host.current_room_code(), Some(code.as_str()));

    // The failed mark was not remembered as in flight.
    assert_eq!(host.mark(2).await.unwrap(), MarkOutcome::Marked);
}

#[tokio::test]
async fn switching_rooms_detaches_the_previous_subscription() {
    let store = Arc::new(MemoryStore::new());
    let (mut a, _a_events) = client(&store, 1);
    let (mut b, _b_events) = client(&store, 2);
    let (mut guest, mut guest_events) = client(&store, 3);
    let first = a.create("Ana").await.unwrap();
    let second = b.create("Bo").await.unwrap();

    guest.join("Gus", &first).await.unwrap();
    assert_eq!(store.listener_count(), 3);
    guest.join("Gus", &second).await.unwrap();
    assert_eq!(store.listener_count(), 3);

    assert_eq!(
        wait_for(&mut guest_events, |e| matches!(e, RoomEvent::Detached { .. })).await,
        RoomEvent::Detached { room_code: first }
    );
    assert_eq!(guest.current_room_code(), Some(second.as_str()));
}

// ════════════════════════════════════════════════════════════════════
// Local profile
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn custom_words_load_from_device_storage() {
    let store = Arc::new(MemoryStore::new());
    let kv = MemoryKeyValueStore::with_entries([(
        CUSTOM_WORDS_KEY,
        r#"["Tacos","Karaoke","tacos","Piñata smash"]"#,
    )]);
    let (mut c, mut events) =
        RoomSyncController::new(Arc::clone(&store), kv, BingoConfig::default().with_rng_seed(5));

    // Stored words that repeat the base list or each other are dropped.
    assert_eq!(c.word_pool().custom(), ["Tacos", "Piñata smash"]);
    assert!(c.word_pool().contains("karaoke"));
    assert!(c.add_custom_word("Open bar").unwrap());
    assert!(!c.add_custom_word("Confetti").unwrap());
    assert_eq!(c.word_pool().custom(), ["Tacos", "Piñata smash", "Open bar"]);

    c.create("Ana").await.unwrap();
    let view = wait_for_snapshot(&mut events, |_| true).await;
    let words = view.board.unwrap().words;
    assert!(words.iter().all(|w| c.word_pool().contains(w)));
}
