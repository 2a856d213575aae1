#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for bingo room client integration tests.
//!
//! Provides a call-counting [`CountingStore`] wrapper around [`MemoryStore`]
//! and helpers for spinning up controllers that share one store and waiting
//! on their event streams.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bingo_room_client::kv::PLAYER_ID_KEY;
use bingo_room_client::projection::RoomProjection;
use bingo_room_client::{
    BingoConfig, BingoError, MemoryKeyValueStore, MemoryStore, RoomEvent, RoomStore,
    RoomSyncController, Subscription,
};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

/// How long a test waits for an expected event before failing.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

// ── CountingStore ───────────────────────────────────────────────────

/// A [`MemoryStore`] wrapper that counts every call made through the trait
/// and can fail `update_fields` on demand.
#[derive(Default)]
pub struct CountingStore {
    /// The wrapped store; inspect it directly for values and history.
    pub inner: MemoryStore,
    /// Total number of trait calls, reads and subscriptions included.
    pub calls: AtomicUsize,
    /// Number of upcoming `update_fields` calls that fail without writing.
    pub failing_updates: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make the next `n` `update_fields` calls return a store error.
    pub fn fail_next_updates(&self, n: usize) {
        self.failing_updates.store(n, Ordering::SeqCst);
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoomStore for CountingStore {
    async fn write_value(&self, path: &str, value: Value) -> Result<(), BingoError> {
        self.hit();
        self.inner.write_value(path, value).await
    }

    async fn read_once(&self, path: &str) -> Result<Option<Value>, BingoError> {
        self.hit();
        self.inner.read_once(path).await
    }

    async fn update_fields(
        &self,
        path: &str,
        fields: Map<String, Value>,
    ) -> Result<(), BingoError> {
        self.hit();
        let armed = self
            .failing_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            return Err(BingoError::Store(format!("injected update failure at {path}")));
        }
        self.inner.update_fields(path, fields).await
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription, BingoError> {
        self.hit();
        self.inner.subscribe(path).await
    }

    async fn remove(&self, path: &str) -> Result<(), BingoError> {
        self.hit();
        self.inner.remove(path).await
    }
}

// ── Controllers ─────────────────────────────────────────────────────

pub type Controller = RoomSyncController<MemoryStore, MemoryKeyValueStore>;
pub type Events = mpsc::Receiver<RoomEvent>;

/// How long a local win must stand before it is credited in tests.
pub const WIN_SETTLE: Duration = Duration::from_millis(30);

/// Config used by every integration test: deterministic shuffles, a fast
/// round timer and a short win settle delay.
pub fn test_config(seed: u64) -> BingoConfig {
    BingoConfig::default()
        .with_rng_seed(seed)
        .with_tick_interval(Duration::from_millis(20))
        .with_win_settle_delay(WIN_SETTLE)
}

/// A controller with a fresh device identity on `store`.
pub fn client(store: &Arc<MemoryStore>, seed: u64) -> (Controller, Events) {
    RoomSyncController::new(Arc::clone(store), MemoryKeyValueStore::new(), test_config(seed))
}

/// A controller on `store` that reuses the device identity `player_id`.
pub fn client_with_id(store: &Arc<MemoryStore>, player_id: &str, seed: u64) -> (Controller, Events) {
    let kv = MemoryKeyValueStore::with_entries([(PLAYER_ID_KEY, player_id)]);
    RoomSyncController::new(Arc::clone(store), kv, test_config(seed))
}

// ── Event helpers ───────────────────────────────────────────────────

/// Receive events until one matches `pred`, returning it.
///
/// Panics if the channel closes or nothing matches within [`EVENT_TIMEOUT`].
pub async fn wait_for<F>(events: &mut Events, mut pred: F) -> RoomEvent
where
    F: FnMut(&RoomEvent) -> bool,
{
    let found = tokio::time::timeout(EVENT_TIMEOUT, async {
        while let Some(event) = events.recv().await {
            if pred(&event) {
                return Some(event);
            }
        }
        None
    })
    .await
    .expect("timed out waiting for event");
    found.expect("event channel closed")
}

/// Receive snapshots until one matches `pred`, returning its projection.
pub async fn wait_for_snapshot<F>(events: &mut Events, mut pred: F) -> RoomProjection
where
    F: FnMut(&RoomProjection) -> bool,
{
    match wait_for(events, |e| matches!(e, RoomEvent::Snapshot(p) if pred(p))).await {
        RoomEvent::Snapshot(p) => *p,
        other => panic!("expected Snapshot, got {other:?}"),
    }
}

/// Host creates a room, `guest` joins it, and both see two players.
///
/// Returns the room code.
pub async fn two_player_room(
    host: &mut Controller,
    host_events: &mut Events,
    guest: &mut Controller,
    guest_events: &mut Events,
) -> String {
    let code = host.create("Hana").await.unwrap();
    guest.join("Gus", &code).await.unwrap();
    wait_for_snapshot(host_events, |p| p.player_count == 2).await;
    wait_for_snapshot(guest_events, |p| p.player_count == 2).await;
    code
}

/// Host starts the round and both players see it active.
pub async fn start_round(
    host: &mut Controller,
    host_events: &mut Events,
    guest_events: &mut Events,
) {
    use bingo_room_client::{ActionOutcome, RoomStatus};
    assert_eq!(host.start().await.unwrap(), ActionOutcome::Applied);
    wait_for_snapshot(host_events, |p| p.status == RoomStatus::Active).await;
    wait_for_snapshot(guest_events, |p| p.status == RoomStatus::Active).await;
}
