//! Room sync controller: the session-scoped orchestrator.
//!
//! [`RoomSyncController`] validates user actions against the last confirmed
//! room snapshot and turns them into store writes. It never applies a write's
//! effect locally. The change becomes visible only when the store pushes the
//! updated document back through the room subscription.
//!
//! Entering a room attaches a subscription and spawns a background sync loop
//! that `select!`s over the subscription feed, a shutdown signal and the round
//! timer. The loop keeps the shared session state current and emits
//! [`RoomEvent`]s on a bounded channel returned from
//! [`RoomSyncController::new`].
//!
//! # Example
//!
//! ```rust,ignore
//! let store = Arc::new(MemoryStore::new());
//! let (mut controller, mut events) =
//!     RoomSyncController::new(store, MemoryKeyValueStore::new(), BingoConfig::default());
//!
//! let code = controller.create("Ana").await?;
//! controller.start().await?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         RoomEvent::Snapshot(view) => render(&view),
//!         RoomEvent::RoomClosed { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::collections::BTreeSet;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Map, Value};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, error, info, warn};

use crate::arbiter;
use crate::board::{fresh_marks, generate_board, normalize_board, normalize_marks, BoardRepair};
use crate::error::{BingoError, Result, ValidationError};
use crate::event::RoomEvent;
use crate::kv::{KeyValueStore, LocalProfile};
use crate::lifecycle::{
    check_mark, check_transition, reset_fields, start_fields, ActionOutcome, IgnoredReason,
    MarkOutcome, Transition,
};
use crate::projection::{elapsed_ms, format_elapsed, BoardCache, RoomProjection};
use crate::room::{
    generate_room_code, normalize_room_code, now_millis, Player, PlayerId, Room, RoomStatus,
    Winner,
};
use crate::store::{
    marks_path, player_path, room_path, wins_path, RoomStore, Subscription, DEFAULT_ROOT_PATH,
};
use crate::win::has_bingo;
use crate::words::WordPool;

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default period of the round timer.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Default time allowed for the sync loop to exit on detach.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default time a local win must stand before it is credited.
const DEFAULT_WIN_SETTLE_DELAY: Duration = Duration::from_millis(500);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`RoomSyncController`].
///
/// # Example
///
/// ```
/// use bingo_room_client::BingoConfig;
/// use std::time::Duration;
///
/// let config = BingoConfig::default()
///     .with_root_path("staging/gameRooms")
///     .with_tick_interval(Duration::from_millis(500));
/// assert_eq!(config.root_path, "staging/gameRooms");
/// assert_eq!(config.event_channel_capacity, 256);
/// ```
#[derive(Debug, Clone)]
pub struct BingoConfig {
    /// Store node under which room documents live.
    ///
    /// Defaults to **`gameRooms`**.
    pub root_path: String,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer falls behind, events are dropped with a warning
    /// rather than stalling the sync loop. `RoomClosed` and `Detached` are
    /// always delivered.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Period of the round timer while a round is active.
    ///
    /// Defaults to **1 second**.
    pub tick_interval: Duration,
    /// Time the sync loop is given to exit when detaching before it is
    /// aborted.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// How long the local player must remain the confirmed winner before
    /// their `wins` counter is incremented.
    ///
    /// A racing declaration that lands within this window takes the win
    /// away without crediting it. Defaults to **500 ms**.
    pub win_settle_delay: Duration,
    /// Seed for board shuffles and room codes. `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for BingoConfig {
    fn default() -> Self {
        Self {
            root_path: DEFAULT_ROOT_PATH.to_string(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            tick_interval: DEFAULT_TICK_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            win_settle_delay: DEFAULT_WIN_SETTLE_DELAY,
            rng_seed: None,
        }
    }
}

impl BingoConfig {
    /// Set the store node under which rooms live.
    #[must_use]
    pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = root_path.into();
        self
    }

    /// Set the capacity of the event channel. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the round timer period.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the sync loop shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set how long a local win must stand before it is credited.
    #[must_use]
    pub fn with_win_settle_delay(mut self, delay: Duration) -> Self {
        self.win_settle_delay = delay;
        self
    }

    /// Use a fixed seed for shuffles and room codes.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

// ── Shared session state ────────────────────────────────────────────

/// State shared between the controller and the sync loop of one room.
struct SessionState {
    room_code: String,
    /// Last confirmed snapshot; `None` once the room has vanished.
    room: Mutex<Option<Room>>,
    /// Cells written by this client but not yet seen in a snapshot.
    pending_marks: Mutex<BTreeSet<usize>>,
    /// Display repair of the local board, shared by snapshots and
    /// [`RoomSyncController::projection`].
    board_cache: Mutex<BoardCache>,
    /// Set once this client's winner write for the current round succeeded.
    win_declared: AtomicBool,
    open: AtomicBool,
}

impl SessionState {
    fn new(room_code: &str) -> Self {
        Self {
            room_code: room_code.to_string(),
            room: Mutex::new(None),
            pending_marks: Mutex::new(BTreeSet::new()),
            board_cache: Mutex::new(BoardCache::default()),
            win_declared: AtomicBool::new(false),
            open: AtomicBool::new(true),
        }
    }
}

struct RoomSession {
    state: Arc<SessionState>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

// ── Controller ──────────────────────────────────────────────────────

/// Session-scoped controller for one local player.
///
/// Holds the local identity, the word pool and at most one room
/// subscription. All actions validate against the last snapshot pushed by the
/// store and return without touching local state when the store write fails.
pub struct RoomSyncController<S: RoomStore, K: KeyValueStore> {
    store: Arc<S>,
    profile: LocalProfile<K>,
    pool: WordPool,
    player_id: PlayerId,
    config: BingoConfig,
    rng: StdRng,
    event_tx: mpsc::Sender<RoomEvent>,
    session: Option<RoomSession>,
}

impl<S: RoomStore, K: KeyValueStore> RoomSyncController<S, K> {
    /// Create a controller and the receiver for its events.
    ///
    /// The player identity and custom word list are loaded from `kv`; an
    /// identity is generated and stored if none exists yet.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn new(store: Arc<S>, kv: K, config: BingoConfig) -> (Self, mpsc::Receiver<RoomEvent>) {
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel(capacity);

        let profile = LocalProfile::new(kv);
        let player_id = profile.player_id();
        let pool = WordPool::with_custom(profile.custom_words());
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let controller = Self {
            store,
            profile,
            pool,
            player_id,
            config,
            rng,
            event_tx,
            session: None,
        };
        (controller, event_rx)
    }

    // ── Actions ─────────────────────────────────────────────────────

    /// Create a new room with the local player as host and sole player, then
    /// enter it. Returns the room code.
    ///
    /// Room codes are random and not checked for collisions.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyName`] for a blank name (nothing is written)
    /// - [`BingoError::Store`] if the room could not be written
    pub async fn create(&mut self, name: &str) -> Result<String> {
        let name = validated_name(name)?;
        let code = generate_room_code(&mut self.rng);
        let now = now_millis();
        let board = generate_board(&self.pool, &mut self.rng);
        let room = Room::new(self.player_id.clone(), Player::new(name.clone(), board, now), now);

        let path = room_path(&self.config.root_path, &code);
        self.store
            .write_value(&path, room.to_value()?)
            .await
            .map_err(store_failure("create"))?;
        self.profile.set_name(&name);
        info!(room = %code, player_id = %self.player_id, "room created");

        self.enter_room(&code).await?;
        Ok(code)
    }

    /// Join an existing room, then enter it. Returns the normalized code.
    ///
    /// A player already present under the local identity keeps their board,
    /// marks, wins and join time; only the name is rewritten (plus the board,
    /// if the stored one is malformed). Otherwise a new entry with a fresh
    /// board is added.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyName`] / [`ValidationError::EmptyRoomCode`]
    ///   for blank input (nothing is read or written)
    /// - [`BingoError::NotFound`] if no room exists under the code
    /// - [`BingoError::Store`] if the read or write failed
    pub async fn join(&mut self, name: &str, room_code: &str) -> Result<String> {
        let name = validated_name(name)?;
        let code = normalize_room_code(room_code).ok_or(ValidationError::EmptyRoomCode)?;

        let path = room_path(&self.config.root_path, &code);
        let Some(value) = self
            .store
            .read_once(&path)
            .await
            .map_err(store_failure("join"))?
        else {
            info!(room = %code, "join failed: room not found");
            return Err(BingoError::NotFound { room_code: code });
        };
        let room = Room::from_value(&value);

        let player_path = player_path(&self.config.root_path, &code, &self.player_id);
        if let Some(existing) = room.player(&self.player_id) {
            let mut fields = Map::new();
            fields.insert("name".into(), json!(name));
            let (board, repair) =
                normalize_board(existing.board.clone(), &self.pool, &mut self.rng);
            match repair {
                BoardRepair::Untouched => {}
                BoardRepair::CenterRestored => {
                    fields.insert("board".into(), json!(board));
                }
                BoardRepair::Regenerated => {
                    warn!(room = %code, "replacing malformed board on re-join");
                    fields.insert("board".into(), json!(board));
                    fields.insert("marks".into(), json!(fresh_marks()));
                }
            }
            self.store
                .update_fields(&player_path, fields)
                .await
                .map_err(store_failure("join"))?;
            info!(room = %code, player_id = %self.player_id, "re-joined room");
        } else {
            let board = generate_board(&self.pool, &mut self.rng);
            let player = Player::new(name.clone(), board, now_millis());
            self.store
                .write_value(&player_path, serde_json::to_value(&player)?)
                .await
                .map_err(store_failure("join"))?;
            info!(room = %code, player_id = %self.player_id, "joined room");
        }
        self.profile.set_name(&name);

        self.enter_room(&code).await?;
        Ok(code)
    }

    /// Start the round (host only, while waiting).
    ///
    /// # Errors
    ///
    /// - [`BingoError::NotInRoom`] / [`BingoError::RoomClosed`] without a live room
    /// - [`BingoError::Store`] if the write failed
    pub async fn start(&mut self) -> Result<ActionOutcome> {
        let room = self.confirmed_room().await?;
        if let Err(reason) = check_transition(&room, &self.player_id, Transition::Start) {
            debug!(%reason, "start ignored");
            return Ok(ActionOutcome::Ignored(reason));
        }
        let path = self.current_room_path()?;
        self.store
            .update_fields(&path, start_fields(now_millis()))
            .await
            .map_err(store_failure("start"))?;
        info!(room = %path, "round started");
        Ok(ActionOutcome::Applied)
    }

    /// Mark cell `index` on the local board.
    ///
    /// Only the local player's `marks` field is written. If the new marks
    /// complete a line, the winner is declared. The local win counter is
    /// incremented later by the sync loop, once the declaration has stood for
    /// [`BingoConfig::win_settle_delay`].
    ///
    /// Marking a cell that is already marked, or whose mark is still on its
    /// way to the store, is a no-op. The exception is a completed line whose
    /// winner write failed: marking any of its cells again retries the
    /// declaration.
    ///
    /// # Errors
    ///
    /// - [`BingoError::NotInRoom`] / [`BingoError::RoomClosed`] without a live room
    /// - [`BingoError::Store`] if any write failed
    pub async fn mark(&mut self, index: usize) -> Result<MarkOutcome> {
        let state = self.session_state()?;
        let room = self.confirmed_room().await?;
        let confirmed = match check_mark(&room, &self.player_id, index) {
            Ok(()) => false,
            Err(IgnoredReason::AlreadyMarked) => true,
            Err(reason) => {
                debug!(index, %reason, "mark ignored");
                return Ok(MarkOutcome::Ignored(reason));
            }
        };
        let Some(player) = room.player(&self.player_id) else {
            return Ok(MarkOutcome::Ignored(IgnoredReason::NotAPlayer));
        };

        let mut pending = state.pending_marks.lock().await;
        let already_marked = confirmed || pending.contains(&index);
        let mut marks = normalize_marks(player.marks.clone());
        for cell in pending.iter().chain(std::iter::once(&index)) {
            if let Some(slot) = marks.get_mut(*cell) {
                *slot = true;
            }
        }

        if already_marked {
            drop(pending);
            if has_bingo(&marks) && !state.win_declared.load(Ordering::Acquire) {
                info!(room = %state.room_code, index, "retrying winner declaration");
                self.declare_win(&state, &player.name).await?;
                return Ok(MarkOutcome::Bingo);
            }
            debug!(index, "mark ignored: already marked");
            return Ok(MarkOutcome::Ignored(IgnoredReason::AlreadyMarked));
        }

        let code = &state.room_code;
        let path = marks_path(&self.config.root_path, code, &self.player_id);
        self.store
            .write_value(&path, json!(marks))
            .await
            .map_err(store_failure("mark"))?;
        pending.insert(index);
        drop(pending);
        debug!(room = %code, index, "cell marked");

        if !has_bingo(&marks) {
            return Ok(MarkOutcome::Marked);
        }
        self.declare_win(&state, &player.name).await?;
        Ok(MarkOutcome::Bingo)
    }

    /// Reset a finished room for another round (host only).
    ///
    /// Every player gets a new board drawn from the host's word pool.
    ///
    /// # Errors
    ///
    /// - [`BingoError::NotInRoom`] / [`BingoError::RoomClosed`] without a live room
    /// - [`BingoError::Store`] if the write failed
    pub async fn reset(&mut self) -> Result<ActionOutcome> {
        let room = self.confirmed_room().await?;
        if let Err(reason) = check_transition(&room, &self.player_id, Transition::Reset) {
            debug!(%reason, "reset ignored");
            return Ok(ActionOutcome::Ignored(reason));
        }
        let fields = reset_fields(&room, &self.pool, &mut self.rng);
        let path = self.current_room_path()?;
        self.store
            .update_fields(&path, fields)
            .await
            .map_err(store_failure("reset"))?;
        info!(room = %path, players = room.players.len(), "room reset");
        Ok(ActionOutcome::Applied)
    }

    /// Remove the local player from the room and detach from it.
    ///
    /// The room's status and host are left as they are; if the host leaves,
    /// nobody can start or reset the room afterwards.
    ///
    /// # Errors
    ///
    /// - [`BingoError::NotInRoom`] if not in a room
    /// - [`BingoError::Store`] if the removal failed (the session is kept)
    pub async fn leave(&mut self) -> Result<()> {
        let state = self.session_state()?;
        let path = player_path(&self.config.root_path, &state.room_code, &self.player_id);
        self.store
            .remove(&path)
            .await
            .map_err(store_failure("leave"))?;
        info!(room = %state.room_code, player_id = %self.player_id, "left room");
        self.detach().await;
        Ok(())
    }

    /// Stop following the current room without removing the local player.
    ///
    /// Emits [`RoomEvent::Detached`] unless the room had already closed. Does
    /// nothing when not in a room.
    pub async fn detach(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        debug!(room = %session.state.room_code, "detaching from room");

        if let Some(tx) = session.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut task) = session.task.take() {
            match tokio::time::timeout(self.config.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("sync loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("sync loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("sync loop aborted: {join_err}");
                    }
                }
            }
        }
        session.state.open.store(false, Ordering::Release);
    }

    // ── Word pool ───────────────────────────────────────────────────

    /// Add a word to the local custom list and persist it.
    ///
    /// Returns `false` if the word is already in the pool. Affects only boards
    /// generated from now on.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyWord`] for a blank word.
    pub fn add_custom_word(&mut self, word: &str) -> Result<bool> {
        let added = self.pool.add_custom(word)?;
        if added {
            self.profile.set_custom_words(self.pool.custom());
        }
        Ok(added)
    }

    /// Remove a word from the local custom list and persist the change.
    pub fn remove_custom_word(&mut self, word: &str) -> bool {
        let removed = self.pool.remove_custom(word);
        if removed {
            self.profile.set_custom_words(self.pool.custom());
        }
        removed
    }

    /// The current word pool.
    pub fn word_pool(&self) -> &WordPool {
        &self.pool
    }

    // ── State accessors ─────────────────────────────────────────────

    /// The stable local player identifier.
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// The last display name used on this device.
    pub fn last_name(&self) -> String {
        self.profile.name()
    }

    /// Code of the room currently followed, if its subscription is live.
    pub fn current_room_code(&self) -> Option<&str> {
        self.session
            .as_ref()
            .filter(|s| s.state.open.load(Ordering::Acquire))
            .map(|s| s.state.room_code.as_str())
    }

    /// The last confirmed room snapshot.
    pub async fn current_room(&self) -> Option<Room> {
        let session = self.session.as_ref()?;
        session.state.room.lock().await.clone()
    }

    /// Whether the local player hosts the current room.
    pub async fn is_host(&self) -> bool {
        self.current_room()
            .await
            .is_some_and(|room| room.is_host(&self.player_id))
    }

    /// A fresh projection of the last confirmed snapshot.
    ///
    /// A locally repaired board is the same one the latest
    /// [`RoomEvent::Snapshot`] showed.
    pub async fn projection(&mut self) -> Option<RoomProjection> {
        let state = Arc::clone(&self.session.as_ref()?.state);
        if !state.open.load(Ordering::Acquire) {
            return None;
        }
        let room = state.room.lock().await.clone()?;
        let mut cache = state.board_cache.lock().await;
        Some(RoomProjection::build(
            &state.room_code,
            &room,
            &self.player_id,
            now_millis(),
            &mut cache,
            &self.pool,
            &mut self.rng,
        ))
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Attach to `room_code`, detaching from any previous room first.
    ///
    /// The initial snapshot is applied before this returns, so actions issued
    /// right after see the room.
    async fn enter_room(&mut self, room_code: &str) -> Result<()> {
        self.detach().await;

        let path = room_path(&self.config.root_path, room_code);
        let mut subscription = self
            .store
            .subscribe(&path)
            .await
            .map_err(store_failure("subscribe"))?;

        let state = Arc::new(SessionState::new(room_code));
        let mut sync = RoomSync {
            state: Arc::clone(&state),
            store: Arc::clone(&self.store),
            wins_path: wins_path(&self.config.root_path, room_code, &self.player_id),
            local_id: self.player_id.clone(),
            event_tx: self.event_tx.clone(),
            pool: self.pool.clone(),
            rng: StdRng::from_rng(&mut self.rng),
            tick_interval: self.config.tick_interval,
            ticker: None,
            win_settle_delay: self.config.win_settle_delay,
            credit_at: None,
            credited: false,
        };

        match subscription.next().await {
            Some(Some(value)) => sync.apply(&value).await,
            Some(None) | None => {
                warn!(room = %room_code, "room vanished before the subscription attached");
                return Err(BingoError::NotFound {
                    room_code: room_code.to_string(),
                });
            }
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(sync.run(subscription, shutdown_rx));
        debug!(room = %room_code, "sync loop started");

        self.session = Some(RoomSession {
            state,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
        });
        Ok(())
    }

    fn session_state(&self) -> Result<Arc<SessionState>> {
        self.session
            .as_ref()
            .map(|s| Arc::clone(&s.state))
            .ok_or(BingoError::NotInRoom)
    }

    fn current_room_path(&self) -> Result<String> {
        let state = self.session_state()?;
        Ok(room_path(&self.config.root_path, &state.room_code))
    }

    /// Write the local player as winner of the current round.
    async fn declare_win(&self, state: &SessionState, name: &str) -> Result<()> {
        let winner = Winner::new(self.player_id.clone(), name.to_string(), now_millis());
        let path = room_path(&self.config.root_path, &state.room_code);
        arbiter::declare_winner(self.store.as_ref(), &path, &winner)
            .await
            .map_err(store_failure("declare winner"))?;
        state.win_declared.store(true, Ordering::Release);
        Ok(())
    }

    async fn confirmed_room(&self) -> Result<Room> {
        let state = self.session_state()?;
        let room = state.room.lock().await.clone();
        room.ok_or_else(|| BingoError::RoomClosed {
            room_code: state.room_code.clone(),
        })
    }
}

impl<S: RoomStore, K: KeyValueStore> std::fmt::Debug for RoomSyncController<S, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSyncController")
            .field("player_id", &self.player_id)
            .field("room_code", &self.current_room_code())
            .field("custom_words", &self.pool.custom().len())
            .finish()
    }
}

impl<S: RoomStore, K: KeyValueStore> Drop for RoomSyncController<S, K> {
    fn drop(&mut self) {
        // No executor to await a graceful exit here; aborting drops the loop
        // and with it the subscription.
        if let Some(task) = self.session.as_mut().and_then(|s| s.task.take()) {
            task.abort();
        }
    }
}

fn validated_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName.into());
    }
    Ok(name.to_string())
}

fn store_failure(action: &'static str) -> impl FnOnce(BingoError) -> BingoError {
    move |e| {
        error!(action, "store operation failed: {e}");
        e
    }
}

// ── Sync loop ───────────────────────────────────────────────────────

/// Per-room state owned by the background sync loop.
struct RoomSync<S: RoomStore> {
    state: Arc<SessionState>,
    store: Arc<S>,
    wins_path: String,
    local_id: PlayerId,
    event_tx: mpsc::Sender<RoomEvent>,
    pool: WordPool,
    rng: StdRng,
    tick_interval: Duration,
    ticker: Option<Interval>,
    win_settle_delay: Duration,
    /// When the local win becomes creditable; `None` when nothing is pending.
    credit_at: Option<Pin<Box<Sleep>>>,
    /// Whether the current round's win was already credited.
    credited: bool,
}

impl<S: RoomStore> RoomSync<S> {
    /// Multiplex snapshots, shutdown and timer ticks until the room closes or
    /// the controller detaches.
    async fn run(mut self, mut subscription: Subscription, mut shutdown_rx: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                update = subscription.next() => {
                    match update {
                        Some(Some(value)) => self.apply(&value).await,
                        Some(None) => {
                            info!(room = %self.state.room_code, "room document removed");
                            self.close().await;
                            break;
                        }
                        None => {
                            warn!(room = %self.state.room_code, "store closed the room feed");
                            self.close().await;
                            break;
                        }
                    }
                }

                _ = &mut shutdown_rx => {
                    debug!(room = %self.state.room_code, "shutdown signal received");
                    emit_final(&self.event_tx, RoomEvent::Detached {
                        room_code: self.state.room_code.clone(),
                    }).await;
                    break;
                }

                _ = next_tick(&mut self.ticker) => self.tick().await,

                _ = settle_deadline(&mut self.credit_at) => self.credit_win().await,
            }
        }
        subscription.unsubscribe();
        debug!(room = %self.state.room_code, "sync loop exited");
    }

    /// Replace the confirmed room with a new snapshot and project it.
    async fn apply(&mut self, value: &Value) {
        let room = Room::from_value(value);
        let now = now_millis();

        let previous = {
            let mut slot = self.state.room.lock().await;
            slot.replace(room.clone())
        };
        self.settle_pending_marks(&room).await;
        self.track_local_win(&room, previous.is_none());

        let previous_status = previous.as_ref().map(|r| r.status);
        if room.status != RoomStatus::Active {
            self.ticker = None;
        } else if previous_status != Some(RoomStatus::Active) || self.ticker.is_none() {
            let mut ticker = tokio::time::interval_at(
                Instant::now() + self.tick_interval,
                self.tick_interval,
            );
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.ticker = Some(ticker);
        }

        let projection = {
            let mut cache = self.state.board_cache.lock().await;
            RoomProjection::build(
                &self.state.room_code,
                &room,
                &self.local_id,
                now,
                &mut cache,
                &self.pool,
                &mut self.rng,
            )
        };
        emit_event(&self.event_tx, RoomEvent::Snapshot(Box::new(projection)));

        let previous_winner = previous.and_then(|r| r.winner);
        if let Some(winner) = room.winner {
            if previous_winner.as_ref() != Some(&winner) {
                info!(
                    room = %self.state.room_code,
                    player_id = %winner.player_id,
                    "winner observed"
                );
                emit_event(
                    &self.event_tx,
                    RoomEvent::WinnerDeclared {
                        room_code: self.state.room_code.clone(),
                        winner,
                    },
                );
            }
        }
    }

    /// Drop in-flight marks the snapshot now confirms, or all of them once
    /// the round is no longer active.
    async fn settle_pending_marks(&self, room: &Room) {
        let mut pending = self.state.pending_marks.lock().await;
        if pending.is_empty() {
            return;
        }
        match room.player(&self.local_id) {
            Some(me) if room.status == RoomStatus::Active => {
                pending.retain(|&cell| !me.is_marked(cell));
            }
            _ => pending.clear(),
        }
    }

    /// Schedule or cancel crediting the local player's win.
    ///
    /// A win already on record when the subscription attached was credited
    /// by an earlier session.
    fn track_local_win(&mut self, room: &Room, first_snapshot: bool) {
        match &room.winner {
            None => {
                self.credited = false;
                self.credit_at = None;
                if room.status == RoomStatus::Waiting {
                    self.state.win_declared.store(false, Ordering::Release);
                }
            }
            Some(winner) if winner.player_id != self.local_id => {
                if self.credit_at.take().is_some() {
                    info!(
                        room = %self.state.room_code,
                        player_id = %winner.player_id,
                        "local win replaced by a racing declaration"
                    );
                }
            }
            Some(_) if first_snapshot => self.credited = true,
            Some(_) => {
                if !self.credited && self.credit_at.is_none() {
                    self.credit_at = Some(Box::pin(tokio::time::sleep(self.win_settle_delay)));
                }
            }
        }
    }

    /// Increment the local win counter if the local player is still the
    /// confirmed winner.
    async fn credit_win(&mut self) {
        self.credit_at = None;
        let still_winner = self
            .state
            .room
            .lock()
            .await
            .as_ref()
            .and_then(|r| r.winner.as_ref())
            .is_some_and(|w| w.player_id == self.local_id);
        if !still_winner || self.credited {
            return;
        }
        match arbiter::increment_wins(self.store.as_ref(), &self.wins_path).await {
            Ok(wins) => {
                self.credited = true;
                info!(room = %self.state.room_code, wins, "win credited");
            }
            Err(e) => {
                warn!(room = %self.state.room_code, "could not credit win, retrying: {e}");
                self.credit_at = Some(Box::pin(tokio::time::sleep(self.win_settle_delay)));
            }
        }
    }

    async fn tick(&mut self) {
        let room = self.state.room.lock().await.clone();
        let Some(elapsed) = room.as_ref().and_then(|r| elapsed_ms(r, now_millis())) else {
            return;
        };
        emit_event(
            &self.event_tx,
            RoomEvent::Tick {
                room_code: self.state.room_code.clone(),
                elapsed_ms: elapsed,
                timer_text: format_elapsed(elapsed),
            },
        );
    }

    async fn close(&mut self) {
        self.ticker = None;
        self.state.open.store(false, Ordering::Release);
        *self.state.room.lock().await = None;
        self.state.pending_marks.lock().await.clear();
        emit_final(
            &self.event_tx,
            RoomEvent::RoomClosed {
                room_code: self.state.room_code.clone(),
            },
        )
        .await;
    }
}

/// Resolve on the next timer tick, or never when no round is running.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Resolve when the pending win settles, or never when none is pending.
async fn settle_deadline(deadline: &mut Option<Pin<Box<Sleep>>>) {
    match deadline {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Emit an event. If the channel is full, log a warning and drop the event to
/// avoid blocking the sync loop.
fn emit_event(event_tx: &mpsc::Sender<RoomEvent>, event: RoomEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit the last event of a session; waits for channel capacity.
async fn emit_final(event_tx: &mpsc::Sender<RoomEvent>, event: RoomEvent) {
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

#[cfg(all(test, feature = "memory-store"))]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::kv::MemoryKeyValueStore;
    use crate::stores::MemoryStore;

    fn controller(
        store: &Arc<MemoryStore>,
    ) -> (
        RoomSyncController<MemoryStore, MemoryKeyValueStore>,
        mpsc::Receiver<RoomEvent>,
    ) {
        RoomSyncController::new(
            Arc::clone(store),
            MemoryKeyValueStore::new(),
            BingoConfig::default().with_rng_seed(11),
        )
    }

    #[test]
    fn config_defaults() {
        let config = BingoConfig::default();
        assert_eq!(config.root_path, "gameRooms");
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.win_settle_delay, Duration::from_millis(500));
        assert!(config.rng_seed.is_none());
    }

    #[test]
    fn event_channel_capacity_is_clamped_to_one() {
        let config = BingoConfig::default().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(validated_name("  Ana ").unwrap(), "Ana");
        assert!(matches!(
            validated_name("   "),
            Err(BingoError::Validation(ValidationError::EmptyName))
        ));
    }

    #[tokio::test]
    async fn actions_outside_a_room_fail() {
        let store = Arc::new(MemoryStore::new());
        let (mut c, _events) = controller(&store);
        assert!(matches!(c.start().await, Err(BingoError::NotInRoom)));
        assert!(matches!(c.mark(0).await, Err(BingoError::NotInRoom)));
        assert!(matches!(c.reset().await, Err(BingoError::NotInRoom)));
        assert!(matches!(c.leave().await, Err(BingoError::NotInRoom)));
        assert!(c.current_room_code().is_none());
    }

    #[tokio::test]
    async fn create_loads_room_before_returning() {
        let store = Arc::new(MemoryStore::new());
        let (mut c, mut events) = controller(&store);
        let code = c.create("Ana").await.unwrap();

        let room = c.current_room().await.unwrap();
        assert_eq!(room.host_id, c.player_id());
        assert_eq!(room.status, RoomStatus::Waiting);
        assert!(c.is_host().await);
        assert_eq!(c.current_room_code(), Some(code.as_str()));
        assert_eq!(c.last_name(), "Ana");

        match events.recv().await.unwrap() {
            RoomEvent::Snapshot(view) => {
                assert_eq!(view.room_code, code);
                assert_eq!(view.player_count, 1);
            }
            other => panic!("expected Snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn detach_emits_detached_and_drops_listener() {
        let store = Arc::new(MemoryStore::new());
        let (mut c, mut events) = controller(&store);
        let code = c.create("Ana").await.unwrap();
        assert_eq!(store.listener_count(), 1);

        c.detach().await;
        assert_eq!(store.listener_count(), 0);
        assert!(c.current_room_code().is_none());

        let _ = events.recv().await; // Snapshot
        assert_eq!(
            events.recv().await.unwrap(),
            RoomEvent::Detached { room_code: code }
        );
    }

    #[tokio::test]
    async fn custom_words_persist_through_profile() {
        let store = Arc::new(MemoryStore::new());
        let (mut c, _events) = controller(&store);
        assert!(c.add_custom_word("Tacos").unwrap());
        assert!(!c.add_custom_word("tacos").unwrap());
        assert!(c.add_custom_word(" ").is_err());
        assert_eq!(c.profile.custom_words(), vec!["Tacos"]);
        assert!(c.remove_custom_word("TACOS"));
        assert!(c.profile.custom_words().is_empty());
    }
}
