//! In-process [`RoomStore`] backed by a shared JSON tree.
//!
//! [`MemoryStore`] implements the full store contract: atomic single-call
//! writes, nested-path partial updates, snapshot fan-out to every listener
//! whose path overlaps the written path, and "last write wins" on contended
//! paths. Clones share the same tree, so several controllers handed clones of
//! one store behave like several clients of one remote database.
//!
//! # Feature gate
//!
//! This module is only available when the `memory-store` feature is enabled
//! (it is enabled by default).
//!
//! # Simulating latency
//!
//! [`MemoryStore::hold_notifications`] queues fan-out until the returned
//! guard is released. Writes are still applied immediately, so two clients can
//! each act on a view that does not yet include the other's write:
//!
//! ```rust
//! # async fn example() -> Result<(), bingo_room_client::BingoError> {
//! use bingo_room_client::{MemoryStore, RoomStore};
//! use serde_json::json;
//!
//! let store = MemoryStore::new();
//! let mut sub = store.subscribe("gameRooms/ABCDE").await?;
//! assert_eq!(sub.next().await, Some(None));
//!
//! let hold = store.hold_notifications();
//! store.write_value("gameRooms/ABCDE", json!({ "status": "waiting" })).await?;
//! hold.release();
//!
//! assert_eq!(sub.next().await, Some(Some(json!({ "status": "waiting" }))));
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::BingoError;
use crate::store::{segments, RoomStore, Subscription};

/// The kind of mutation recorded in the store history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOpKind {
    /// [`RoomStore::write_value`]
    Write,
    /// [`RoomStore::update_fields`]
    Update,
    /// [`RoomStore::remove`]
    Remove,
}

/// One applied mutation, in application order.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOp {
    /// Which primitive was called.
    pub kind: StoreOpKind,
    /// The path the primitive was called with.
    pub path: String,
    /// The value written, the merged fields, or `Null` for removals.
    pub value: Value,
}

struct Listener {
    id: u64,
    path: Vec<String>,
    tx: mpsc::UnboundedSender<Option<Value>>,
}

#[derive(Default)]
struct Inner {
    root: Value,
    listeners: Vec<Listener>,
    next_listener_id: u64,
    holds: usize,
    pending: Vec<(u64, Option<Value>)>,
    history: Vec<StoreOp>,
    offline: bool,
}

impl Inner {
    fn check_online(&self) -> Result<(), BingoError> {
        if self.offline {
            return Err(BingoError::Store("store unavailable".into()));
        }
        Ok(())
    }

    /// Push the current value of every listener overlapping one of `touched`.
    fn notify(&mut self, touched: &[Vec<String>]) {
        let mut outgoing = Vec::new();
        for listener in &self.listeners {
            if touched.iter().any(|path| overlaps(path, &listener.path)) {
                let snapshot = value_at(&self.root, &listener.path).cloned();
                outgoing.push((listener.id, snapshot));
            }
        }
        if self.holds > 0 {
            self.pending.extend(outgoing);
        } else {
            self.deliver(outgoing);
        }
    }

    fn deliver(&mut self, outgoing: Vec<(u64, Option<Value>)>) {
        for (id, snapshot) in outgoing {
            if let Some(listener) = self.listeners.iter().find(|l| l.id == id) {
                // A closed receiver is cleaned up by its cancel callback.
                let _ = listener.tx.send(snapshot);
            }
        }
    }
}

/// In-process document store. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current value at `path`, read synchronously.
    pub fn value_at(&self, path: &str) -> Option<Value> {
        let path = owned_segments(path);
        value_at(&self.lock().root, &path).cloned()
    }

    /// Every mutation applied so far, oldest first.
    pub fn history(&self) -> Vec<StoreOp> {
        self.lock().history.clone()
    }

    /// Number of mutations whose call path equals `path`.
    pub fn mutation_count(&self, path: &str) -> usize {
        self.lock()
            .history
            .iter()
            .filter(|op| op.path == path)
            .count()
    }

    /// Number of currently attached listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Make every subsequent operation fail with [`BingoError::Store`].
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Queue snapshot fan-out until the returned guard is released or dropped.
    ///
    /// Holds nest; queued snapshots are delivered in write order once the
    /// last hold is released. Initial snapshots sent on subscribe are never
    /// held.
    #[must_use = "notifications are released when the hold is dropped"]
    pub fn hold_notifications(&self) -> NotificationHold {
        self.lock().holds += 1;
        NotificationHold {
            inner: Arc::downgrade(&self.inner),
            released: false,
        }
    }

    fn mutate(
        &self,
        kind: StoreOpKind,
        path: &str,
        value: Value,
        apply: impl FnOnce(&mut Value) -> Vec<Vec<String>>,
    ) -> Result<(), BingoError> {
        let mut inner = self.lock();
        inner.check_online()?;
        let touched = apply(&mut inner.root);
        inner.history.push(StoreOp {
            kind,
            path: path.to_string(),
            value,
        });
        tracing::trace!(?kind, path, "memory store mutation applied");
        inner.notify(&touched);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MemoryStore")
            .field("listeners", &inner.listeners.len())
            .field("mutations", &inner.history.len())
            .field("held", &(inner.holds > 0))
            .finish()
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn write_value(&self, path: &str, value: Value) -> Result<(), BingoError> {
        let target = owned_segments(path);
        let written = value.clone();
        self.mutate(StoreOpKind::Write, path, written, move |root| {
            set_at(root, &target, value);
            vec![target]
        })
    }

    async fn read_once(&self, path: &str) -> Result<Option<Value>, BingoError> {
        let inner = self.lock();
        inner.check_online()?;
        Ok(value_at(&inner.root, &owned_segments(path)).cloned())
    }

    async fn update_fields(
        &self,
        path: &str,
        fields: Map<String, Value>,
    ) -> Result<(), BingoError> {
        let base = owned_segments(path);
        let recorded = Value::Object(fields.clone());
        self.mutate(StoreOpKind::Update, path, recorded, move |root| {
            let mut touched = Vec::with_capacity(fields.len());
            for (key, value) in fields {
                let mut target = base.clone();
                target.extend(owned_segments(&key));
                set_at(root, &target, value);
                touched.push(target);
            }
            touched
        })
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription, BingoError> {
        let mut inner = self.lock();
        inner.check_online()?;

        let path = owned_segments(path);
        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive, so the initial send cannot fail.
        let _ = tx.send(value_at(&inner.root, &path).cloned());

        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        tracing::debug!(listener = id, path = %path.join("/"), "listener attached");
        inner.listeners.push(Listener { id, path, tx });

        let weak = Arc::downgrade(&self.inner);
        Ok(Subscription::new(rx, move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                inner.listeners.retain(|l| l.id != id);
                tracing::debug!(listener = id, "listener detached");
            }
        }))
    }

    async fn remove(&self, path: &str) -> Result<(), BingoError> {
        let target = owned_segments(path);
        self.mutate(StoreOpKind::Remove, path, Value::Null, move |root| {
            set_at(root, &target, Value::Null);
            vec![target]
        })
    }
}

/// Guard returned by [`MemoryStore::hold_notifications`].
#[derive(Debug)]
pub struct NotificationHold {
    inner: Weak<Mutex<Inner>>,
    released: bool,
}

impl NotificationHold {
    /// Release the hold now, flushing queued snapshots if it was the last one.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.holds = inner.holds.saturating_sub(1);
        if inner.holds == 0 {
            let pending = std::mem::take(&mut inner.pending);
            inner.deliver(pending);
        }
    }
}

impl Drop for NotificationHold {
    fn drop(&mut self) {
        self.release_inner();
    }
}

// ── Tree helpers ────────────────────────────────────────────────────

fn owned_segments(path: &str) -> Vec<String> {
    segments(path).into_iter().map(str::to_string).collect()
}

/// Two paths overlap when one is a prefix of the other.
fn overlaps(a: &[String], b: &[String]) -> bool {
    a.iter().zip(b).all(|(x, y)| x == y)
}

fn value_at<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut node = root;
    for segment in path {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

/// Replace the node at `path`; `Null` deletes it and prunes emptied parents.
fn set_at(node: &mut Value, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };
    if rest.is_empty() {
        if value.is_null() {
            map.remove(first);
        } else {
            map.insert(first.clone(), value);
        }
        return;
    }
    let child = map.entry(first.clone()).or_insert(Value::Null);
    set_at(child, rest, value);
    if child.is_null() || child.as_object().is_some_and(Map::is_empty) {
        map.remove(first);
    }
}
