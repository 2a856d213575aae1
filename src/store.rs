//! Document store abstraction for replicated room state.
//!
//! The [`RoomStore`] trait models a remote real-time JSON document store
//! addressed by slash-separated paths (`gameRooms/ABCDE/players/<id>`). The
//! game core only relies on the guarantees listed here:
//!
//! - a single call is applied atomically and observed atomically by subscribers,
//! - there is no ordering guarantee between writes issued by different clients,
//! - there is no compare-and-swap; concurrent writes to one path resolve as
//!   "last write wins".
//!
//! # Implementing a Custom Store
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use bingo_room_client::error::BingoError;
//! use bingo_room_client::store::{RoomStore, Subscription};
//! use serde_json::{Map, Value};
//!
//! struct MyStore { /* ... */ }
//!
//! #[async_trait]
//! impl RoomStore for MyStore {
//!     async fn write_value(&self, path: &str, value: Value) -> Result<(), BingoError> {
//!         todo!()
//!     }
//!
//!     async fn read_once(&self, path: &str) -> Result<Option<Value>, BingoError> {
//!         todo!()
//!     }
//!
//!     async fn update_fields(
//!         &self,
//!         path: &str,
//!         fields: Map<String, Value>,
//!     ) -> Result<(), BingoError> {
//!         todo!()
//!     }
//!
//!     async fn subscribe(&self, path: &str) -> Result<Subscription, BingoError> {
//!         todo!()
//!     }
//!
//!     async fn remove(&self, path: &str) -> Result<(), BingoError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::BingoError;

/// Default root node under which every room document lives.
pub const DEFAULT_ROOT_PATH: &str = "gameRooms";

/// A remote JSON document store with path-addressed atomic operations.
///
/// # Object Safety
///
/// This trait is object-safe, so `Arc<dyn RoomStore>` works for dynamic
/// dispatch. The controller is generic over `S: RoomStore` for the common case.
#[async_trait]
pub trait RoomStore: Send + Sync + 'static {
    /// Atomically overwrite the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Store`] on connectivity or permission failure.
    async fn write_value(&self, path: &str, value: Value) -> Result<(), BingoError>;

    /// Point-in-time read of the node at `path`; `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Store`] if the read could not be served.
    async fn read_once(&self, path: &str) -> Result<Option<Value>, BingoError>;

    /// Atomically merge `fields` into the node at `path`.
    ///
    /// Sibling fields not named in `fields` are untouched. A key may itself be
    /// a relative slash path (`players/<id>/board`), in which case that nested
    /// node is replaced as part of the same atomic update. A `null` value
    /// deletes the named field.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Store`] on connectivity or permission failure.
    async fn update_fields(
        &self,
        path: &str,
        fields: Map<String, Value>,
    ) -> Result<(), BingoError>;

    /// Subscribe to the node at `path`.
    ///
    /// The returned [`Subscription`] yields the current value immediately and
    /// then a full snapshot after every change that touches `path`. A
    /// snapshot of `None` means the node was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Store`] if the listener could not be attached.
    async fn subscribe(&self, path: &str) -> Result<Subscription, BingoError>;

    /// Delete the node at `path`. Removing an absent node succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`BingoError::Store`] on connectivity or permission failure.
    async fn remove(&self, path: &str) -> Result<(), BingoError>;
}

/// A live feed of snapshots for one store path.
///
/// Dropping the subscription (or calling [`unsubscribe`](Self::unsubscribe))
/// detaches the listener from the store.
///
/// # Cancel Safety
///
/// [`next`](Self::next) is cancel-safe and may be used inside `tokio::select!`.
pub struct Subscription {
    updates: mpsc::UnboundedReceiver<Option<Value>>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Build a subscription from a snapshot receiver and a detach callback.
    ///
    /// Store implementations push `Some(value)` for every snapshot and `None`
    /// when the node is deleted. `cancel` runs exactly once, on unsubscribe or
    /// drop.
    pub fn new(
        updates: mpsc::UnboundedReceiver<Option<Value>>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            updates,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Wait for the next snapshot.
    ///
    /// Returns:
    /// - `Some(Some(value))`: the node's current value
    /// - `Some(None)`: the node is absent
    /// - `None`: the store closed the feed
    pub async fn next(&mut self) -> Option<Option<Value>> {
        self.updates.recv().await
    }

    /// Detach from the store.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
        self.updates.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.cancel.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

// ── Path layout ─────────────────────────────────────────────────────

/// `{root}/{room_code}`
pub fn room_path(root: &str, room_code: &str) -> String {
    format!("{root}/{room_code}")
}

/// `{root}/{room_code}/players/{player_id}`
pub fn player_path(root: &str, room_code: &str, player_id: &str) -> String {
    format!("{root}/{room_code}/players/{player_id}")
}

/// `{root}/{room_code}/players/{player_id}/marks`
pub fn marks_path(root: &str, room_code: &str, player_id: &str) -> String {
    format!("{}/marks", player_path(root, room_code, player_id))
}

/// `{root}/{room_code}/players/{player_id}/wins`
pub fn wins_path(root: &str, room_code: &str, player_id: &str) -> String {
    format!("{}/wins", player_path(root, room_code, player_id))
}

/// Split a store path into its non-empty segments.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
