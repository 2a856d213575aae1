//! # Bingo Room Client
//!
//! Room synchronization and game-state core for a multiplayer word bingo party
//! game played over a shared real-time JSON document store.
//!
//! Every connected client holds a copy of the room document and mutates it
//! through small atomic writes. There is no server-side game logic: the host
//! starts and resets rounds, each player writes only their own marks, and the
//! first client to complete a line declares itself the winner.
//!
//! ## Features
//!
//! - **Store-agnostic**: implement the [`RoomStore`] trait for any backend
//! - **Confirmed state only**: the UI renders snapshots pushed by the store,
//!   never optimistic local edits
//! - **Event-driven**: receive typed [`RoomEvent`]s via a channel
//! - **In-memory store**: the default `memory-store` feature provides
//!   [`MemoryStore`] for tests, demos and offline play
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use bingo_room_client::{
//!     BingoConfig, MemoryKeyValueStore, MemoryStore, RoomEvent, RoomSyncController,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), bingo_room_client::BingoError> {
//! let store = Arc::new(MemoryStore::new());
//! let (mut host, mut events) =
//!     RoomSyncController::new(store, MemoryKeyValueStore::new(), BingoConfig::default());
//!
//! let code = host.create("Ana").await?;
//! if let Some(RoomEvent::Snapshot(view)) = events.recv().await {
//!     assert_eq!(view.room_code, code);
//!     assert!(view.is_host);
//! }
//! host.detach().await;
//! # Ok(())
//! # }
//! ```

pub mod arbiter;
pub mod board;
pub mod controller;
pub mod error;
pub mod event;
pub mod kv;
pub mod lifecycle;
pub mod projection;
pub mod room;
pub mod store;
pub mod stores;
pub mod win;
pub mod words;

// Re-export primary types for ergonomic imports.
pub use controller::{BingoConfig, RoomSyncController};
pub use error::{BingoError, ValidationError};
pub use event::RoomEvent;
pub use kv::{KeyValueStore, LocalProfile, MemoryKeyValueStore};
pub use lifecycle::{ActionOutcome, IgnoredReason, MarkOutcome};
pub use projection::RoomProjection;
pub use room::{Player, Room, RoomStatus, Winner};
pub use store::{RoomStore, Subscription};
pub use words::WordPool;

#[cfg(feature = "memory-store")]
pub use stores::MemoryStore;
