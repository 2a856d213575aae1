//! Concrete [`RoomStore`](crate::RoomStore) implementations.
//!
//! | Feature        | Store           |
//! |----------------|-----------------|
//! | `memory-store` | [`MemoryStore`] |
//!
//! Remote backends (a hosted real-time database, a custom sync server) live
//! outside this crate and implement [`RoomStore`](crate::RoomStore) directly.

#[cfg(feature = "memory-store")]
pub mod memory;

#[cfg(feature = "memory-store")]
pub use memory::{MemoryStore, NotificationHold, StoreOp, StoreOpKind};
