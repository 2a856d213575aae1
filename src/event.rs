//! Events emitted by the room sync loop.

use crate::projection::RoomProjection;
use crate::room::Winner;

/// Something the UI should react to.
///
/// Events arrive on the receiver returned by
/// [`RoomSyncController::new`](crate::RoomSyncController::new). Every
/// [`Snapshot`](Self::Snapshot) is a complete view of the room; the UI should
/// re-render from it rather than patch earlier state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// The room document changed (or was first loaded).
    Snapshot(Box<RoomProjection>),

    /// The winner field was set, or replaced by a racing declaration, in
    /// this snapshot.
    ///
    /// Always emitted right after the [`Snapshot`](Self::Snapshot) that
    /// carried the change.
    WinnerDeclared {
        /// Room code.
        room_code: String,
        /// The recorded winner.
        winner: Winner,
    },

    /// One-second timer refresh while a round is active.
    Tick {
        /// Room code.
        room_code: String,
        /// Milliseconds since the round started.
        elapsed_ms: i64,
        /// `elapsed_ms` as `m:ss`.
        timer_text: String,
    },

    /// The room document disappeared while subscribed. The session is over
    /// and the UI should return to setup.
    RoomClosed {
        /// Code of the vanished room.
        room_code: String,
    },

    /// The local client detached from the room (leave or room switch).
    Detached {
        /// Room code.
        room_code: String,
    },
}

impl RoomEvent {
    /// The room this event belongs to.
    pub fn room_code(&self) -> &str {
        match self {
            Self::Snapshot(p) => &p.room_code,
            Self::WinnerDeclared { room_code, .. }
            | Self::Tick { room_code, .. }
            | Self::RoomClosed { room_code }
            | Self::Detached { room_code } => room_code,
        }
    }
}
