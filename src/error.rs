//! Error types for the bingo room client.

use thiserror::Error;

/// Input problems caught before any remote call is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The display name was empty after trimming.
    #[error("please enter your name")]
    EmptyName,

    /// The room code was empty after trimming.
    #[error("please enter a room code")]
    EmptyRoomCode,

    /// A custom word was empty after trimming.
    #[error("custom words cannot be empty")]
    EmptyWord,
}

/// Errors that can occur when using the bingo room client.
#[derive(Debug, Error)]
pub enum BingoError {
    /// User input was rejected locally.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// No room document exists for the given code.
    #[error("room {room_code} not found")]
    NotFound {
        /// The normalized code that was looked up.
        room_code: String,
    },

    /// The backing store rejected or failed a read or write.
    #[error("store error: {0}")]
    Store(String),

    /// The room document vanished while subscribed.
    #[error("room {room_code} was closed")]
    RoomClosed {
        /// Code of the room that disappeared.
        room_code: String,
    },

    /// Attempted a room operation but the controller is not in a room.
    #[error("not in a room")]
    NotInRoom,

    /// Failed to serialize or deserialize a room document.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BingoError {
    /// Returns `true` if the error was raised before contacting the store.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// A specialized [`Result`] type for bingo room operations.
pub type Result<T> = std::result::Result<T, BingoError>;
