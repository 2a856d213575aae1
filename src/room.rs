//! Room document model as stored under `gameRooms/{roomCode}`.
//!
//! Field names match the stored JSON exactly (camelCase). Two decoding paths
//! exist:
//!
//! - the derived [`Deserialize`] impls, strict, for well-formed documents;
//! - [`Room::from_value`], lenient, used on every subscription snapshot. Any
//!   field that is missing or has the wrong type falls back to its default so
//!   that a half-written or legacy document never aborts the client. Board and
//!   mark shapes are repaired later, in [`crate::board`].

use std::collections::BTreeMap;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::board::fresh_marks;

/// Length of a generated room code.
pub const ROOM_CODE_LEN: usize = 5;

/// Stable per-device player identifier.
pub type PlayerId = String;

/// Epoch milliseconds, as written by every client.
pub type Timestamp = i64;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a random 5-character base-36 room code, uppercased.
///
/// Collisions with existing rooms are not checked.
pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .filter_map(|_| char::from_digit(rng.random_range(0..36), 36))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Trim and uppercase a user-entered room code; `None` if blank.
pub fn normalize_room_code(input: &str) -> Option<String> {
    let code = input.trim().to_uppercase();
    (!code.is_empty()).then_some(code)
}

// ── Types ───────────────────────────────────────────────────────────

/// Room lifecycle phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Players are joining; boards are visible but cannot be marked.
    #[default]
    Waiting,
    /// A round is running.
    Active,
    /// Someone won; waiting for the host to reset.
    Finished,
}

impl RoomStatus {
    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The winner record of a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    /// Winning player's identifier.
    pub player_id: PlayerId,
    /// Winning player's display name at the time of the win.
    #[serde(default)]
    pub name: String,
    /// When the winning write was issued.
    #[serde(default)]
    pub time: Timestamp,
}

impl Winner {
    /// Build a winner record.
    pub fn new(player_id: impl Into<PlayerId>, name: impl Into<String>, time: Timestamp) -> Self {
        Self {
            player_id: player_id.into(),
            name: name.into(),
            time,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let player_id = obj.get("playerId")?.as_str()?.to_string();
        Some(Self {
            player_id,
            name: string_field(obj, "name"),
            time: obj.get("time").and_then(Value::as_i64).unwrap_or_default(),
        })
    }
}

/// One player's entry under `players/{playerId}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Player {
    /// Display name.
    pub name: String,
    /// 25 words, row-major; index 12 is the center word.
    pub board: Vec<String>,
    /// One flag per board cell.
    pub marks: Vec<bool>,
    /// Lifetime win count.
    pub wins: u32,
    /// When the player first joined; display ordering only.
    pub joined_at: Timestamp,
}

impl Player {
    /// A new player with an unmarked board.
    pub fn new(name: impl Into<String>, board: Vec<String>, joined_at: Timestamp) -> Self {
        Self {
            name: name.into(),
            board,
            marks: fresh_marks(),
            wins: 0,
            joined_at,
        }
    }

    /// Whether cell `index` is marked. Out-of-range cells are unmarked.
    pub fn is_marked(&self, index: usize) -> bool {
        self.marks.get(index).copied().unwrap_or(false)
    }

    /// Lenient decode of a player entry.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        let board = obj
            .get("board")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|w| w.as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let marks = obj
            .get("marks")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(|m| m.as_bool().unwrap_or(false)).collect())
            .unwrap_or_default();
        Self {
            name: string_field(obj, "name"),
            board,
            marks,
            wins: obj
                .get("wins")
                .and_then(Value::as_u64)
                .and_then(|w| u32::try_from(w).ok())
                .unwrap_or_default(),
            joined_at: obj
                .get("joinedAt")
                .and_then(Value::as_i64)
                .unwrap_or_default(),
        }
    }
}

/// A room document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Room {
    /// Creation time.
    pub created_at: Timestamp,
    /// Lifecycle phase.
    pub status: RoomStatus,
    /// The creator; never reassigned.
    pub host_id: PlayerId,
    /// Set when the host starts a round, cleared on reset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Timestamp>,
    /// Set once per round by the first accepted win.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
    /// Players keyed by identifier.
    pub players: BTreeMap<PlayerId, Player>,
}

impl Room {
    /// A fresh waiting room with `host` as its only player.
    pub fn new(host_id: impl Into<PlayerId>, host: Player, created_at: Timestamp) -> Self {
        let host_id = host_id.into();
        let mut players = BTreeMap::new();
        players.insert(host_id.clone(), host);
        Self {
            created_at,
            status: RoomStatus::Waiting,
            host_id,
            start_time: None,
            winner: None,
            players,
        }
    }

    /// Whether `player_id` created this room.
    pub fn is_host(&self, player_id: &str) -> bool {
        !self.host_id.is_empty() && self.host_id == player_id
    }

    /// The entry for `player_id`, if present.
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    /// Encode as a store value.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Lenient decode of a room snapshot.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            tracing::warn!("room snapshot is not an object; using defaults");
            return Self::default();
        };
        let status = match obj.get("status") {
            None => RoomStatus::default(),
            Some(raw) => decode_or_default(raw, "status"),
        };
        let players = obj
            .get("players")
            .and_then(Value::as_object)
            .map(|players| {
                players
                    .iter()
                    .map(|(id, p)| (id.clone(), Player::from_value(p)))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            created_at: obj
                .get("createdAt")
                .and_then(Value::as_i64)
                .unwrap_or_default(),
            status,
            host_id: string_field(obj, "hostId"),
            start_time: obj.get("startTime").and_then(Value::as_i64),
            winner: obj.get("winner").and_then(Winner::from_value),
            players,
        }
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn decode_or_default<T: DeserializeOwned + Default>(raw: &Value, field: &str) -> T {
    match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(field, "malformed room field, using default: {e}");
            T::default()
        }
    }
}
