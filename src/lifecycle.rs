//! Room lifecycle state machine.
//!
//! ```text
//!   waiting ──start (host)──▶ active ──first bingo──▶ finished
//!      ▲                                                 │
//!      └──────────────────reset (host)───────────────────┘
//! ```
//!
//! Transitions are expressed as the field maps passed to
//! [`RoomStore::update_fields`](crate::RoomStore::update_fields), so each
//! transition lands in the store as one atomic write. Precondition checks
//! return an [`IgnoredReason`] instead of an error: an action that is not
//! valid in the current state is a no-op, not a failure.

use rand::Rng;
use serde_json::{json, Map, Value};

use crate::board::{fresh_marks, generate_board, CELL_COUNT};
use crate::room::{Room, RoomStatus, Timestamp, Winner};
use crate::words::WordPool;

/// The three legal status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `waiting → active`, host only.
    Start,
    /// `active → finished`, on the first accepted win.
    Finish,
    /// `finished → waiting`, host only.
    Reset,
}

impl Transition {
    /// Status the room must be in.
    pub fn from(self) -> RoomStatus {
        match self {
            Self::Start => RoomStatus::Waiting,
            Self::Finish => RoomStatus::Active,
            Self::Reset => RoomStatus::Finished,
        }
    }

    /// Status the room ends up in.
    pub fn to(self) -> RoomStatus {
        match self {
            Self::Start => RoomStatus::Active,
            Self::Finish => RoomStatus::Finished,
            Self::Reset => RoomStatus::Waiting,
        }
    }

    /// Whether only the host may trigger this transition.
    pub fn host_only(self) -> bool {
        matches!(self, Self::Start | Self::Reset)
    }
}

/// Whether `from → to` is one of the legal transitions.
pub fn can_transition(from: RoomStatus, to: RoomStatus) -> bool {
    [Transition::Start, Transition::Finish, Transition::Reset]
        .iter()
        .any(|t| t.from() == from && t.to() == to)
}

/// Why an action was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    /// A host-only action was attempted by someone else.
    NotHost,
    /// The room is in the wrong phase for this action.
    WrongPhase {
        /// Phase the action requires.
        expected: RoomStatus,
        /// Phase the room is in.
        actual: RoomStatus,
    },
    /// A winner is already recorded for this round.
    WinnerDecided,
    /// The cell is already marked.
    AlreadyMarked,
    /// The cell index is off the board.
    CellOutOfRange(usize),
    /// The local player has no entry in the room.
    NotAPlayer,
}

impl std::fmt::Display for IgnoredReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotHost => f.write_str("only the host can do that"),
            Self::WrongPhase { expected, actual } => {
                write!(f, "room is {actual}, needs to be {expected}")
            }
            Self::WinnerDecided => f.write_str("this round already has a winner"),
            Self::AlreadyMarked => f.write_str("cell already marked"),
            Self::CellOutOfRange(index) => write!(f, "cell {index} is off the board"),
            Self::NotAPlayer => f.write_str("you are not in this room"),
        }
    }
}

/// Result of a host action such as start or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The write was issued.
    Applied,
    /// Nothing was written.
    Ignored(IgnoredReason),
}

/// Result of marking a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The mark was written; no line is complete.
    Marked,
    /// The mark completed a line and a winner declaration was written.
    Bingo,
    /// Nothing was written.
    Ignored(IgnoredReason),
}

/// Check host gating and the source phase of `transition`.
pub fn check_transition(
    room: &Room,
    local_id: &str,
    transition: Transition,
) -> Result<(), IgnoredReason> {
    if transition.host_only() && !room.is_host(local_id) {
        return Err(IgnoredReason::NotHost);
    }
    if room.status != transition.from() {
        return Err(IgnoredReason::WrongPhase {
            expected: transition.from(),
            actual: room.status,
        });
    }
    Ok(())
}

/// Check whether the local player may mark cell `index`.
pub fn check_mark(room: &Room, local_id: &str, index: usize) -> Result<(), IgnoredReason> {
    if room.status != RoomStatus::Active {
        return Err(IgnoredReason::WrongPhase {
            expected: RoomStatus::Active,
            actual: room.status,
        });
    }
    if room.winner.is_some() {
        return Err(IgnoredReason::WinnerDecided);
    }
    if index >= CELL_COUNT {
        return Err(IgnoredReason::CellOutOfRange(index));
    }
    let player = room.player(local_id).ok_or(IgnoredReason::NotAPlayer)?;
    if player.is_marked(index) {
        return Err(IgnoredReason::AlreadyMarked);
    }
    Ok(())
}

/// Fields for `waiting → active`: start the clock and drop any stale winner.
pub fn start_fields(now: Timestamp) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("status".into(), json!(RoomStatus::Active.as_str()));
    fields.insert("startTime".into(), json!(now));
    fields.insert("winner".into(), Value::Null);
    fields
}

/// Fields for `active → finished`: the winner record and the status together.
pub fn finish_fields(winner: &Winner) -> serde_json::Result<Map<String, Value>> {
    let mut fields = Map::new();
    fields.insert("winner".into(), serde_json::to_value(winner)?);
    fields.insert("status".into(), json!(RoomStatus::Finished.as_str()));
    Ok(fields)
}

/// Fields for `finished → waiting`.
///
/// Clears the winner and start time and gives every player currently in the
/// room a new board from `pool` with no marks. Wins, names and join times are
/// kept.
pub fn reset_fields<R: Rng + ?Sized>(
    room: &Room,
    pool: &WordPool,
    rng: &mut R,
) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("status".into(), json!(RoomStatus::Waiting.as_str()));
    fields.insert("winner".into(), Value::Null);
    fields.insert("startTime".into(), Value::Null);
    for player_id in room.players.keys() {
        fields.insert(
            format!("players/{player_id}/board"),
            json!(generate_board(pool, rng)),
        );
        fields.insert(format!("players/{player_id}/marks"), json!(fresh_marks()));
    }
    fields
}
