//! Winner arbitration without a central authority.
//!
//! A client whose mark completes a line writes the winner record and
//! `status = finished` to the room in one [`update_fields`] call. The write is
//! unconditional: the store has no compare-and-swap, so when two clients win
//! in the same instant the one applied last silently replaces the other, and
//! every subscriber converges on that single record. What keeps a decided
//! round decided is the client side: once any snapshot shows a winner, marks
//! are ignored (see [`check_mark`](crate::lifecycle::check_mark)) and no client
//! writes a winner again until the host resets.
//!
//! The win counter is bumped with a read followed by a write of `wins + 1`.
//! This is not atomic; two increments racing on the same player can lose one.
//! Only the client that owns the counter increments it, and only after its
//! declaration has stood unreplaced for a settle delay, so a racer whose
//! declaration was overwritten is not credited. A replacement that lands
//! after the delay still leaves two credited wins for one round.
//!
//! [`update_fields`]: crate::RoomStore::update_fields

use tracing::{debug, info};

use crate::error::Result;
use crate::lifecycle::finish_fields;
use crate::room::Winner;
use crate::store::RoomStore;

/// Write `winner` and `status = finished` to the room at `room_path`.
///
/// # Errors
///
/// Returns [`BingoError::Store`](crate::BingoError::Store) if the write fails.
pub async fn declare_winner<S>(store: &S, room_path: &str, winner: &Winner) -> Result<()>
where
    S: RoomStore + ?Sized,
{
    let fields = finish_fields(winner)?;
    store.update_fields(room_path, fields).await?;
    info!(
        room = room_path,
        player_id = %winner.player_id,
        "winner declared"
    );
    Ok(())
}

/// Read the counter at `wins_path` and write it back incremented.
///
/// A missing or malformed counter counts as zero. Returns the new value.
///
/// # Errors
///
/// Returns [`BingoError::Store`](crate::BingoError::Store) if the read or the
/// write fails.
pub async fn increment_wins<S>(store: &S, wins_path: &str) -> Result<u32>
where
    S: RoomStore + ?Sized,
{
    let current = store
        .read_once(wins_path)
        .await?
        .and_then(|v| v.as_u64())
        .and_then(|w| u32::try_from(w).ok())
        .unwrap_or(0);
    let next = current.saturating_add(1);
    store.write_value(wins_path, next.into()).await?;
    debug!(path = wins_path, wins = next, "win counter incremented");
    Ok(next)
}
