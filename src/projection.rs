//! Local view of a room snapshot.
//!
//! Every snapshot from the store is a full document, so the projection is
//! rebuilt from scratch each time. The only state carried between snapshots
//! is the [`BoardCache`], which keeps a board regenerated for a malformed
//! remote entry stable until the remote entry changes.

use rand::Rng;

use crate::board::{normalize_board, normalize_marks, BoardRepair};
use crate::room::{PlayerId, Room, RoomStatus, Timestamp};
use crate::win::completed_lines;
use crate::words::WordPool;

/// Name shown for players who have not entered one.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// One entry of the player list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerTag {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Display name, never empty.
    pub name: String,
    /// Lifetime wins.
    pub wins: u32,
    /// Whether this player created the room.
    pub is_host: bool,
    /// Whether this is the local player.
    pub is_you: bool,
}

/// The local player's board, repaired for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalBoard {
    /// 25 words with the center word at index 12.
    pub words: Vec<String>,
    /// 25 mark flags.
    pub marks: Vec<bool>,
    /// Indices into [`WIN_LINES`](crate::win::WIN_LINES) that are complete.
    pub completed_lines: Vec<usize>,
    /// What had to be fixed in the stored board.
    pub repair: BoardRepair,
}

/// Who won the round, from the local point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerBanner {
    /// Winner's identifier.
    pub player_id: PlayerId,
    /// Winner's display name.
    pub name: String,
    /// Whether the local player won.
    pub is_you: bool,
}

/// Everything the UI needs to render a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomProjection {
    /// Room code.
    pub room_code: String,
    /// Lifecycle phase.
    pub status: RoomStatus,
    /// Whether the local player is the host.
    pub is_host: bool,
    /// Number of players in the room.
    pub player_count: usize,
    /// Phase-appropriate hint for the local player.
    pub helper_text: String,
    /// Round time in milliseconds; `None` while waiting.
    pub elapsed_ms: Option<i64>,
    /// `elapsed_ms` as `m:ss`.
    pub timer_text: String,
    /// Players ordered by join time.
    pub players: Vec<PlayerTag>,
    /// The local player's board, if they are in the room.
    pub board: Option<LocalBoard>,
    /// The round winner, if decided.
    pub winner: Option<WinnerBanner>,
}

impl RoomProjection {
    /// Project `room` for `local_id` at time `now`.
    pub fn build<R: Rng + ?Sized>(
        room_code: &str,
        room: &Room,
        local_id: &str,
        now: Timestamp,
        cache: &mut BoardCache,
        pool: &WordPool,
        rng: &mut R,
    ) -> Self {
        let is_host = room.is_host(local_id);
        let elapsed_ms = elapsed_ms(room, now);

        let mut players: Vec<(&PlayerId, _)> = room.players.iter().collect();
        players.sort_by(|(a_id, a), (b_id, b)| {
            a.joined_at.cmp(&b.joined_at).then_with(|| a_id.cmp(b_id))
        });
        let players = players
            .into_iter()
            .map(|(id, p)| PlayerTag {
                player_id: id.clone(),
                name: display_name(&p.name),
                wins: p.wins,
                is_host: room.is_host(id),
                is_you: id == local_id,
            })
            .collect();

        let board = room.player(local_id).map(|p| {
            let (words, repair) = cache.normalize(&p.board, pool, rng);
            let marks = normalize_marks(p.marks.clone());
            LocalBoard {
                completed_lines: completed_lines(&marks),
                words,
                marks,
                repair,
            }
        });

        let winner = room.winner.as_ref().map(|w| WinnerBanner {
            player_id: w.player_id.clone(),
            name: display_name(&w.name),
            is_you: w.player_id == local_id,
        });

        Self {
            room_code: room_code.to_string(),
            status: room.status,
            is_host,
            player_count: room.players.len(),
            helper_text: helper_text(room.status, is_host, winner.as_ref()),
            timer_text: format_elapsed(elapsed_ms.unwrap_or(0)),
            elapsed_ms,
            players,
            board,
            winner,
        }
    }
}

/// Remembers the last board regenerated for a malformed remote board.
#[derive(Debug, Default)]
pub struct BoardCache {
    observed: Option<Vec<String>>,
    normalized: Vec<String>,
    repair: Option<BoardRepair>,
}

impl BoardCache {
    /// Normalize `observed`, reusing the previous result if it is unchanged.
    pub fn normalize<R: Rng + ?Sized>(
        &mut self,
        observed: &[String],
        pool: &WordPool,
        rng: &mut R,
    ) -> (Vec<String>, BoardRepair) {
        if let (Some(prev), Some(repair)) = (&self.observed, self.repair) {
            if prev.as_slice() == observed {
                return (self.normalized.clone(), repair);
            }
        }
        let (normalized, repair) = normalize_board(observed.to_vec(), pool, rng);
        self.observed = Some(observed.to_vec());
        self.normalized = normalized.clone();
        self.repair = Some(repair);
        (normalized, repair)
    }
}

/// Round time: running while active, frozen at the winning time once finished.
pub fn elapsed_ms(room: &Room, now: Timestamp) -> Option<i64> {
    let start = room.start_time?;
    let end = match room.status {
        RoomStatus::Waiting => return None,
        RoomStatus::Active => now,
        RoomStatus::Finished => room.winner.as_ref().map_or(now, |w| w.time),
    };
    Some(end.saturating_sub(start).max(0))
}

/// Format milliseconds as `m:ss`.
pub fn format_elapsed(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn display_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        ANONYMOUS_NAME.to_string()
    } else {
        name.to_string()
    }
}

fn helper_text(status: RoomStatus, is_host: bool, winner: Option<&WinnerBanner>) -> String {
    match (status, winner) {
        (RoomStatus::Waiting, _) if is_host => {
            "You're the host. Start the game when everyone has joined.".to_string()
        }
        (RoomStatus::Waiting, _) => "Waiting for the host to start the game.".to_string(),
        (RoomStatus::Active, _) => "Tap your words as you hear them. First full line wins!".to_string(),
        (RoomStatus::Finished, Some(w)) if w.is_you => "BINGO! You won this round.".to_string(),
        (RoomStatus::Finished, Some(w)) => format!("{} got bingo!", w.name),
        (RoomStatus::Finished, None) => "Round over.".to_string(),
    }
}
