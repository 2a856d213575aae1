//! Personal board generation and repair.
//!
//! A board is 25 words laid out row-major on a 5×5 grid. Index
//! [`CENTER_INDEX`] always holds [`CENTER_WORD`]. Boards read back from the
//! store are normalized before use: anything that is not exactly 25 entries is
//! replaced with a freshly generated board, and the center is always forced.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::words::{WordPool, CENTER_WORD};

/// Width and height of the grid.
pub const GRID_SIZE: usize = 5;
/// Number of cells on a board.
pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;
/// Row 2, column 2.
pub const CENTER_INDEX: usize = CELL_COUNT / 2;

/// What [`normalize_board`] had to do to make a board valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardRepair {
    /// The board was already valid.
    Untouched,
    /// Only the center word was wrong and has been restored.
    CenterRestored,
    /// The board had the wrong shape and was replaced.
    Regenerated,
}

/// Generate a shuffled board from the pool.
pub fn generate_board<R: Rng + ?Sized>(pool: &WordPool, rng: &mut R) -> Vec<String> {
    generate_board_from(pool.words(), rng)
}

/// Generate a shuffled board from an explicit word list.
///
/// The list is shuffled uniformly and drawn in order into every slot except
/// the center. When fewer than 24 words are available the remaining slots are
/// filled with [`CENTER_WORD`].
pub fn generate_board_from<R: Rng + ?Sized>(mut words: Vec<String>, rng: &mut R) -> Vec<String> {
    words.shuffle(rng);
    let mut draws = words.into_iter();
    (0..CELL_COUNT)
        .map(|index| {
            if index == CENTER_INDEX {
                CENTER_WORD.to_string()
            } else {
                draws.next().unwrap_or_else(|| CENTER_WORD.to_string())
            }
        })
        .collect()
}

/// Make an externally observed board valid.
///
/// A board of the wrong length is discarded and regenerated from `pool`; a
/// board of the right length keeps every entry except the center, which is
/// forced to [`CENTER_WORD`].
pub fn normalize_board<R: Rng + ?Sized>(
    mut board: Vec<String>,
    pool: &WordPool,
    rng: &mut R,
) -> (Vec<String>, BoardRepair) {
    if board.len() != CELL_COUNT {
        tracing::debug!(len = board.len(), "regenerating malformed board");
        return (generate_board(pool, rng), BoardRepair::Regenerated);
    }
    match board.get_mut(CENTER_INDEX) {
        Some(center) if center.as_str() != CENTER_WORD => {
            *center = CENTER_WORD.to_string();
            (board, BoardRepair::CenterRestored)
        }
        _ => (board, BoardRepair::Untouched),
    }
}

/// An unmarked mark set.
pub fn fresh_marks() -> Vec<bool> {
    vec![false; CELL_COUNT]
}

/// Pad or truncate a mark set to exactly [`CELL_COUNT`] entries.
pub fn normalize_marks(mut marks: Vec<bool>) -> Vec<bool> {
    marks.resize(CELL_COUNT, false);
    marks
}

/// Board index for a row and column, if both are on the grid.
pub fn cell_index(row: usize, col: usize) -> Option<usize> {
    (row < GRID_SIZE && col < GRID_SIZE).then(|| row * GRID_SIZE + col)
}
