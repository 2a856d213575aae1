//! Win detection over a 5×5 mark set.

use crate::board::GRID_SIZE;

/// Number of winning lines: every row, every column and both diagonals.
pub const LINE_COUNT: usize = 2 * GRID_SIZE + 2;

/// The cell indices of one winning line.
pub type Line = [usize; GRID_SIZE];

/// All winning lines, rows first, then columns, then the main diagonal and
/// the anti-diagonal.
pub const WIN_LINES: [Line; LINE_COUNT] = [
    [0, 1, 2, 3, 4],
    [5, 6, 7, 8, 9],
    [10, 11, 12, 13, 14],
    [15, 16, 17, 18, 19],
    [20, 21, 22, 23, 24],
    [0, 5, 10, 15, 20],
    [1, 6, 11, 16, 21],
    [2, 7, 12, 17, 22],
    [3, 8, 13, 18, 23],
    [4, 9, 14, 19, 24],
    [0, 6, 12, 18, 24],
    [4, 8, 12, 16, 20],
];

fn line_complete(marks: &[bool], line: &Line) -> bool {
    line.iter().all(|&cell| marks.get(cell).copied().unwrap_or(false))
}

/// `true` iff at least one winning line is fully marked.
///
/// Every cell counts, the center included. Missing entries in a short mark
/// set count as unmarked; entries past the last cell are ignored.
pub fn has_bingo(marks: &[bool]) -> bool {
    WIN_LINES.iter().any(|line| line_complete(marks, line))
}

/// Indices into [`WIN_LINES`] of every fully marked line.
pub fn completed_lines(marks: &[bool]) -> Vec<usize> {
    WIN_LINES
        .iter()
        .enumerate()
        .filter(|(_, line)| line_complete(marks, line))
        .map(|(i, _)| i)
        .collect()
}
