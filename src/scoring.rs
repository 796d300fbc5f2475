//! Scoring a submitted grid against the solution.

use crate::board::BlockColor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
    pub is_win: bool,
}

/// Score a full grid. Returns None while any cell is empty or the lengths differ;
/// partial grids are never scored.
pub fn evaluate(grid: &[Option<BlockColor>], solution: &[BlockColor]) -> Option<Score> {
    if grid.len() != solution.len() {
        return None;
    }
    let placed = grid.iter().copied().collect::<Option<Vec<BlockColor>>>()?;
    let correct = placed
        .iter()
        .zip(solution)
        .filter(|(placed, expected)| placed == expected)
        .count();
    let total = solution.len();
    Some(Score {
        correct,
        total,
        is_win: correct == total,
    })
}
