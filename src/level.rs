//! Level configuration: board parameters for a (mode, difficulty, level) triple.

use crate::{Difficulty, GameMode};

/// Board parameters for one level. Derived, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelConfig {
    /// Cells per side (2, 3 or 4).
    pub grid_size: usize,
    /// Distinct colours drawn from the system palette for the solution.
    pub color_count: usize,
    /// Memorize countdown in seconds.
    pub memorize_secs: u32,
    /// Palette carries one extra colour that is absent from the solution.
    pub distraction: bool,
}

impl LevelConfig {
    const fn new(grid_size: usize, color_count: usize, memorize_secs: u32, distraction: bool) -> Self {
        Self {
            grid_size,
            color_count,
            memorize_secs,
            distraction,
        }
    }

    /// Number of cells on the board (grid_size²).
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.grid_size * self.grid_size
    }
}

const PRACTICE_EASY: LevelConfig = LevelConfig::new(2, 3, 5, false);
const PRACTICE_MEDIUM: LevelConfig = LevelConfig::new(3, 4, 5, false);
const PRACTICE_HARD: LevelConfig = LevelConfig::new(4, 6, 8, false);

/// Challenge ladder: (last level of the tier, config).
const CHALLENGE_TIERS: [(u32, LevelConfig); 3] = [
    (3, LevelConfig::new(2, 3, 5, false)),
    (7, LevelConfig::new(3, 4, 5, false)),
    (12, LevelConfig::new(3, 5, 4, false)),
];

/// Everything past the last tier.
const CHALLENGE_TOP: LevelConfig = LevelConfig::new(4, 6, 4, true);

/// Fixed practice board for a difficulty.
pub fn practice_config(difficulty: Difficulty) -> LevelConfig {
    match difficulty {
        Difficulty::Easy => PRACTICE_EASY,
        Difficulty::Medium => PRACTICE_MEDIUM,
        Difficulty::Hard => PRACTICE_HARD,
    }
}

/// Challenge board for a 1-indexed level. Level 0 is treated as level 1.
pub fn challenge_config(level: u32) -> LevelConfig {
    let level = level.max(1);
    CHALLENGE_TIERS
        .iter()
        .find(|(last, _)| level <= *last)
        .map(|(_, config)| *config)
        .unwrap_or(CHALLENGE_TOP)
}

/// Resolve the board for a round. Practice ignores `level`; challenge ignores `difficulty`.
/// A missing difficulty means easy.
pub fn resolve(mode: GameMode, difficulty: Option<Difficulty>, level: u32) -> LevelConfig {
    match mode {
        GameMode::Practice => practice_config(difficulty.unwrap_or_default()),
        GameMode::Challenge => challenge_config(level),
    }
}
