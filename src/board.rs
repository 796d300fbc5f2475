//! Board generation: solution pattern, placement palette, empty user grid.

use crate::level::LevelConfig;
use rand::Rng;
use rand::seq::SliceRandom;

/// The eight block colours of the system palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockColor {
    Red,
    Blue,
    Emerald,
    Amber,
    Violet,
    Pink,
    Cyan,
    Lime,
}

impl BlockColor {
    pub const ALL: [Self; 8] = [
        Self::Red,
        Self::Blue,
        Self::Emerald,
        Self::Amber,
        Self::Violet,
        Self::Pink,
        Self::Cyan,
        Self::Lime,
    ];

    /// Position in [`BlockColor::ALL`]; theme colours are indexed by it.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Emerald => "emerald",
            Self::Amber => "amber",
            Self::Violet => "violet",
            Self::Pink => "pink",
            Self::Cyan => "cyan",
            Self::Lime => "lime",
        }
    }
}

/// One level's board. Owned by the active round and rebuilt for every level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub grid_size: usize,
    /// Target pattern, row-major, `grid_size²` long.
    pub solution: Vec<BlockColor>,
    /// Tokens available for placement. Order is display order only.
    pub palette: Vec<BlockColor>,
    /// Player's placements, row-major, same length as `solution`.
    pub grid: Vec<Option<BlockColor>>,
    /// Extra palette colour absent from the solution, when the level has one.
    pub distractor: Option<BlockColor>,
}

impl Board {
    /// Build a fresh board for `config`.
    ///
    /// `color_count` is clamped to `1..=8`: asking for more colours than the system
    /// palette holds yields all eight. The distractor is the first system colour not
    /// used by the level; when every colour is in use no distractor is added.
    pub fn generate<R: Rng>(config: &LevelConfig, rng: &mut R) -> Self {
        let cells = config.cell_count();
        let count = config.color_count.clamp(1, BlockColor::ALL.len());

        let mut selected = BlockColor::ALL.to_vec();
        selected.shuffle(rng);
        selected.truncate(count);

        let solution: Vec<BlockColor> = (0..cells)
            .map(|_| selected[rng.random_range(0..selected.len())])
            .collect();

        let distractor = config
            .distraction
            .then(|| BlockColor::ALL.into_iter().find(|c| !selected.contains(c)))
            .flatten();

        let mut palette = solution.clone();
        palette.extend(distractor);
        palette.shuffle(rng);

        Self {
            grid_size: config.grid_size,
            solution,
            palette,
            grid: vec![None; cells],
            distractor,
        }
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.solution.len()
    }

    pub fn filled_count(&self) -> usize {
        self.grid.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.grid.iter().all(Option::is_some)
    }

    /// Token conservation: palette plus placed tokens equals solution plus distractor.
    pub fn is_conserved(&self) -> bool {
        self.palette.len() + self.filled_count()
            == self.solution.len() + usize::from(self.distractor.is_some())
    }
}
