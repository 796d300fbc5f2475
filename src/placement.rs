//! Token placement: pick a colour up from the palette or the grid, drop it on a cell
//! or back on the palette.
//!
//! Moves take `&mut Board`, so two moves can never interleave. Every move either
//! applies completely or leaves the board untouched, and the token count is
//! conserved either way.

use crate::board::{Board, BlockColor};

/// Where a token is picked up from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Palette(usize),
    Grid(usize),
}

/// Where a token is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Grid(usize),
    /// Cancel: the token goes back to the palette.
    Palette,
}

/// An in-flight drag: a token lifted from `source`, not yet dropped.
///
/// Owned by the interaction layer. The board is not touched until the drag resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragOperation {
    pub source: Source,
    pub color: BlockColor,
}

impl DragOperation {
    /// Start a drag from `source`. None if the source holds no token.
    pub fn begin(board: &Board, source: Source) -> Option<Self> {
        peek(board, source).map(|color| Self { source, color })
    }

    /// The source still holds the lifted colour. False once the board changed underneath
    /// the drag; such a drag must not be dropped.
    pub fn is_current(&self, board: &Board) -> bool {
        peek(board, self.source) == Some(self.color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Token placed on a cell; `displaced` went back to the palette.
    Placed { displaced: Option<BlockColor> },
    /// Token returned to the palette.
    Returned,
    /// Nothing changed.
    Ignored,
}

fn peek(board: &Board, source: Source) -> Option<BlockColor> {
    match source {
        Source::Palette(i) => board.palette.get(i).copied(),
        Source::Grid(i) => board.grid.get(i).copied().flatten(),
    }
}

fn take(board: &mut Board, source: Source) -> Option<BlockColor> {
    match source {
        Source::Palette(i) if i < board.palette.len() => Some(board.palette.remove(i)),
        Source::Palette(_) => None,
        Source::Grid(i) => board.grid.get_mut(i).and_then(|cell| cell.take()),
    }
}

/// Move a token from `from` to `to`.
///
/// An empty source or an out-of-range cell is a no-op. Dropping onto an occupied cell
/// sends its occupant to the end of the palette; a cancelled drop appends the token.
pub fn apply_move(board: &mut Board, from: Source, to: Target) -> MoveOutcome {
    if let Target::Grid(cell) = to {
        if cell >= board.grid.len() {
            return MoveOutcome::Ignored;
        }
    }
    let Some(color) = take(board, from) else {
        return MoveOutcome::Ignored;
    };
    let outcome = match to {
        Target::Grid(cell) => {
            let displaced = board.grid[cell].replace(color);
            board.palette.extend(displaced);
            MoveOutcome::Placed { displaced }
        }
        Target::Palette => {
            board.palette.push(color);
            MoveOutcome::Returned
        }
    };
    debug_assert!(board.is_conserved());
    outcome
}
