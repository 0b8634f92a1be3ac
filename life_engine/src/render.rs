// render.rs - Diff between the last rendered generation and the current one
//
// The renderer keeps a `RenderDiff`, asks it what changed since its last pass,
// draws only those cells, and commits the snapshot it just drew.

use std::sync::Arc;

use crate::grid::Grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellChange {
    pub x: i64,
    pub y: i64,
    pub alive: bool,
}

/// Draw calls made by one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub fills: usize,
    pub clears: usize,
}

impl FrameStats {
    pub fn draw_calls(&self) -> usize {
        self.fills + self.clears
    }
}

pub struct RenderDiff {
    previous: Arc<Grid>,
}

impl RenderDiff {
    /// Starts from an all-dead grid, so the first pass reports every live cell.
    pub fn new(size: usize) -> Self {
        Self {
            previous: Arc::new(Grid::new(size)),
        }
    }

    /// Cells whose state in `current` differs from the last committed snapshot, row by row.
    pub fn changes<'a>(&'a self, current: &'a Grid) -> impl Iterator<Item = CellChange> + 'a {
        let n = current.size();
        (0..n).flat_map(move |y| {
            let row = current.row(y);
            row.iter().enumerate().filter_map(move |(x, &alive)| {
                let (x, y) = (x as i64, y as i64);
                (self.previous.get(x, y) != alive).then_some(CellChange { x, y, alive })
            })
        })
    }

    pub fn commit(&mut self, current: Arc<Grid>) {
        self.previous = current;
    }

    /// Diffs `current`, hands each change to `draw`, then commits `current`.
    pub fn render(&mut self, current: Arc<Grid>, mut draw: impl FnMut(CellChange)) -> FrameStats {
        let mut stats = FrameStats::default();
        for change in self.changes(&current) {
            if change.alive {
                stats.fills += 1;
            } else {
                stats.clears += 1;
            }
            draw(change);
        }
        self.commit(current);
        stats
    }
}
