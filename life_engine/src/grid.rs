// grid.rs - Square boolean population grid

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An N×N boolean matrix stored row-major.
///
/// Every coordinate outside `[0, N)` reads as dead and ignores writes, so
/// neighbor lookups and pattern stamps near the border need no special cases.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<bool>,
}

impl Grid {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![false; size * size],
        }
    }

    /// Builds a grid with the given cells alive; out-of-range cells are dropped.
    pub fn with_live_cells(size: usize, live: impl IntoIterator<Item = (i64, i64)>) -> Self {
        let mut grid = Self::new(size);
        for (x, y) in live {
            grid.set(x, y, true);
        }
        grid
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let n = self.size as i64;
        if x < 0 || y < 0 || x >= n || y >= n {
            return None;
        }
        Some(y as usize * self.size + x as usize)
    }

    #[inline]
    pub fn get(&self, x: i64, y: i64) -> bool {
        self.index(x, y).is_some_and(|idx| self.cells[idx])
    }

    #[inline]
    pub fn set(&mut self, x: i64, y: i64, alive: bool) {
        if let Some(idx) = self.index(x, y) {
            self.cells[idx] = alive;
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|&&alive| alive).count()
    }

    /// Coordinates of every live cell, row by row.
    pub fn live_cells(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(move |(idx, _)| ((idx % size) as i64, (idx / size) as i64))
    }

    pub(crate) fn row(&self, y: usize) -> &[bool] {
        &self.cells[y * self.size..(y + 1) * self.size]
    }

    pub(crate) fn row_mut(&mut self, y: usize) -> &mut [bool] {
        &mut self.cells[y * self.size..(y + 1) * self.size]
    }

    /// Hash of the full cell state, used to recognise repeated generations.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.size.hash(&mut hasher);
        self.cells.hash(&mut hasher);
        hasher.finish()
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("size", &self.size)
            .field("live", &self.live_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let mut grid = Grid::new(8);
        grid.set(3, 5, true);
        assert!(grid.get(3, 5));
        assert!(!grid.get(5, 3));
        grid.set(3, 5, false);
        assert!(!grid.get(3, 5));
    }

    #[test]
    fn out_of_bounds_reads_dead_and_ignores_writes() {
        let mut grid = Grid::new(4);
        assert!(!grid.get(-1, 0));
        assert!(!grid.get(0, -1));
        assert!(!grid.get(4, 4));
        assert!(!grid.get(i64::MAX, i64::MIN));

        grid.set(-1, 0, true);
        grid.set(4, 0, true);
        grid.set(0, 4, true);
        assert_eq!(grid.live_count(), 0);
    }

    #[test]
    fn live_cells_are_reported_row_major() {
        let grid = Grid::with_live_cells(5, [(4, 0), (1, 2), (0, 2), (9, 9)]);
        let live: Vec<_> = grid.live_cells().collect();
        assert_eq!(live, vec![(4, 0), (0, 2), (1, 2)]);
        assert_eq!(grid.live_count(), 3);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = Grid::with_live_cells(6, [(1, 1), (2, 2)]);
        let b = Grid::with_live_cells(6, [(2, 2), (1, 1)]);
        let c = Grid::with_live_cells(6, [(1, 1)]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn clear_kills_everything() {
        let mut grid = Grid::with_live_cells(3, [(0, 0), (1, 1), (2, 2)]);
        grid.clear();
        assert_eq!(grid.live_count(), 0);
    }
}
