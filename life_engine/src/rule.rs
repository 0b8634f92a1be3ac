// rule.rs - Conway's B3/S23 rule and the whole-grid reference step

use crate::grid::Grid;

/// Moore neighborhood offsets, clockwise from the north-west corner.
pub const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (-1, -1), (0, -1), (1, -1),
    (1, 0),
    (1, 1), (0, 1), (-1, 1),
    (-1, 0),
];

/// Next state of a cell from its current state and live neighbor count.
#[inline]
pub fn next_state(alive: bool, live_neighbors: u8) -> bool {
    match (alive, live_neighbors) {
        (true, 2) | (true, 3) => true,   // Survival
        (false, 3)            => true,   // Birth
        _                     => false,  // Under/overpopulation or stays dead
    }
}

/// Live cells among the eight neighbors of (x, y). Cells beyond the border count as dead.
#[inline]
pub fn live_neighbors(grid: &Grid, x: i64, y: i64) -> u8 {
    NEIGHBOR_OFFSETS
        .iter()
        .filter(|&&(dx, dy)| grid.get(x + dx, y + dy))
        .count() as u8
}

#[inline]
pub fn next_cell(grid: &Grid, x: i64, y: i64) -> bool {
    next_state(grid.get(x, y), live_neighbors(grid, x, y))
}

/// Single-threaded whole-grid generation. The chunked engine must agree with it exactly.
pub fn advance(grid: &Grid) -> Grid {
    let n = grid.size() as i64;
    let mut next = Grid::new(grid.size());
    for y in 0..n {
        for x in 0..n {
            next.set(x, y, next_cell(grid, x, y));
        }
    }
    next
}
