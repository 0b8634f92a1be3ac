// mutation.rs - Deferred grid edits, applied by the coordinator between generations

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

use crate::grid::Grid;
use crate::patterns::{self, Pattern};

/// A deferred edit of the population grid.
///
/// Commands carry their own parameters and run exactly once, after a
/// generation has been merged and before the next one starts.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Kill every cell.
    Clear,
    /// Each cell independently comes alive with probability `density`
    /// (the engine default when `None`). Cells not picked keep their state.
    RandomFill { density: Option<f64>, seed: Option<u64> },
    /// Set the given relative cells alive, anchored at (x, y).
    Stamp { x: i64, y: i64, cells: Vec<(i64, i64)> },
    SetCell { x: i64, y: i64, alive: bool },
    /// Sprinkle 15 to 34 live cells within a few cells of (x, y).
    Scatter { x: i64, y: i64, seed: Option<u64> },
}

const SCATTER_MIN_CELLS: u32 = 15;
const SCATTER_EXTRA_CELLS: u32 = 20;
const SCATTER_REACH: i64 = 5;

impl Mutation {
    pub fn stamp(pattern: &Pattern, x: i64, y: i64) -> Self {
        Mutation::Stamp {
            x,
            y,
            cells: pattern.cells.to_vec(),
        }
    }

    pub fn glider(x: i64, y: i64) -> Self {
        Self::stamp(&patterns::GLIDER, x, y)
    }

    pub fn glider_gun(x: i64, y: i64) -> Self {
        Self::stamp(&patterns::GOSPER_GLIDER_GUN, x, y)
    }

    pub fn random_fill() -> Self {
        Mutation::RandomFill { density: None, seed: None }
    }

    /// Short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Clear => "clear",
            Mutation::RandomFill { .. } => "random_fill",
            Mutation::Stamp { .. } => "stamp",
            Mutation::SetCell { .. } => "set_cell",
            Mutation::Scatter { .. } => "scatter",
        }
    }

    /// Applies the command. Anything falling outside the grid is clipped.
    pub fn apply(&self, grid: &mut Grid, default_density: f64) {
        match self {
            Mutation::Clear => grid.clear(),
            Mutation::RandomFill { density, seed } => {
                let p = probability(density.unwrap_or(default_density));
                let mut rng = rng_for(*seed);
                let n = grid.size() as i64;
                for y in 0..n {
                    for x in 0..n {
                        if rng.gen_bool(p) {
                            grid.set(x, y, true);
                        }
                    }
                }
            }
            Mutation::Stamp { x, y, cells } => {
                for &(dx, dy) in cells {
                    grid.set(x.saturating_add(dx), y.saturating_add(dy), true);
                }
            }
            Mutation::SetCell { x, y, alive } => grid.set(*x, *y, *alive),
            Mutation::Scatter { x, y, seed } => {
                let mut rng = rng_for(*seed);
                let count = SCATTER_MIN_CELLS + rng.gen_range(0..SCATTER_EXTRA_CELLS);
                for _ in 0..count {
                    let dx = rng.gen_range(-SCATTER_REACH..SCATTER_REACH);
                    let dy = rng.gen_range(-SCATTER_REACH..SCATTER_REACH);
                    grid.set(x.saturating_add(dx), y.saturating_add(dy), true);
                }
            }
        }
    }
}

fn probability(density: f64) -> f64 {
    if density.is_finite() { density.clamp(0.0, 1.0) } else { 0.0 }
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Last-in-first-out queue of pending mutations.
///
/// Any caller may push at any time. Only the coordinator drains; a drain takes
/// the whole pending stack at once, so commands pushed while a drain is being
/// applied wait for the next generation.
#[derive(Debug, Default)]
pub struct MutationQueue {
    pending: Mutex<Vec<Mutation>>,
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, mutation: Mutation) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(mutation);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every pending command, most recently pushed first.
    pub fn take_all(&self) -> Vec<Mutation> {
        let mut taken = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        taken.reverse();
        taken
    }

    /// Pops and applies every pending command in LIFO order; returns how many ran.
    pub fn drain_into(&self, grid: &mut Grid, default_density: f64) -> usize {
        let commands = self.take_all();
        for command in &commands {
            command.apply(grid, default_density);
        }
        commands.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_runs_most_recent_first() {
        let queue = MutationQueue::new();
        queue.push(Mutation::SetCell { x: 0, y: 0, alive: true });   // A
        queue.push(Mutation::SetCell { x: 0, y: 0, alive: false });  // B
        queue.push(Mutation::SetCell { x: 1, y: 1, alive: true });   // C

        let order: Vec<_> = queue.take_all();
        assert_eq!(
            order,
            vec![
                Mutation::SetCell { x: 1, y: 1, alive: true },
                Mutation::SetCell { x: 0, y: 0, alive: false },
                Mutation::SetCell { x: 0, y: 0, alive: true },
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn push_after_a_drain_waits_for_the_next_one() {
        let queue = MutationQueue::new();
        queue.push(Mutation::Clear);
        let taken = queue.take_all();
        queue.push(Mutation::SetCell { x: 1, y: 1, alive: true });

        assert_eq!(taken, vec![Mutation::Clear]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take_all(), vec![Mutation::SetCell { x: 1, y: 1, alive: true }]);
    }

    #[test]
    fn lifo_means_the_first_push_wins_on_conflict() {
        let queue = MutationQueue::new();
        let mut grid = Grid::new(4);
        queue.push(Mutation::SetCell { x: 2, y: 2, alive: true });
        queue.push(Mutation::SetCell { x: 2, y: 2, alive: false });
        assert_eq!(queue.drain_into(&mut grid, 0.15), 2);
        assert!(grid.get(2, 2));
    }

    #[test]
    fn clear_pushed_last_runs_first() {
        let mut grid = Grid::new(32);
        let queue = MutationQueue::new();
        queue.push(Mutation::RandomFill { density: Some(0.5), seed: Some(7) });
        queue.push(Mutation::Clear);
        queue.drain_into(&mut grid, 0.15);
        assert!(grid.live_count() > 0);

        queue.push(Mutation::Clear);
        queue.push(Mutation::RandomFill { density: Some(0.5), seed: Some(7) });
        queue.drain_into(&mut grid, 0.15);
        assert_eq!(grid.live_count(), 0);
    }

    #[test]
    fn random_fill_only_adds_cells() {
        let mut grid = Grid::with_live_cells(16, [(3, 3)]);
        Mutation::RandomFill { density: Some(0.0), seed: Some(1) }.apply(&mut grid, 0.15);
        assert_eq!(grid.live_count(), 1);

        Mutation::RandomFill { density: Some(1.0), seed: Some(1) }.apply(&mut grid, 0.15);
        assert_eq!(grid.live_count(), 16 * 16);
    }

    #[test]
    fn random_fill_density_is_roughly_honoured() {
        let mut grid = Grid::new(200);
        Mutation::RandomFill { density: None, seed: Some(42) }.apply(&mut grid, 0.15);
        let ratio = grid.live_count() as f64 / (200.0 * 200.0);
        assert!((0.13..0.17).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn seeded_random_fill_is_reproducible() {
        let mut a = Grid::new(40);
        let mut b = Grid::new(40);
        let fill = Mutation::RandomFill { density: Some(0.3), seed: Some(99) };
        fill.apply(&mut a, 0.15);
        fill.apply(&mut b, 0.15);
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_density_is_clamped() {
        let mut grid = Grid::new(8);
        Mutation::RandomFill { density: Some(f64::NAN), seed: Some(3) }.apply(&mut grid, 0.15);
        assert_eq!(grid.live_count(), 0);
        Mutation::RandomFill { density: Some(7.0), seed: Some(3) }.apply(&mut grid, 0.15);
        assert_eq!(grid.live_count(), 64);
    }

    #[test]
    fn scatter_stays_near_its_anchor() {
        let mut grid = Grid::new(100);
        Mutation::Scatter { x: 50, y: 50, seed: Some(5) }.apply(&mut grid, 0.15);
        let live: Vec<_> = grid.live_cells().collect();
        assert!(!live.is_empty() && live.len() <= 34);
        assert!(live.iter().all(|&(x, y)| (45..55).contains(&x) && (45..55).contains(&y)));
    }

    #[test]
    fn stamp_fully_off_grid_is_a_no_op() {
        let mut grid = Grid::new(10);
        Mutation::glider_gun(i64::MAX - 3, 2).apply(&mut grid, 0.15);
        Mutation::glider(-100, -100).apply(&mut grid, 0.15);
        assert_eq!(grid.live_count(), 0);
    }
}
