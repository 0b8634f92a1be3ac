// store.rs - The current generation, published by the coordinator to everyone else
//
// `GridStore` is the only writer and is owned by the coordinator task.
// `GridReader` handles are cheap clones held by workers and by the engine
// handle for point queries and render snapshots.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::{EngineError, Result};
use crate::grid::Grid;

/// Bookkeeping for the most recent cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleStats {
    /// Time from opening the previous cycle to merging its chunks.
    pub cycle_time: Duration,
    pub merge_time: Duration,
    /// Mutations applied after the merge.
    pub applied: usize,
    pub population: usize,
    /// Running totals since start.
    pub stalls: u64,
    pub faults: u64,
}

#[derive(Debug, Clone)]
pub struct Generation {
    pub number: u64,
    pub grid: Arc<Grid>,
    /// Mutations are applied and workers may compute from `grid`.
    pub open: bool,
    pub stats: CycleStats,
}

pub struct GridStore {
    tx: watch::Sender<Generation>,
}

impl GridStore {
    pub fn new(grid: Grid) -> Self {
        let population = grid.live_count();
        let (tx, _) = watch::channel(Generation {
            number: 0,
            grid: Arc::new(grid),
            open: true,
            stats: CycleStats { population, ..CycleStats::default() },
        });
        Self { tx }
    }

    pub fn reader(&self) -> GridReader {
        GridReader { rx: self.tx.subscribe() }
    }

    pub fn current(&self) -> Arc<Grid> {
        Arc::clone(&self.tx.borrow().grid)
    }

    pub fn number(&self) -> u64 {
        self.tx.borrow().number
    }

    /// Replaces the population with a freshly merged grid and seals the cycle.
    pub fn swap(&self, grid: Grid, stats: CycleStats) {
        self.tx.send_modify(|generation| {
            generation.number += 1;
            generation.grid = Arc::new(grid);
            generation.open = false;
            generation.stats = stats;
        });
    }

    /// Edits the current grid in place; copies it first if a reader still holds it.
    pub fn modify(&self, edit: impl FnOnce(&mut Grid)) {
        self.tx.send_modify(|generation| {
            let grid = Arc::make_mut(&mut generation.grid);
            edit(grid);
            generation.stats.population = grid.live_count();
        });
    }

    pub fn update_stats(&self, update: impl FnOnce(&mut CycleStats)) {
        self.tx.send_modify(|generation| update(&mut generation.stats));
    }

    /// Lets workers start on the current grid.
    pub fn open(&self) {
        self.tx.send_modify(|generation| generation.open = true);
    }
}

#[derive(Clone)]
pub struct GridReader {
    rx: watch::Receiver<Generation>,
}

impl GridReader {
    pub fn get(&self, x: i64, y: i64) -> bool {
        self.rx.borrow().grid.get(x, y)
    }

    pub fn snapshot(&self) -> Arc<Grid> {
        Arc::clone(&self.rx.borrow().grid)
    }

    pub fn generation(&self) -> u64 {
        self.rx.borrow().number
    }

    pub fn stats(&self) -> CycleStats {
        self.rx.borrow().stats.clone()
    }

    /// Waits for an open cycle newer than `after` and returns its number and grid.
    pub async fn next_open_cycle(&mut self, after: Option<u64>) -> Result<(u64, Arc<Grid>)> {
        let generation = self
            .rx
            .wait_for(|g| g.open && after.is_none_or(|done| g.number > done))
            .await
            .map_err(|_| EngineError::CoordinatorStopped)?;
        Ok((generation.number, Arc::clone(&generation.grid)))
    }

    /// Waits until generation `number` has been merged and its mutations applied.
    pub async fn wait_for_generation(&mut self, number: u64) -> Result<u64> {
        let generation = self
            .rx
            .wait_for(|g| g.open && g.number >= number)
            .await
            .map_err(|_| EngineError::CoordinatorStopped)?;
        Ok(generation.number)
    }
}
