// engine.rs - Owned simulation handle: spawns workers and coordinator, exposes the control surface

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::control::RunState;
use crate::coordinator::Coordinator;
use crate::error::{EngineError, Result};
use crate::grid::Grid;
use crate::mutation::{Mutation, MutationQueue};
use crate::partition::Partition;
use crate::render::{CellChange, RenderDiff};
use crate::store::{CycleStats, GridReader, GridStore};
use crate::worker::ChunkWorker;

/// A running simulation.
///
/// Must be started inside a tokio runtime. The engine starts paused; tasks are
/// aborted on `shutdown` or drop.
pub struct Engine {
    config: EngineConfig,
    reader: GridReader,
    queue: Arc<MutationQueue>,
    run_state: Arc<RunState>,
    coordinator: Option<JoinHandle<Result<()>>>,
    workers: Vec<JoinHandle<()>>,
}

impl Engine {
    pub fn start(config: EngineConfig) -> Result<Self> {
        let grid = Grid::new(config.grid_size);
        Self::start_with(config, grid)
    }

    /// Starts from an existing population instead of an empty grid.
    pub fn start_with(config: EngineConfig, grid: Grid) -> Result<Self> {
        tokio::runtime::Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        config.validate()?;
        if grid.size() != config.grid_size {
            return Err(EngineError::InvalidConfig(format!(
                "initial grid is {0}x{0} but grid_size is {1}",
                grid.size(),
                config.grid_size
            )));
        }

        let partition = Arc::new(Partition::new(config.grid_size, config.workers)?);
        let store = GridStore::new(grid);
        let reader = store.reader();
        let queue = Arc::new(MutationQueue::new());
        let run_state = Arc::new(RunState::new(false));
        let (reports_tx, reports_rx) = mpsc::channel(partition.len());

        let workers = partition
            .regions()
            .iter()
            .map(|region| {
                ChunkWorker::new(*region, store.reader(), run_state.subscribe(), reports_tx.clone())
                    .spawn()
            })
            .collect();
        drop(reports_tx);

        let coordinator = Coordinator::new(
            &config,
            Arc::clone(&partition),
            store,
            Arc::clone(&queue),
            Arc::clone(&run_state),
            reports_rx,
        );
        let coordinator = tokio::spawn(coordinator.run());

        info!(
            size = config.grid_size,
            workers = partition.len(),
            columns = partition.columns(),
            rows = partition.rows(),
            "engine started"
        );

        Ok(Self {
            config,
            reader,
            queue,
            run_state,
            coordinator: Some(coordinator),
            workers,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_running(&self, running: bool) {
        self.run_state.set_running(running);
    }

    pub fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    /// Queues a mutation for the next completed generation.
    pub fn enqueue(&self, mutation: Mutation) {
        debug!(kind = mutation.kind(), "mutation queued");
        self.queue.push(mutation);
    }

    pub fn pending_mutations(&self) -> usize {
        self.queue.len()
    }

    pub fn point_query(&self, x: i64, y: i64) -> bool {
        self.reader.get(x, y)
    }

    /// Immutable view of the current population, for diffing and drawing.
    pub fn snapshot_for_render(&self) -> Arc<Grid> {
        self.reader.snapshot()
    }

    /// Changes since `diff`'s last committed frame; commits the current frame.
    pub fn changed_cells_since_last_render(&self, diff: &mut RenderDiff) -> Vec<CellChange> {
        let frame = self.snapshot_for_render();
        let changes = diff.changes(&frame).collect();
        diff.commit(frame);
        changes
    }

    pub fn generation(&self) -> u64 {
        self.reader.generation()
    }

    pub fn stats(&self) -> CycleStats {
        self.reader.stats()
    }

    /// Waits until generation `number` is merged and its mutations applied.
    pub async fn wait_for_generation(&self, number: u64) -> Result<u64> {
        self.reader.clone().wait_for_generation(number).await
    }

    /// Runs exactly `count` more generations, then pauses. Returns the generation reached.
    pub async fn run_generations(&self, count: u64) -> Result<u64> {
        let current = self.generation();
        if count == 0 {
            return Ok(current);
        }
        let target = current + count;
        self.run_state.run_until(target);
        self.wait_for_generation(target).await
    }

    /// Stops every task. Returns the coordinator's error if it had already failed.
    pub async fn shutdown(mut self) -> Result<()> {
        self.run_state.set_running(false);
        let outcome = match self.coordinator.take() {
            Some(coordinator) if coordinator.is_finished() => match coordinator.await {
                Ok(result) => result,
                Err(_) => Err(EngineError::CoordinatorStopped),
            },
            Some(coordinator) => {
                coordinator.abort();
                let _ = coordinator.await;
                Ok(())
            }
            None => Ok(()),
        };
        for worker in self.workers.drain(..) {
            worker.abort();
        }
        info!(generation = self.generation(), "engine stopped");
        outcome
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
        if let Some(coordinator) = &self.coordinator {
            coordinator.abort();
        }
    }
}
