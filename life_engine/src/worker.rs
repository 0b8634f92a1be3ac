// worker.rs - Long-lived chunk workers, one per partition region

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{EngineError, Result};
use crate::grid::Grid;
use crate::partition::{ChunkBuffer, Region};
use crate::store::GridReader;

#[derive(Debug)]
pub enum ChunkOutcome {
    Computed(ChunkBuffer),
    Faulted(EngineError),
}

/// A worker's publication for one generation: its marker and its buffer.
#[derive(Debug)]
pub struct ChunkReport {
    pub worker: usize,
    pub generation: u64,
    pub outcome: ChunkOutcome,
}

/// Next state of one region, one row at a time, yielding between rows.
pub async fn compute_chunk(grid: Arc<Grid>, region: Region) -> Result<ChunkBuffer> {
    let mut buffer = ChunkBuffer::allocate(region)?;
    for row in 0..region.height {
        buffer.compute_row(&grid, row);
        tokio::task::yield_now().await;  // Cooperative yielding!
    }
    Ok(buffer)
}

/// Starts one chunk computation as its own task.
pub(crate) type SpawnCompute = fn(Arc<Grid>, Region) -> JoinHandle<Result<ChunkBuffer>>;

fn spawn_compute(grid: Arc<Grid>, region: Region) -> JoinHandle<Result<ChunkBuffer>> {
    tokio::spawn(compute_chunk(grid, region))
}

pub struct ChunkWorker {
    region: Region,
    grid: GridReader,
    running: watch::Receiver<bool>,
    reports: mpsc::Sender<ChunkReport>,
    compute: SpawnCompute,
}

impl ChunkWorker {
    pub fn new(
        region: Region,
        grid: GridReader,
        running: watch::Receiver<bool>,
        reports: mpsc::Sender<ChunkReport>,
    ) -> Self {
        Self { region, grid, running, reports, compute: spawn_compute }
    }

    #[cfg(test)]
    pub(crate) fn with_compute(mut self, compute: SpawnCompute) -> Self {
        self.compute = compute;
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Waits for an open cycle it has not yet computed, waits for the running
    /// flag, computes its region from that cycle's grid and publishes the result.
    /// Exits when the coordinator or run state goes away.
    pub async fn run(mut self) {
        let worker = self.region.index;
        let mut last_published = None;
        loop {
            let Ok((generation, grid)) = self.grid.next_open_cycle(last_published).await else {
                break;
            };
            if self.running.wait_for(|running| *running).await.is_err() {
                break;
            }

            trace!(worker, generation, "computing chunk");
            // Runs in its own task so a panic comes back as a fault instead of killing the worker.
            let outcome = match (self.compute)(grid, self.region).await {
                Ok(Ok(buffer)) => ChunkOutcome::Computed(buffer),
                Ok(Err(err)) => ChunkOutcome::Faulted(err),
                Err(join_err) => ChunkOutcome::Faulted(EngineError::ChunkTask {
                    chunk: worker,
                    reason: join_err.to_string(),
                }),
            };

            let report = ChunkReport { worker, generation, outcome };
            if self.reports.send(report).await.is_err() {
                break;
            }
            last_published = Some(generation);
        }
        debug!(worker, "chunk worker exiting");
    }
}
