// coordinator.rs - Merges chunk results into generations and applies deferred mutations
//
// One coordinator exists per engine. It is the only writer of the grid store
// and the only consumer of the mutation queue. Each cycle walks
// Waiting -> Merging -> Applying -> Idle:
//
//   Waiting   collect one report per worker for the open generation
//   Merging   paste every chunk into a new grid and swap it in (cycle sealed)
//   Applying  drain the mutation queue, most recent command first
//   Idle      clear the markers and reopen the cycle for the workers

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time;
use tracing::{debug, error, info, trace, warn};

use crate::config::EngineConfig;
use crate::control::RunState;
use crate::error::{EngineError, Result};
use crate::history::StateHistory;
use crate::mutation::MutationQueue;
use crate::partition::{ChunkBuffer, Partition};
use crate::store::{CycleStats, GridStore};
use crate::worker::{ChunkOutcome, ChunkReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Merging,
    Applying,
    Idle,
}

pub struct Coordinator {
    partition: Arc<Partition>,
    store: GridStore,
    queue: Arc<MutationQueue>,
    run_state: Arc<RunState>,
    running: watch::Receiver<bool>,
    reports: mpsc::Receiver<ChunkReport>,
    markers: Vec<Option<ChunkBuffer>>,
    phase: Phase,
    stall_timeout: Duration,
    random_density: f64,
    pause_on_repeat: bool,
    history: StateHistory,
    stalls: u64,
    faults: u64,
    cycle_started: Instant,
}

impl Coordinator {
    pub fn new(
        config: &EngineConfig,
        partition: Arc<Partition>,
        store: GridStore,
        queue: Arc<MutationQueue>,
        run_state: Arc<RunState>,
        reports: mpsc::Receiver<ChunkReport>,
    ) -> Self {
        let markers = vec![None; partition.len()];
        let running = run_state.subscribe();
        Self {
            partition,
            store,
            queue,
            run_state,
            running,
            reports,
            markers,
            phase: Phase::Idle,
            stall_timeout: config.stall_timeout(),
            random_density: config.random_density,
            pause_on_repeat: config.pause_on_repeat,
            history: StateHistory::new(config.history_len),
            stalls: 0,
            faults: 0,
            cycle_started: Instant::now(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Runs cycles until every worker has gone away.
    pub async fn run(mut self) -> Result<()> {
        info!(
            chunks = self.partition.len(),
            size = self.partition.size(),
            "generation coordinator started"
        );
        loop {
            if let Err(err) = self.run_cycle().await {
                error!(error = %err, generation = self.store.number(), "generation coordinator stopped");
                return Err(err);
            }
        }
    }

    /// One full Waiting -> Merging -> Applying -> Idle pass.
    pub async fn run_cycle(&mut self) -> Result<()> {
        self.enter(Phase::Waiting);
        self.wait_for_chunks().await?;

        self.enter(Phase::Merging);
        self.merge();

        self.enter(Phase::Applying);
        self.apply_mutations();

        self.enter(Phase::Idle);
        self.release_next_cycle();
        Ok(())
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        trace!(?phase, generation = self.store.number(), "coordinator phase");
    }

    /// Collects reports until every marker is set. The stall deadline only
    /// runs while the engine is running and restarts on every resume.
    async fn wait_for_chunks(&mut self) -> Result<()> {
        let generation = self.store.number();
        let mut deadline = time::Instant::now() + self.stall_timeout;
        while self.markers.iter().any(Option::is_none) {
            let running = *self.running.borrow_and_update();
            tokio::select! {
                report = self.reports.recv() => match report {
                    Some(report) => self.record(generation, report),
                    None => return Err(EngineError::WorkersStopped),
                },
                Ok(()) = self.running.changed() => {
                    if *self.running.borrow_and_update() {
                        deadline = time::Instant::now() + self.stall_timeout;
                    }
                }
                _ = time::sleep_until(deadline), if running => {
                    self.fill_stalled(generation);
                    break;
                }
            }
        }
        Ok(())
    }

    fn record(&mut self, generation: u64, report: ChunkReport) {
        let ChunkReport { worker, generation: reported, outcome } = report;
        if reported != generation {
            warn!(worker, reported, generation, "discarding chunk from an earlier generation");
            return;
        }
        let Some(region) = self.partition.region(worker).copied() else {
            warn!(worker, "discarding chunk from an unknown worker");
            return;
        };

        let buffer = match outcome {
            ChunkOutcome::Computed(buffer) if buffer.is_complete() && *buffer.region() == region => buffer,
            ChunkOutcome::Computed(_) => {
                self.faults += 1;
                error!(worker, generation, "chunk does not match its region; keeping last-known-good cells");
                ChunkBuffer::capture(&self.store.current(), region)
            }
            ChunkOutcome::Faulted(err) => {
                self.faults += 1;
                error!(worker, generation, error = %err, "chunk worker faulted; keeping last-known-good cells");
                ChunkBuffer::capture(&self.store.current(), region)
            }
        };
        self.markers[worker] = Some(buffer);
    }

    fn fill_stalled(&mut self, generation: u64) {
        let current = self.store.current();
        let mut missing = Vec::new();
        for (worker, marker) in self.markers.iter_mut().enumerate() {
            if marker.is_none() {
                missing.push(worker);
                *marker = Some(ChunkBuffer::capture(&current, self.partition.regions()[worker]));
            }
        }
        self.stalls += 1;
        warn!(
            generation,
            ?missing,
            waited_ms = self.cycle_started.elapsed().as_millis() as u64,
            "generation stalled; merging last-known-good cells for missing chunks"
        );
    }

    fn merge(&mut self) {
        let started = Instant::now();
        let merged = self.partition.merge(self.markers.iter().flatten());
        let stats = CycleStats {
            cycle_time: self.cycle_started.elapsed(),
            merge_time: started.elapsed(),
            applied: 0,
            population: merged.live_count(),
            stalls: self.stalls,
            faults: self.faults,
        };
        debug!(
            generation = self.store.number() + 1,
            population = stats.population,
            elapsed_ms = stats.cycle_time.as_millis() as u64,
            "merged generation"
        );
        self.store.swap(merged, stats);
    }

    fn apply_mutations(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        // everything pushed after the drain waits for the next generation
        let density = self.random_density;
        let queue = &self.queue;
        let mut applied = 0;
        self.store.modify(|grid| applied = queue.drain_into(grid, density));
        self.store.update_stats(|stats| stats.applied = applied);
        self.history.reset();
        debug!(generation = self.store.number(), commands = applied, "applied mutations");
    }

    fn release_next_cycle(&mut self) {
        let generation = self.store.number();
        if self.run_state.pause_if_reached(generation) {
            info!(generation, "reached requested generation; pausing");
        }
        if self.pause_on_repeat && self.run_state.is_running() {
            let fingerprint = self.store.current().fingerprint();
            if self.history.observe(fingerprint) {
                self.run_state.pause();
                info!(generation, "generation repeats a recent state; pausing");
            }
        }

        for marker in &mut self.markers {
            *marker = None;
        }
        self.cycle_started = Instant::now();
        self.store.open();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::mutation::Mutation;
    use crate::rule;
    use crate::store::GridReader;

    struct Harness {
        coordinator: Coordinator,
        reports: mpsc::Sender<ChunkReport>,
        reader: GridReader,
        queue: Arc<MutationQueue>,
        run_state: Arc<RunState>,
        partition: Arc<Partition>,
    }

    fn harness(grid: Grid, workers: usize, stall_timeout_ms: u64, running: bool) -> Harness {
        let config = EngineConfig {
            grid_size: grid.size(),
            workers,
            stall_timeout_ms,
            ..EngineConfig::default()
        };
        let partition = Arc::new(Partition::new(grid.size(), workers).unwrap());
        let store = GridStore::new(grid);
        let reader = store.reader();
        let queue = Arc::new(MutationQueue::new());
        let run_state = Arc::new(RunState::new(running));
        let (tx, rx) = mpsc::channel(workers + 1);
        let coordinator = Coordinator::new(
            &config,
            Arc::clone(&partition),
            store,
            Arc::clone(&queue),
            Arc::clone(&run_state),
            rx,
        );
        Harness { coordinator, reports: tx, reader, queue, run_state, partition }
    }

    fn blinker() -> Grid {
        Grid::with_live_cells(10, [(4, 5), (5, 5), (6, 5)])
    }

    async fn publish_all(h: &Harness, generation: u64) {
        let grid = h.reader.snapshot();
        for region in h.partition.regions() {
            let buffer = ChunkBuffer::compute(&grid, *region).unwrap();
            h.reports
                .send(ChunkReport {
                    worker: region.index,
                    generation,
                    outcome: ChunkOutcome::Computed(buffer),
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn merges_all_chunks_into_the_next_generation() {
        let mut h = harness(blinker(), 4, 1000, true);
        publish_all(&h, 0).await;
        h.coordinator.run_cycle().await.unwrap();

        assert_eq!(h.reader.generation(), 1);
        assert_eq!(*h.reader.snapshot(), rule::advance(&blinker()));
        assert_eq!(h.coordinator.phase(), Phase::Idle);
        assert_eq!(h.reader.stats().population, 3);
    }

    #[tokio::test]
    async fn mutations_apply_after_the_merge_in_lifo_order() {
        let mut h = harness(blinker(), 2, 1000, true);
        h.queue.push(Mutation::SetCell { x: 0, y: 0, alive: true });
        h.queue.push(Mutation::Clear);
        publish_all(&h, 0).await;
        h.coordinator.run_cycle().await.unwrap();

        // Clear ran first, then the SetCell pushed before it
        let live: Vec<_> = h.reader.snapshot().live_cells().collect();
        assert_eq!(live, vec![(0, 0)]);
        assert_eq!(h.reader.stats().applied, 2);
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn faulted_chunk_keeps_last_known_good_cells() {
        let mut h = harness(blinker(), 2, 1000, true);
        let grid = h.reader.snapshot();
        let left = h.partition.regions()[0];
        h.reports
            .send(ChunkReport {
                worker: 0,
                generation: 0,
                outcome: ChunkOutcome::Computed(ChunkBuffer::compute(&grid, left).unwrap()),
            })
            .await
            .unwrap();
        h.reports
            .send(ChunkReport {
                worker: 1,
                generation: 0,
                outcome: ChunkOutcome::Faulted(EngineError::ChunkAllocation { chunk: 1, cells: 50 }),
            })
            .await
            .unwrap();
        h.coordinator.run_cycle().await.unwrap();

        let next = h.reader.snapshot();
        // left half (x < 5) advanced, right half kept as it was
        assert!(!next.get(4, 5));
        assert!(next.get(5, 5) && next.get(6, 5));
        assert!(!next.get(5, 4) && !next.get(5, 6));
        assert_eq!(h.reader.stats().faults, 1);
    }

    #[tokio::test]
    async fn stalled_generation_proceeds_after_the_watchdog() {
        let mut h = harness(blinker(), 2, 20, true);
        let grid = h.reader.snapshot();
        let left = h.partition.regions()[0];
        h.reports
            .send(ChunkReport {
                worker: 0,
                generation: 0,
                outcome: ChunkOutcome::Computed(ChunkBuffer::compute(&grid, left).unwrap()),
            })
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), h.coordinator.run_cycle())
            .await
            .expect("watchdog must end the wait")
            .unwrap();
        assert_eq!(h.reader.generation(), 1);
        assert_eq!(h.reader.stats().stalls, 1);
        assert!(h.reader.get(6, 5));
    }

    #[tokio::test]
    async fn paused_waiting_is_not_a_stall() {
        let mut h = harness(blinker(), 2, 10, false);
        let waited = tokio::time::timeout(Duration::from_millis(60), h.coordinator.run_cycle()).await;
        assert!(waited.is_err());
        assert_eq!(h.coordinator.phase(), Phase::Waiting);
        assert_eq!(h.reader.generation(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn time_spent_paused_does_not_count_toward_a_stall() {
        let mut h = harness(blinker(), 2, 200, false);
        let grid = h.reader.snapshot();
        let reports: Vec<_> = h
            .partition
            .regions()
            .iter()
            .map(|region| ChunkReport {
                worker: region.index,
                generation: 0,
                outcome: ChunkOutcome::Computed(ChunkBuffer::compute(&grid, *region).unwrap()),
            })
            .collect();
        let tx = h.reports.clone();
        let run_state = Arc::clone(&h.run_state);
        tokio::spawn(async move {
            // most of one watchdog window is spent paused
            tokio::time::sleep(Duration::from_millis(150)).await;
            run_state.set_running(true);
            tokio::time::sleep(Duration::from_millis(80)).await;
            for report in reports {
                tx.send(report).await.unwrap();
            }
        });

        tokio::time::timeout(Duration::from_secs(2), h.coordinator.run_cycle())
            .await
            .expect("cycle should complete once chunks arrive")
            .unwrap();
        assert_eq!(h.reader.stats().stalls, 0);
        assert_eq!(*h.reader.snapshot(), rule::advance(&blinker()));
    }

    #[tokio::test]
    async fn stale_reports_are_discarded() {
        let mut h = harness(blinker(), 1, 1000, true);
        let region = h.partition.regions()[0];
        h.reports
            .send(ChunkReport {
                worker: 0,
                generation: 7,
                outcome: ChunkOutcome::Computed(ChunkBuffer::capture(&Grid::new(10), region)),
            })
            .await
            .unwrap();
        publish_all(&h, 0).await;
        h.coordinator.run_cycle().await.unwrap();
        assert_eq!(*h.reader.snapshot(), rule::advance(&blinker()));
    }

    #[tokio::test]
    async fn stop_target_pauses_before_reopening() {
        let mut h = harness(blinker(), 1, 1000, false);
        h.run_state.run_until(1);
        publish_all(&h, 0).await;
        h.coordinator.run_cycle().await.unwrap();
        assert!(!h.run_state.is_running());
        assert_eq!(h.reader.generation(), 1);
    }

    #[tokio::test]
    async fn closed_report_channel_stops_the_coordinator() {
        let Harness { mut coordinator, reports, .. } = harness(blinker(), 2, 1000, true);
        drop(reports);
        let result = coordinator.run_cycle().await;
        assert!(matches!(result, Err(EngineError::WorkersStopped)));
    }
}
