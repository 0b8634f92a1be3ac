//! Concurrent Conway's Game of Life engine (B3/S23) on a fixed square grid.
//!
//! The grid is split into one region per chunk worker. Workers compute their
//! regions from the same published generation, a single coordinator merges the
//! results, swaps the new generation in, applies queued mutations and then
//! releases the workers for the next cycle. Renderers diff snapshots to draw
//! only what changed.

pub mod config;
pub mod control;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod grid;
pub mod history;
pub mod mutation;
pub mod partition;
pub mod patterns;
pub mod render;
pub mod rule;
pub mod store;
pub mod worker;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use grid::Grid;
pub use mutation::{Mutation, MutationQueue};
pub use partition::{ChunkBuffer, Partition, Region};
pub use patterns::Pattern;
pub use render::{CellChange, FrameStats, RenderDiff};
pub use store::CycleStats;
