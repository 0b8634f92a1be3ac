// error.rs - Error type shared by the engine, its workers and its configuration

use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum EngineError {
    /// A configuration value is out of range.
    InvalidConfig(String),
    /// The worker count cannot be tiled onto a grid of this size.
    Partition { size: usize, workers: usize },
    /// A chunk result buffer could not be allocated.
    ChunkAllocation { chunk: usize, cells: usize },
    /// A chunk computation task panicked or was cancelled.
    ChunkTask { chunk: usize, reason: String },
    /// The coordinator task has exited; no further generations will be published.
    CoordinatorStopped,
    /// Every chunk worker has exited, so no generation can complete.
    WorkersStopped,
    /// The engine was started outside a tokio runtime.
    NoRuntime,
    ConfigIo(io::Error),
    ConfigParse(serde_yaml::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidConfig(reason) => write!(f, "invalid engine configuration: {reason}"),
            EngineError::Partition { size, workers } => write!(
                f,
                "{workers} workers cannot be tiled onto a {size}x{size} grid"
            ),
            EngineError::ChunkAllocation { chunk, cells } => {
                write!(f, "chunk {chunk}: failed to allocate a buffer of {cells} cells")
            }
            EngineError::ChunkTask { chunk, reason } => {
                write!(f, "chunk {chunk}: computation task failed: {reason}")
            }
            EngineError::CoordinatorStopped => write!(f, "generation coordinator has stopped"),
            EngineError::WorkersStopped => write!(f, "all chunk workers have stopped"),
            EngineError::NoRuntime => write!(f, "the engine must be started inside a tokio runtime"),
            EngineError::ConfigIo(err) => write!(f, "failed to read configuration: {err}"),
            EngineError::ConfigParse(err) => write!(f, "failed to parse configuration: {err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EngineError::ConfigIo(err) => Some(err),
            EngineError::ConfigParse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for EngineError {
    fn from(err: io::Error) -> Self {
        EngineError::ConfigIo(err)
    }
}

impl From<serde_yaml::Error> for EngineError {
    fn from(err: serde_yaml::Error) -> Self {
        EngineError::ConfigParse(err)
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
