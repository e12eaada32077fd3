use stupid_core::StupidError;
use thiserror::Error;

/// Errors surfaced by scheduler setup. Dispatch itself never fails.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to spawn execution unit: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("scheduler registry already initialized")]
    AlreadyInitialized,

    #[error(transparent)]
    Config(#[from] StupidError),
}
