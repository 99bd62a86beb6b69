//! Runtime error type.

use hexfield_core::CoreError;

pub type Result<T> = core::result::Result<T, RuntimeError>;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// `start` called while a worker is still running.
    #[error("a worker is already running on this harness")]
    AlreadyRunning,

    /// The harness was disposed; it accepts no further work.
    #[error("harness is disposed")]
    Disposed,

    /// The process-wide player manager was initialized twice.
    #[error("player manager is already initialized")]
    AlreadyInitialized,

    /// Two players claim the same faction.
    #[error("faction {0} is assigned to more than one player")]
    DuplicateFaction(u32),

    /// A computer player references an unknown algorithm id.
    #[error("unknown algorithm {0:?}")]
    UnknownAlgorithm(String),

    /// Session fragment (de)serialization failure.
    #[error("session serialization: {0}")]
    Session(String),

    /// World-invariant violation surfaced from the core.
    #[error(transparent)]
    Core(#[from] CoreError),
}
