//! Algorithm-level errors.
//!
//! Cancellation is normal control flow: the worker requests it, the
//! algorithm returns `Cancelled` from the next checkpoint, and nobody
//! treats it as a failure.

use hexfield_core::CoreError;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AlgorithmError {
    /// The run was aborted at a cooperative checkpoint.
    #[error("algorithm cancelled")]
    Cancelled,

    /// A world-invariant violation surfaced by the executor.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AlgorithmError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AlgorithmError::Cancelled)
    }
}
