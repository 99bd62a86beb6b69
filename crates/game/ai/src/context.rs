//! Cancellation and progress plumbing handed to a running algorithm.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::AlgorithmError;

/// Receives status text published while an algorithm runs.
///
/// `None` clears the display. Implementations are called from the worker
/// thread and must hand the message off without blocking.
pub trait ProgressSink: Send + Sync {
    fn status(&self, message: Option<&str>);
}

/// Sink that drops everything; used by tests and detached runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn status(&self, _message: Option<&str>) {}
}

/// Execution context for one `find_best_commands` invocation.
#[derive(Clone)]
pub struct AlgorithmContext {
    cancel: Option<Arc<AtomicBool>>,
    progress: Arc<dyn ProgressSink>,
}

impl AlgorithmContext {
    pub fn new(cancel: Arc<AtomicBool>, progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            cancel: Some(cancel),
            progress,
        }
    }

    /// A context that can never be cancelled and reports nowhere.
    pub fn detached() -> Self {
        Self {
            cancel: None,
            progress: Arc::new(NullProgress),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Acquire))
    }

    /// Cooperative cancellation point; called before every command
    /// execution and between unit cycles.
    pub fn checkpoint(&self) -> Result<(), AlgorithmError> {
        if self.is_cancelled() {
            Err(AlgorithmError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn report(&self, message: Option<&str>) {
        self.progress.status(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_context_never_cancels() {
        let ctx = AlgorithmContext::detached();
        assert!(ctx.checkpoint().is_ok());
    }

    #[test]
    fn checkpoint_observes_the_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = AlgorithmContext::new(flag.clone(), Arc::new(NullProgress));
        assert!(ctx.checkpoint().is_ok());
        flag.store(true, Ordering::Release);
        assert_eq!(ctx.checkpoint(), Err(AlgorithmError::Cancelled));
    }
}
