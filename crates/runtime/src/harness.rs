//! The background turn harness.
//!
//! One harness owns one algorithm instance and runs at most one worker at
//! a time; several harnesses may run in parallel as long as their worlds
//! are disjoint. The only state crossing threads is the set-once
//! `best_world` cell and the monotone flags; everything else stays local
//! to the worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use hexfield_ai::{AlgorithmContext, AlgorithmError, AlgorithmOptions, DecisionAlgorithm, ProgressSink};
use hexfield_core::{Executor, WorldState};

use crate::error::{Result, RuntimeError};
use crate::events::TaskEvent;

struct HarnessShared {
    disposed: AtomicBool,
    aborted: AtomicBool,
    running: AtomicBool,
}

/// Sends events unless the harness has been disposed.
#[derive(Clone)]
struct EventEmitter {
    tx: mpsc::UnboundedSender<TaskEvent>,
    shared: Arc<HarnessShared>,
}

impl EventEmitter {
    fn emit(&self, event: TaskEvent) {
        if !self.shared.disposed.load(Ordering::Acquire) {
            let _ = self.tx.send(event);
        }
    }
}

impl ProgressSink for EventEmitter {
    fn status(&self, message: Option<&str>) {
        self.emit(TaskEvent::Message(message.map(str::to_owned)));
    }
}

/// Runs a decision algorithm for the active faction on a worker.
pub struct TurnHarness {
    algorithm: Arc<Mutex<Box<dyn DecisionAlgorithm>>>,
    cancel: Arc<AtomicBool>,
    shared: Arc<HarnessShared>,
    best: Arc<OnceLock<WorldState>>,
    worker: Option<tokio::task::JoinHandle<()>>,
}

impl TurnHarness {
    pub fn new(algorithm: Box<dyn DecisionAlgorithm>) -> Self {
        Self {
            algorithm: Arc::new(Mutex::new(algorithm)),
            cancel: Arc::new(AtomicBool::new(false)),
            shared: Arc::new(HarnessShared {
                disposed: AtomicBool::new(false),
                aborted: AtomicBool::new(false),
                running: AtomicBool::new(false),
            }),
            best: Arc::new(OnceLock::new()),
            worker: None,
        }
    }

    /// Starts a worker on a private clone of `world`.
    ///
    /// Clears the previous best world first. The returned receiver yields
    /// the progress events for this invocation, ending with
    /// [`TaskEvent::Complete`].
    pub fn start(
        &mut self,
        world: &WorldState,
        options: AlgorithmOptions,
    ) -> Result<mpsc::UnboundedReceiver<TaskEvent>> {
        if self.shared.disposed.load(Ordering::Acquire) {
            return Err(RuntimeError::Disposed);
        }
        if self.shared.running.load(Ordering::Acquire) {
            return Err(RuntimeError::AlreadyRunning);
        }

        self.best = Arc::new(OnceLock::new());
        self.cancel = Arc::new(AtomicBool::new(false));
        self.shared.aborted.store(false, Ordering::Release);
        self.shared.running.store(true, Ordering::Release);

        let (tx, rx) = mpsc::unbounded_channel();
        let snapshot = world.clone();
        let algorithm = Arc::clone(&self.algorithm);
        let cancel = Arc::clone(&self.cancel);
        let shared = Arc::clone(&self.shared);
        let best = Arc::clone(&self.best);

        self.worker = Some(tokio::task::spawn_blocking(move || {
            run_worker(algorithm, cancel, shared, best, snapshot, options, tx);
        }));
        Ok(rx)
    }

    /// Requests a cooperative abort.
    ///
    /// Returns true iff a worker was running and this call delivered the
    /// signal; false when nothing runs or an abort is already pending.
    pub fn stop(&mut self) -> bool {
        if !self.shared.running.load(Ordering::Acquire) {
            return false;
        }
        !self.cancel.swap(true, Ordering::AcqRel)
    }

    /// Marks the harness disposed (monotone), requests an abort, and
    /// suppresses all further progress events.
    pub fn dispose(&mut self) {
        self.shared.disposed.store(true, Ordering::Release);
        self.stop();
    }

    /// The published result of the last completed run, if any.
    ///
    /// Readers observe either the pre-invocation empty state or the final
    /// world, never an intermediate.
    pub fn best_world(&self) -> Option<WorldState> {
        self.best.get().cloned()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }

    pub fn was_aborted(&self) -> bool {
        self.shared.aborted.load(Ordering::Acquire)
    }

    /// Waits for the current worker to finish, if one is running.
    pub async fn wait(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

impl Drop for TurnHarness {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn run_worker(
    algorithm: Arc<Mutex<Box<dyn DecisionAlgorithm>>>,
    cancel: Arc<AtomicBool>,
    shared: Arc<HarnessShared>,
    best: Arc<OnceLock<WorldState>>,
    mut world: WorldState,
    options: AlgorithmOptions,
    tx: mpsc::UnboundedSender<TaskEvent>,
) {
    let emitter = EventEmitter {
        tx,
        shared: Arc::clone(&shared),
    };
    emitter.emit(TaskEvent::Message(Some("executing".to_owned())));

    let outcome: std::result::Result<(), AlgorithmError> = (|| {
        if !world.history.have_begin_turn() {
            Executor::new(&mut world).execute_begin_turn()?;
        }
        if world.game_over {
            debug!(target: "runtime::harness", "game over, skipping algorithm");
            return Ok(());
        }
        let ctx = AlgorithmContext::new(cancel, Arc::new(emitter.clone()));
        let mut algorithm = algorithm.lock().unwrap_or_else(|e| e.into_inner());
        algorithm.find_best_commands(&mut world, &options, &ctx)
    })();

    match outcome {
        Ok(()) => {
            let _ = best.set(world);
        }
        Err(AlgorithmError::Cancelled) => {
            debug!(target: "runtime::harness", "worker aborted");
            shared.aborted.store(true, Ordering::Release);
        }
        Err(error) => {
            warn!(target: "runtime::harness", %error, "worker failed");
            emitter.emit(TaskEvent::Exception(error.to_string()));
        }
    }

    emitter.emit(TaskEvent::Message(None));
    emitter.emit(TaskEvent::Complete);
    shared.running.store(false, Ordering::Release);
}
