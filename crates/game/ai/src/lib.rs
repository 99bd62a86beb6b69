//! Computer-player decision algorithms for the hexfield engine.
//!
//! The crate layers on top of `hexfield-core`: the [`targets`] module holds
//! the shared attack/build/place heuristics any algorithm can compose, the
//! [`algorithm`] module defines the dispatch seam the runtime drives, and
//! [`seeker`] is the concrete greedy policy shipped with the engine.

pub mod algorithm;
pub mod context;
pub mod error;
pub mod faction_state;
pub mod options;
pub mod seeker;
pub mod targets;

pub use algorithm::{DecisionAlgorithm, create_algorithm};
pub use context::{AlgorithmContext, NullProgress, ProgressSink};
pub use error::AlgorithmError;
pub use faction_state::{FactionSlot, FactionStateStore};
pub use options::AlgorithmOptions;
pub use seeker::{Seeker, SeekerFactionState};
