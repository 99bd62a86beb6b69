//! The dispatch seam between the runtime and concrete algorithms.

use hexfield_core::WorldState;

use crate::context::AlgorithmContext;
use crate::error::AlgorithmError;
use crate::options::AlgorithmOptions;
use crate::seeker::Seeker;

/// A computer-player decision policy.
///
/// One instance lives as long as its player and keeps per-faction state
/// across turns. `find_best_commands` receives a private clone of the
/// world and mutates it freely through the executor; it never issues
/// `EndTurn`, which belongs to the turn hand-off.
pub trait DecisionAlgorithm: Send {
    /// Stable identifier used in session files.
    fn id(&self) -> &'static str;

    /// Plays out the active faction's turn on `world`.
    fn find_best_commands(
        &mut self,
        world: &mut WorldState,
        options: &AlgorithmOptions,
        ctx: &AlgorithmContext,
    ) -> Result<(), AlgorithmError>;
}

/// Instantiates the algorithm registered under `id`.
pub fn create_algorithm(id: &str) -> Option<Box<dyn DecisionAlgorithm>> {
    match id {
        Seeker::ID => Some(Box::new(Seeker::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_seeker() {
        let algorithm = create_algorithm("seeker").unwrap();
        assert_eq!(algorithm.id(), "seeker");
        assert!(create_algorithm("minimax").is_none());
    }
}
