//! Players and the faction → player mapping.
//!
//! The mapping must stay total over surviving factions. The manager is a
//! process-scoped service installed once at session start and torn down
//! explicitly; implicit re-creation is an error.

use std::collections::BTreeSet;
use std::sync::{LazyLock, RwLock};

use hexfield_core::{Executor, FactionId, WorldState};
use hexfield_ai::AlgorithmOptions;

use crate::error::{Result, RuntimeError};
use crate::events::TaskEvent;
use crate::harness::TurnHarness;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HumanPlayer {
    pub name: String,
    pub factions: BTreeSet<FactionId>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputerPlayer {
    pub name: String,
    pub factions: BTreeSet<FactionId>,
    pub algorithm_id: String,
    pub options: AlgorithmOptions,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Player {
    Human(HumanPlayer),
    Computer(ComputerPlayer),
}

impl Player {
    pub fn name(&self) -> &str {
        match self {
            Player::Human(p) => &p.name,
            Player::Computer(p) => &p.name,
        }
    }

    pub fn factions(&self) -> &BTreeSet<FactionId> {
        match self {
            Player::Human(p) => &p.factions,
            Player::Computer(p) => &p.factions,
        }
    }

    pub fn owns(&self, faction: FactionId) -> bool {
        self.factions().contains(&faction)
    }
}

/// Result of one turn hand-off.
#[derive(Debug)]
pub enum TurnHandoff {
    /// The active faction belongs to a human; input comes from outside.
    Human,
    /// The computer finished; here is the post-turn world.
    Computer(WorldState),
    /// The worker was aborted or failed; the previous world stands.
    Aborted,
}

/// Maps factions to their controlling players and drives hand-offs.
#[derive(Clone, Debug, Default)]
pub struct PlayerManager {
    players: Vec<Player>,
}

impl PlayerManager {
    /// Builds a manager, rejecting overlapping faction assignments.
    pub fn new(players: Vec<Player>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for player in &players {
            for faction in player.factions() {
                if !seen.insert(*faction) {
                    return Err(RuntimeError::DuplicateFaction(faction.0));
                }
            }
        }
        Ok(Self { players })
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_for(&self, faction: FactionId) -> Option<&Player> {
        self.players.iter().find(|p| p.owns(faction))
    }

    /// Whether every faction still alive in `world` has a player.
    pub fn is_total_over(&self, world: &WorldState) -> bool {
        world
            .surviving_factions()
            .into_iter()
            .all(|f| self.player_for(f).is_some())
    }

    /// Email game-mode discriminator: every human player carries an
    /// address.
    pub fn email_mode_ready(&self) -> bool {
        self.players.iter().all(|p| match p {
            Player::Human(h) => h.email.is_some(),
            Player::Computer(_) => true,
        })
    }

    /// Runs the active faction's turn.
    ///
    /// Human factions return immediately; computer factions run `harness`
    /// to completion, take the best world, and close it with `EndTurn`.
    pub async fn advance_turn(
        &self,
        world: &WorldState,
        harness: &mut TurnHarness,
    ) -> Result<TurnHandoff> {
        let faction = world.active_faction_id();
        let Some(Player::Computer(computer)) = self.player_for(faction) else {
            return Ok(TurnHandoff::Human);
        };

        let mut events = harness.start(world, computer.options.clone())?;
        while let Some(event) = events.recv().await {
            if event == TaskEvent::Complete {
                break;
            }
        }
        harness.wait().await;

        match harness.best_world() {
            Some(mut best) => {
                Executor::new(&mut best).execute_end_turn()?;
                Ok(TurnHandoff::Computer(best))
            }
            None => Ok(TurnHandoff::Aborted),
        }
    }
}

static PLAYER_MANAGER: LazyLock<RwLock<Option<PlayerManager>>> =
    LazyLock::new(|| RwLock::new(None));

/// Installs the process-wide manager; fails if one is already installed.
pub fn init_player_manager(manager: PlayerManager) -> Result<()> {
    let mut slot = PLAYER_MANAGER.write().unwrap_or_else(|e| e.into_inner());
    if slot.is_some() {
        return Err(RuntimeError::AlreadyInitialized);
    }
    *slot = Some(manager);
    Ok(())
}

/// Removes the process-wide manager, if any.
pub fn teardown_player_manager() {
    let mut slot = PLAYER_MANAGER.write().unwrap_or_else(|e| e.into_inner());
    *slot = None;
}

/// Runs `f` against the installed manager; `None` when none is installed.
pub fn with_player_manager<T>(f: impl FnOnce(&PlayerManager) -> T) -> Option<T> {
    let slot = PLAYER_MANAGER.read().unwrap_or_else(|e| e.into_inner());
    slot.as_ref().map(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn human(name: &str, factions: &[u32], email: Option<&str>) -> Player {
        Player::Human(HumanPlayer {
            name: name.to_owned(),
            factions: factions.iter().map(|f| FactionId(*f)).collect(),
            email: email.map(str::to_owned),
        })
    }

    fn computer(name: &str, factions: &[u32]) -> Player {
        Player::Computer(ComputerPlayer {
            name: name.to_owned(),
            factions: factions.iter().map(|f| FactionId(*f)).collect(),
            algorithm_id: "seeker".to_owned(),
            options: AlgorithmOptions::default(),
        })
    }

    #[test]
    fn duplicate_factions_are_rejected() {
        let err = PlayerManager::new(vec![human("a", &[0], None), computer("b", &[0])]);
        assert!(matches!(err, Err(RuntimeError::DuplicateFaction(0))));
    }

    #[test]
    fn mapping_resolves_players() {
        let manager =
            PlayerManager::new(vec![human("a", &[0], None), computer("b", &[1, 2])]).unwrap();
        assert_eq!(manager.player_for(FactionId(1)).unwrap().name(), "b");
        assert!(manager.player_for(FactionId(3)).is_none());
    }

    #[test]
    fn process_service_initializes_exactly_once() {
        teardown_player_manager();
        let manager = PlayerManager::new(vec![computer("b", &[1])]).unwrap();
        init_player_manager(manager.clone()).unwrap();
        assert!(matches!(
            init_player_manager(manager),
            Err(RuntimeError::AlreadyInitialized)
        ));
        assert_eq!(with_player_manager(|m| m.players().len()), Some(1));
        teardown_player_manager();
        assert!(with_player_manager(|_| ()).is_none());
    }

    #[test]
    fn email_mode_requires_all_human_addresses() {
        let partial =
            PlayerManager::new(vec![human("a", &[0], Some("a@example.org")), human("b", &[1], None)])
                .unwrap();
        assert!(!partial.email_mode_ready());
        let full = PlayerManager::new(vec![
            human("a", &[0], Some("a@example.org")),
            computer("c", &[1]),
        ])
        .unwrap();
        assert!(full.email_mode_ready());
    }
}
