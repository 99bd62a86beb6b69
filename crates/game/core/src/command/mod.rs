//! The command vocabulary and its history.
//!
//! Commands are the only way a world state changes. Each executed command
//! appends itself to the history exactly once, in execution order, which
//! makes a history replayable against the world it started from.

mod executor;

pub use executor::Executor;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::HexCoord;
use crate::state::{ClassId, EntityId, WorldState};

/// One atomic world mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Opens the active faction's turn: refreshes action budgets and heals.
    BeginTurn,
    /// Closes the active faction's turn and advances the faction cursor.
    EndTurn,
    /// Creates `count` unplaced entities of `class` for the active faction.
    Build { class: ClassId, count: i32 },
    /// Places previously built entities on a site.
    Place { entities: Vec<EntityId>, site: HexCoord },
    /// Moves a stack of units toward `target` along the best path.
    Move { units: Vec<EntityId>, target: HexCoord },
    /// Resolves combat of `units` against the stack at `target`.
    Attack { units: Vec<EntityId>, target: HexCoord },
}

impl Command {
    /// Snake-case tag, used for logging and serialization keys.
    pub fn as_snake_case(&self) -> &'static str {
        match self {
            Command::BeginTurn => "begin_turn",
            Command::EndTurn => "end_turn",
            Command::Build { .. } => "build",
            Command::Place { .. } => "place",
            Command::Move { .. } => "move",
            Command::Attack { .. } => "attack",
        }
    }
}

/// Ordered record of every command executed on a world state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandHistory {
    commands: Vec<Command>,
}

impl CommandHistory {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub(crate) fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Whether the current faction's turn has been opened.
    ///
    /// Scans backwards: a `BeginTurn` seen before any `EndTurn` belongs to
    /// the faction currently at the cursor.
    pub fn have_begin_turn(&self) -> bool {
        for command in self.commands.iter().rev() {
            match command {
                Command::BeginTurn => return true,
                Command::EndTurn => return false,
                _ => {}
            }
        }
        false
    }

    /// Re-executes this history against `base`, which must be the world the
    /// history was recorded from (with an empty history of its own).
    ///
    /// Commands replay through the executor, so a replayed world is
    /// observationally equal to the one that produced the history.
    pub fn replay(&self, base: &WorldState) -> Result<WorldState> {
        let mut world = base.clone();
        world.history = CommandHistory::default();
        for command in &self.commands {
            let mut executor = Executor::new(&mut world);
            match command {
                Command::BeginTurn => executor.execute_begin_turn()?,
                Command::EndTurn => executor.execute_end_turn()?,
                Command::Build { class, count } => {
                    executor.execute_build(class, *count)?;
                }
                Command::Place { entities, site } => {
                    executor.execute_place(entities, *site)?;
                }
                Command::Move { units, target } => {
                    executor.execute_move(units, *target)?;
                }
                Command::Attack { units, target } => {
                    executor.execute_attack(units, *target)?;
                }
            }
        }
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EntityId;

    #[test]
    fn commands_round_trip_through_serde() {
        let commands = vec![
            Command::BeginTurn,
            Command::Build {
                class: "inf".to_owned(),
                count: 2,
            },
            Command::Place {
                entities: vec![EntityId(4), EntityId(5)],
                site: HexCoord::new(2, 3),
            },
            Command::Move {
                units: vec![EntityId(1)],
                target: HexCoord::new(4, 4),
            },
            Command::Attack {
                units: vec![EntityId(1)],
                target: HexCoord::new(5, 4),
            },
            Command::EndTurn,
        ];
        let json = serde_json::to_string(&commands).unwrap();
        let back: Vec<Command> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, commands);
    }

    #[test]
    fn have_begin_turn_is_scoped_to_the_current_faction() {
        let mut history = CommandHistory::default();
        assert!(!history.have_begin_turn());
        history.push(Command::BeginTurn);
        assert!(history.have_begin_turn());
        history.push(Command::Move {
            units: vec![EntityId(1)],
            target: HexCoord::new(1, 1),
        });
        assert!(history.have_begin_turn());
        history.push(Command::EndTurn);
        assert!(!history.have_begin_turn());
    }
}
