//! Deterministic world model and command substrate for the hexfield engine.
//!
//! `hexfield-core` owns the canonical game data (factions, entities, sites,
//! classes), the command vocabulary that is the sole way to mutate a
//! [`WorldState`], and the hex pathfinding queries built on top of it.
//! Decision algorithms and the turn runtime consume the types re-exported
//! here; all state mutation flows through [`command::Executor`].

pub mod combat;
pub mod command;
pub mod error;
pub mod grid;
pub mod path;
pub mod rng;
pub mod scenario;
pub mod state;

pub use combat::CombatResults;
pub use command::{Command, CommandHistory, Executor};
pub use error::{CoreError, Result};
pub use grid::{HexCoord, SiteGrid};
pub use path::{MoveAgent, Path, PathResult};
pub use scenario::WorldBuilder;
pub use state::{
    ClassFlags, ClassId, ClassRegistry, Entity, EntityCategory, EntityClass, EntityId, Faction,
    FactionId, RangedAttackMode, Site, SupplyRequirement, Valuable, WorldState,
};
