//! Error types for the world model and executor.
//!
//! Rule-level rejections (an attack the world refuses, a placement on a
//! hostile site) are *not* errors: the executor reports them through plain
//! `bool` returns and leaves the world untouched. [`CoreError`] is reserved
//! for invariant violations that indicate corrupted state.

use crate::grid::HexCoord;
use crate::state::EntityId;

/// Convenience alias used throughout the core crate.
pub type Result<T> = core::result::Result<T, CoreError>;

/// Fatal world-invariant violations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// An entity id referenced by a command or site is absent from the arena.
    #[error("entity {0:?} does not exist")]
    MissingEntity(EntityId),

    /// A coordinate outside the site grid reached a layer that requires
    /// validated coordinates.
    #[error("coordinate {0} is outside the grid")]
    OutOfBounds(HexCoord),

    /// A faction index or id that no longer resolves.
    #[error("faction {0} does not exist")]
    MissingFaction(u32),

    /// A class id absent from the scenario registry.
    #[error("entity class {0:?} does not exist")]
    MissingClass(String),

    /// The entity arena and a site's stack disagree about placement.
    #[error("placement desync for entity {entity:?} at {site}")]
    PlacementDesync { entity: EntityId, site: HexCoord },
}
