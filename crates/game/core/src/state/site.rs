//! Sites: the cells of the map grid.

use crate::grid::HexCoord;
use crate::state::entity::{Entity, EntityId};
use crate::state::faction::FactionId;
use crate::state::WorldState;

/// One hex cell: owner, stacked entities, optional per-resource supplies.
///
/// The entity list is ordered bottom to top; the last id is the top of the
/// stack. Every placed entity appears in exactly one site's list.
#[derive(Clone, Debug, PartialEq)]
pub struct Site {
    pub coord: HexCoord,
    pub owner: Option<FactionId>,
    pub entities: Vec<EntityId>,
    /// Whether ownership can be taken by a capture-capable unit.
    pub can_capture: bool,
    /// Per-resource supply values, when the site produces anything.
    pub supplies: Option<Vec<i32>>,
}

impl Site {
    pub fn new(coord: HexCoord) -> Self {
        Self {
            coord,
            owner: None,
            entities: Vec::new(),
            can_capture: false,
            supplies: None,
        }
    }

    /// Live units stacked here, bottom to top.
    pub fn units<'w>(&self, world: &'w WorldState) -> Vec<&'w Entity> {
        self.entities
            .iter()
            .filter_map(|id| world.entity(*id))
            .filter(|e| e.is_unit() && e.is_alive())
            .collect()
    }

    /// True if any live unit here belongs to a faction other than `faction`.
    pub fn has_alien_units(&self, world: &WorldState, faction: FactionId) -> bool {
        self.units(world)
            .iter()
            .any(|u| u.owner != Some(faction))
    }

    pub fn count_mobile_units(&self, world: &WorldState) -> usize {
        self.units(world).iter().filter(|u| u.is_mobile()).count()
    }

    pub fn count_combat_units(&self, world: &WorldState) -> usize {
        self.units(world).iter().filter(|u| u.is_combat()).count()
    }

    /// Supply at `index`, zero when the site carries none.
    pub fn supply_at(&self, index: usize) -> i32 {
        self.supplies
            .as_ref()
            .and_then(|s| s.get(index))
            .copied()
            .unwrap_or(0)
    }

    /// Total supply over all resource indices.
    pub fn total_supply(&self) -> i32 {
        self.supplies.as_ref().map(|s| s.iter().sum()).unwrap_or(0)
    }

    /// Context-free worth in `[0, 1]` for target valuation.
    pub fn valuation(&self) -> f64 {
        let base = if self.can_capture { 0.5 } else { 0.1 };
        let supply = (self.total_supply() as f64 / 100.0).clamp(0.0, 0.5);
        (base + supply).clamp(0.0, 1.0)
    }
}
