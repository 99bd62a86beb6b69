//! Cost model for a moving unit stack.

use crate::grid::HexCoord;
use crate::state::{EntityId, FactionId, WorldState};

/// A unit stack viewed as a pathfinding agent.
///
/// The `attacking` flag marks movement that is part of an assault: hostile
/// territory is then entered at face cost, while cautious repositioning
/// pays a surcharge for it. Sites holding alien units are impassable either
/// way; combat goes through attack commands, never through movement.
pub struct MoveAgent<'a> {
    world: &'a WorldState,
    units: &'a [EntityId],
    attacking: bool,
    faction: Option<FactionId>,
}

impl<'a> MoveAgent<'a> {
    pub fn new(world: &'a WorldState, units: &'a [EntityId], attacking: bool) -> Self {
        let faction = units
            .first()
            .and_then(|id| world.entity(*id))
            .and_then(|e| e.owner);
        Self {
            world,
            units,
            attacking,
            faction,
        }
    }

    pub fn world(&self) -> &'a WorldState {
        self.world
    }

    pub fn units(&self) -> &'a [EntityId] {
        self.units
    }

    pub fn attacking(&self) -> bool {
        self.attacking
    }

    /// Cost of stepping onto `to`, or `None` when the site is impassable.
    ///
    /// The terrain difficulty sum is clamped to at least 1 so every step
    /// has strictly positive cost.
    pub fn step_cost(&self, to: HexCoord) -> Option<i32> {
        let site = self.world.site(to)?;
        if let Some(faction) = self.faction {
            if site.has_alien_units(self.world, faction) {
                return None;
            }
        }
        let difficulty: i32 = site
            .entities
            .iter()
            .filter_map(|id| self.world.entity(*id))
            .map(|e| e.difficulty)
            .sum();
        let mut cost = difficulty.max(1);
        let hostile = site.owner.is_some() && site.owner != self.faction;
        if hostile && !self.attacking {
            cost += 1;
        }
        Some(cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::WorldBuilder;
    use crate::state::EntityClass;

    #[test]
    fn cost_floor_is_one_and_hostile_surcharge_applies() {
        let mut b = WorldBuilder::new(6, 6);
        b.add_class(EntityClass::unit("inf", "Infantry", 60, 50, 4));
        b.add_faction("Red");
        b.add_faction("Blue");
        let unit = b.add_unit(0, "inf", (0, 0));
        b.set_site_owner((2, 0), 1);
        let world = b.build();
        let units = [unit];

        let cautious = MoveAgent::new(&world, &units, false);
        assert_eq!(cautious.step_cost(HexCoord::new(1, 0)), Some(1));
        assert_eq!(cautious.step_cost(HexCoord::new(2, 0)), Some(2));

        let assault = MoveAgent::new(&world, &units, true);
        assert_eq!(assault.step_cost(HexCoord::new(2, 0)), Some(1));
    }

    #[test]
    fn alien_units_block_movement() {
        let mut b = WorldBuilder::new(6, 6);
        b.add_class(EntityClass::unit("inf", "Infantry", 60, 50, 4));
        b.add_faction("Red");
        b.add_faction("Blue");
        let unit = b.add_unit(0, "inf", (0, 0));
        b.add_unit(1, "inf", (1, 0));
        let world = b.build();
        let units = [unit];
        let agent = MoveAgent::new(&world, &units, true);
        assert_eq!(agent.step_cost(HexCoord::new(1, 0)), None);
    }
}
