//! The command executor: sole authority for mutating a world state.
//!
//! Rule-level rejections come back as `Ok(false)` and leave both the world
//! and the history untouched. `Err` is reserved for invariant violations
//! that indicate corrupted state. Every executed command appends itself to
//! the history exactly once.

use tracing::{debug, warn};

use crate::combat;
use crate::command::Command;
use crate::error::Result;
use crate::grid::HexCoord;
use crate::path;
use crate::state::{EntityId, WorldState};

/// Strength points a healing-capable unit regains per turn.
const HEAL_PER_TURN: i32 = 20;

pub struct Executor<'a> {
    world: &'a mut WorldState,
}

impl<'a> Executor<'a> {
    pub fn new(world: &'a mut WorldState) -> Self {
        Self { world }
    }

    /// Opens the active faction's turn.
    ///
    /// Refreshes movement and attack budgets of every placed unit and lets
    /// healing-capable units regain strength.
    pub fn execute_begin_turn(&mut self) -> Result<()> {
        let faction = self.world.active_faction_id();
        let ids: Vec<EntityId> = self
            .world
            .faction(faction)
            .map(|f| f.entities.iter().copied().collect())
            .unwrap_or_default();
        for id in ids {
            let Some(entity) = self.world.entity_mut(id) else {
                continue;
            };
            if !entity.is_unit() || !entity.is_alive() || !entity.is_placed() {
                continue;
            }
            entity.refresh_for_turn();
            if entity.can_heal() && entity.strength < entity.max_strength {
                entity.strength = (entity.strength + HEAL_PER_TURN).min(entity.max_strength);
            }
        }
        self.world.history.push(Command::BeginTurn);
        Ok(())
    }

    /// Closes the active faction's turn and advances the cursor; wrapping
    /// past the last faction increments the turn counter.
    pub fn execute_end_turn(&mut self) -> Result<()> {
        let next = (self.world.active_faction_index + 1) % self.world.factions.len();
        if next == 0 {
            self.world.current_turn += 1;
        }
        self.world.active_faction_index = next;
        self.world.history.push(Command::EndTurn);
        Ok(())
    }

    /// Builds `count` entities of `class` for the active faction.
    pub fn execute_build(&mut self, class: &str, count: i32) -> Result<bool> {
        let faction = self.world.active_faction();
        if count < 1
            || !faction.buildable.iter().any(|c| c == class)
            || count > faction.get_build_count(self.world, class)
        {
            debug!(target: "core::executor", class, count, "build rejected");
            return Ok(false);
        }
        let faction_id = faction.id;
        let cost = self
            .world
            .class(class)
            .map(|c| c.build_cost)
            .unwrap_or(0);
        for _ in 0..count {
            self.world.spawn_entity(class, Some(faction_id))?;
        }
        if let Some(faction) = self.world.faction_mut(faction_id) {
            faction.build_points -= cost * count;
            if let Some(pool) = faction.unit_pool.get_mut(class) {
                *pool -= count;
            }
        }
        self.world.history.push(Command::Build {
            class: class.to_owned(),
            count,
        });
        Ok(true)
    }

    /// Places built entities on a site of the active faction.
    ///
    /// Freshly placed entities cannot act until their next turn.
    pub fn execute_place(&mut self, entities: &[EntityId], site: HexCoord) -> Result<bool> {
        let faction = self.world.active_faction();
        if !faction.can_place(self.world, entities, site) {
            debug!(target: "core::executor", %site, "placement rejected");
            return Ok(false);
        }
        for id in entities {
            let entity = self.world.entity_mut(*id).expect("validated above");
            entity.site = Some(site);
            entity.movement_left = 0;
            entity.attack_done = true;
        }
        if let Some(site_data) = self.world.site_mut(site) {
            site_data.entities.extend_from_slice(entities);
        }
        self.world.history.push(Command::Place {
            entities: entities.to_vec(),
            site,
        });
        Ok(true)
    }

    /// Moves a stack along its best path toward `target`.
    ///
    /// All units must share a site and be able to move; the path cost must
    /// fit the stack's remaining movement. A capture-capable unit ending on
    /// a capturable site transfers ownership and ends the stack's movement.
    pub fn execute_move(&mut self, units: &[EntityId], target: HexCoord) -> Result<bool> {
        let Some(source) = path::stack_site(self.world, units) else {
            debug!(target: "core::executor", "move rejected: units not stacked together");
            return Ok(false);
        };
        if source == target || !self.world.grid.in_bounds(target) {
            return Ok(false);
        }
        let faction = self.world.active_faction_id();
        if units.iter().any(|id| {
            self.world
                .entity(*id)
                .is_none_or(|e| e.owner != Some(faction) || !e.can_move())
        }) {
            debug!(target: "core::executor", "move rejected: unit cannot move");
            return Ok(false);
        }
        if self
            .world
            .site(target)
            .is_none_or(|s| s.has_alien_units(self.world, faction))
        {
            return Ok(false);
        }

        // Validation and cost deduction use face costs; the hostile-ground
        // surcharge is a route preference of the decision layer, not a rule.
        let path = path::find_move_path(self.world, units, source, target, true);
        if !path.found {
            debug!(target: "core::executor", from = %source, to = %target, "move rejected: no path");
            return Ok(false);
        }
        let budget = path::stack_budget(self.world, units);
        if path.cost > budget {
            // The decision layer should have truncated the path; skip the
            // action rather than overdraw the movement budget.
            warn!(
                target: "core::executor",
                from = %source, to = %target, cost = path.cost, budget,
                "move inconsistent with remaining movement"
            );
            return Ok(false);
        }

        if let Some(site) = self.world.site_mut(source) {
            site.entities.retain(|id| !units.contains(id));
        }
        if let Some(site) = self.world.site_mut(target) {
            site.entities.extend_from_slice(units);
        }
        let mut can_capture = false;
        for id in units {
            let entity = self.world.entity_mut(*id).expect("validated above");
            entity.site = Some(target);
            entity.movement_left -= path.cost;
            can_capture |= entity.can_capture();
        }

        let capturable = self
            .world
            .site(target)
            .is_some_and(|s| s.can_capture && s.owner != Some(faction));
        if capturable && can_capture {
            self.capture_site(target, faction);
            for id in units {
                if let Some(entity) = self.world.entity_mut(*id) {
                    entity.movement_left = 0;
                }
            }
        }

        self.world.history.push(Command::Move {
            units: units.to_vec(),
            target,
        });
        Ok(true)
    }

    /// Resolves an attack of `units` against the stack at `target`.
    ///
    /// A poor outcome is still a completed command; only rule violations
    /// (attacker out of range, empty target) are rejected.
    pub fn execute_attack(&mut self, units: &[EntityId], target: HexCoord) -> Result<bool> {
        let faction = self.world.active_faction_id();
        if units.is_empty()
            || self
                .world
                .site(target)
                .is_none_or(|s| !s.has_alien_units(self.world, faction))
        {
            return Ok(false);
        }
        for id in units {
            let entity = self.world.require_entity(*id)?;
            let in_range = entity.site.is_some_and(|from| {
                path::can_attack_target(self.world, *id, from, target)
            });
            if entity.owner != Some(faction) || !in_range {
                debug!(
                    target: "core::executor",
                    unit = id.0, to = %target,
                    "attack rejected: unit cannot reach target"
                );
                return Ok(false);
            }
        }

        let adjacent = combat::adjacent_attack(self.world, units, target);
        let results = combat::estimate_losses(self.world, units, target, adjacent);
        let defenders = combat::defenders_at(self.world, target);
        combat::apply_losses(self.world, &defenders, results.defender_losses);
        combat::apply_losses(self.world, units, results.attacker_losses);

        for id in units {
            if let Some(entity) = self.world.entity_mut(*id) {
                if entity.is_alive() {
                    entity.attack_done = true;
                    entity.movement_left = 0;
                }
            }
        }
        self.world.refresh_game_over();
        self.world.history.push(Command::Attack {
            units: units.to_vec(),
            target,
        });
        Ok(true)
    }

    fn capture_site(&mut self, coord: HexCoord, new_owner: crate::state::FactionId) {
        let old_owner = self.world.site(coord).and_then(|s| s.owner);
        if let Some(old) = old_owner {
            if let Some(faction) = self.world.faction_mut(old) {
                faction.sites.remove(&coord);
            }
        }
        if let Some(site) = self.world.site_mut(coord) {
            site.owner = Some(new_owner);
        }
        if let Some(faction) = self.world.faction_mut(new_owner) {
            faction.sites.insert(coord);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::WorldBuilder;
    use crate::state::{ClassFlags, EntityClass};

    fn small_world() -> (WorldState, EntityId, EntityId) {
        let mut builder = WorldBuilder::new(10, 10);
        builder.add_class(
            EntityClass::unit("inf", "Infantry", 60, 50, 4).with_flags(ClassFlags::CAN_CAPTURE),
        );
        builder.add_class(EntityClass::unit("militia", "Militia", 20, 20, 2));
        builder.add_faction("Red");
        builder.add_faction("Blue");
        builder.set_buildable(0, &["inf"]);
        builder.set_build_points(0, 100);
        let red = builder.add_unit(0, "inf", (2, 2));
        let blue = builder.add_unit(1, "militia", (6, 2));
        builder.set_site_owner((2, 2), 0);
        (builder.build(), red, blue)
    }

    #[test]
    fn begin_turn_refreshes_budgets_and_appends_history() {
        let (mut world, red, _) = small_world();
        assert!(!world.entity(red).unwrap().can_move());
        Executor::new(&mut world).execute_begin_turn().unwrap();
        assert!(world.entity(red).unwrap().can_move());
        assert!(world.entity(red).unwrap().can_attack());
        assert_eq!(world.history.len(), 1);
        assert!(world.history.have_begin_turn());
    }

    #[test]
    fn end_turn_advances_cursor_and_turn_counter() {
        let (mut world, _, _) = small_world();
        assert_eq!(world.current_turn, 1);
        Executor::new(&mut world).execute_end_turn().unwrap();
        assert_eq!(world.active_faction_index, 1);
        assert_eq!(world.current_turn, 1);
        Executor::new(&mut world).execute_end_turn().unwrap();
        assert_eq!(world.active_faction_index, 0);
        assert_eq!(world.current_turn, 2);
        assert!(!world.history.have_begin_turn());
    }

    #[test]
    fn build_respects_build_points() {
        let (mut world, _, _) = small_world();
        // 100 points at cost 10 affords at most 10.
        assert!(!Executor::new(&mut world).execute_build("inf", 11).unwrap());
        assert_eq!(world.history.len(), 0);
        assert!(Executor::new(&mut world).execute_build("inf", 3).unwrap());
        assert_eq!(world.factions[0].build_points, 70);
        assert_eq!(world.history.len(), 1);
        assert_eq!(world.active_faction().units(&world).len(), 4);
    }

    #[test]
    fn place_requires_owned_site() {
        let (mut world, _, _) = small_world();
        Executor::new(&mut world).execute_build("inf", 1).unwrap();
        let built = *world.active_faction().units(&world).last().unwrap();
        assert!(
            !Executor::new(&mut world)
                .execute_place(&[built], HexCoord::new(5, 5))
                .unwrap()
        );
        assert!(
            Executor::new(&mut world)
                .execute_place(&[built], HexCoord::new(2, 2))
                .unwrap()
        );
        let entity = world.entity(built).unwrap();
        assert_eq!(entity.site, Some(HexCoord::new(2, 2)));
        assert!(!entity.is_active());
    }

    #[test]
    fn move_deducts_cost_and_captures() {
        let (mut world, red, _) = small_world();
        world.site_mut(HexCoord::new(3, 2)).unwrap().can_capture = true;
        Executor::new(&mut world).execute_begin_turn().unwrap();
        assert!(
            Executor::new(&mut world)
                .execute_move(&[red], HexCoord::new(3, 2))
                .unwrap()
        );
        let site = world.site(HexCoord::new(3, 2)).unwrap();
        assert_eq!(site.owner, Some(world.factions[0].id));
        // Capturing consumes the rest of the movement budget.
        assert_eq!(world.entity(red).unwrap().movement_left, 0);
        assert_eq!(world.history.len(), 2);
    }

    #[test]
    fn attack_out_of_range_is_rejected_without_history() {
        let (mut world, red, _) = small_world();
        Executor::new(&mut world).execute_begin_turn().unwrap();
        let before = world.history.len();
        assert!(
            !Executor::new(&mut world)
                .execute_attack(&[red], HexCoord::new(6, 2))
                .unwrap()
        );
        assert_eq!(world.history.len(), before);
    }

    #[test]
    fn attack_marks_attackers_spent() {
        let (mut world, red, blue) = small_world();
        // Bring the enemy adjacent for a clean melee.
        let blue_site = world.entity(blue).unwrap().site.unwrap();
        if let Some(site) = world.site_mut(blue_site) {
            site.entities.clear();
        }
        world.entity_mut(blue).unwrap().site = Some(HexCoord::new(3, 2));
        world
            .site_mut(HexCoord::new(3, 2))
            .unwrap()
            .entities
            .push(blue);
        Executor::new(&mut world).execute_begin_turn().unwrap();
        assert!(
            Executor::new(&mut world)
                .execute_attack(&[red], HexCoord::new(3, 2))
                .unwrap()
        );
        let red_entity = world.entity(red).unwrap();
        assert!(red_entity.attack_done);
        assert_eq!(red_entity.movement_left, 0);
        assert!(world.history.iter().any(|c| c.as_snake_case() == "attack"));
    }

    #[test]
    fn eliminating_the_last_enemy_ends_the_game() {
        let (mut world, red, blue) = small_world();
        let blue_site = world.entity(blue).unwrap().site.unwrap();
        world.site_mut(blue_site).unwrap().entities.clear();
        world.entity_mut(blue).unwrap().site = Some(HexCoord::new(3, 2));
        world.entity_mut(blue).unwrap().strength = 10;
        world
            .site_mut(HexCoord::new(3, 2))
            .unwrap()
            .entities
            .push(blue);
        Executor::new(&mut world).execute_begin_turn().unwrap();
        assert!(
            Executor::new(&mut world)
                .execute_attack(&[red], HexCoord::new(3, 2))
                .unwrap()
        );
        assert!(!world.entity(blue).unwrap().is_alive());
        assert!(world.game_over);
    }

    #[test]
    fn replay_reproduces_world() {
        let (world, red, _) = small_world();
        let base = world.clone();
        let mut played = world;
        Executor::new(&mut played).execute_begin_turn().unwrap();
        Executor::new(&mut played).execute_build("inf", 2).unwrap();
        Executor::new(&mut played)
            .execute_move(&[red], HexCoord::new(3, 2))
            .unwrap();
        Executor::new(&mut played).execute_end_turn().unwrap();

        let replayed = played.history.replay(&base).unwrap();
        assert_eq!(replayed, played);
    }
}
