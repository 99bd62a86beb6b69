//! Deterministic combat estimation and resolution.
//!
//! The same ratio model backs `estimate_losses` and the attack command, so
//! an estimate is exact for the world it was computed against. Randomness is
//! deliberately absent: replaying a history must reproduce the world.

use serde::{Deserialize, Serialize};

use crate::grid::HexCoord;
use crate::state::{EntityId, WorldState};

/// Extra effective defense granted per point of terrain difficulty.
const TERRAIN_DEFENSE_WEIGHT: i64 = 2;

/// Outcome of one combat round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatResults {
    pub attacker_losses: i32,
    pub defender_losses: i32,
    /// Attacker losses as a percentage of total attacker strength.
    pub attacker_percent: i32,
    /// Defender losses as a percentage of total defender strength.
    pub defender_percent: i32,
}

/// Effective combat power of a set of units: stat scaled by remaining strength.
fn effective_power(world: &WorldState, units: &[EntityId], attacking: bool) -> i64 {
    units
        .iter()
        .filter_map(|id| world.entity(*id))
        .filter(|e| e.is_alive() && e.is_combat())
        .map(|e| {
            let stat = if attacking { e.attack } else { e.defense } as i64;
            stat * e.strength as i64 / e.max_strength.max(1) as i64
        })
        .sum()
}

fn total_strength(world: &WorldState, units: &[EntityId]) -> i64 {
    units
        .iter()
        .filter_map(|id| world.entity(*id))
        .filter(|e| e.is_alive())
        .map(|e| e.strength as i64)
        .sum()
}

/// Terrain contribution to the defense of `site`.
fn terrain_defense(world: &WorldState, site: HexCoord) -> i64 {
    world
        .site(site)
        .map(|s| {
            s.entities
                .iter()
                .filter_map(|id| world.entity(*id))
                .map(|e| e.difficulty as i64)
                .sum::<i64>()
                * TERRAIN_DEFENSE_WEIGHT
        })
        .unwrap_or(0)
}

/// Defending units stacked on `site`.
pub fn defenders_at(world: &WorldState, site: HexCoord) -> Vec<EntityId> {
    world
        .site(site)
        .map(|s| {
            s.entities
                .iter()
                .copied()
                .filter(|id| {
                    world
                        .entity(*id)
                        .is_some_and(|e| e.is_unit() && e.is_alive())
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Whether every attacker strikes from a site adjacent to `target`.
///
/// Mixed stacks with a ranged participant count as a ranged strike.
pub fn adjacent_attack(world: &WorldState, units: &[EntityId], target: HexCoord) -> bool {
    units
        .iter()
        .filter_map(|id| world.entity(*id))
        .filter(|e| e.is_alive() && e.is_placed())
        .all(|e| e.site.is_some_and(|s| s.distance(target) == 1))
}

/// Estimates the losses of `attackers` striking the stack at `target`.
///
/// `adjacent` marks close combat; ranged strikes halve the counterattack.
/// The estimate is exact: executing the attack on the same world applies
/// precisely these numbers.
pub fn estimate_losses(
    world: &WorldState,
    attackers: &[EntityId],
    target: HexCoord,
    adjacent: bool,
) -> CombatResults {
    let defenders = defenders_at(world, target);
    let att_power = effective_power(world, attackers, true);
    let def_power = effective_power(world, &defenders, false) + terrain_defense(world, target);
    let att_total = total_strength(world, attackers);
    let def_total = total_strength(world, &defenders);
    if att_power <= 0 || def_total <= 0 {
        return CombatResults::default();
    }

    let power_sum = (att_power + def_power).max(1);
    let defender_losses = (att_power * att_power / power_sum).min(def_total);
    let mut attacker_losses = (def_power * def_power / power_sum).min(att_total);
    if !adjacent {
        attacker_losses /= 2;
    }

    CombatResults {
        attacker_losses: attacker_losses as i32,
        defender_losses: defender_losses as i32,
        attacker_percent: percent(attacker_losses, att_total),
        defender_percent: percent(defender_losses, def_total),
    }
}

fn percent(losses: i64, total: i64) -> i32 {
    if total <= 0 {
        0
    } else {
        (losses * 100 / total) as i32
    }
}

/// Applies `losses` across `units` in stack order, burying the dead.
///
/// Returns the ids that died.
pub(crate) fn apply_losses(
    world: &mut WorldState,
    units: &[EntityId],
    mut losses: i32,
) -> Vec<EntityId> {
    let mut dead = Vec::new();
    for id in units {
        if losses <= 0 {
            break;
        }
        let Some(entity) = world.entity_mut(*id) else {
            continue;
        };
        if !entity.is_alive() {
            continue;
        }
        let hit = losses.min(entity.strength);
        entity.strength -= hit;
        losses -= hit;
        if entity.strength <= 0 {
            dead.push(*id);
        }
    }
    for id in &dead {
        world.bury(*id);
    }
    dead
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::WorldBuilder;
    use crate::state::EntityClass;

    fn world() -> (WorldState, EntityId, EntityId) {
        let mut builder = WorldBuilder::new(8, 8);
        builder.add_class(EntityClass::unit("inf", "Infantry", 60, 50, 4));
        builder.add_class(EntityClass::unit("wagon", "Wagon", 5, 10, 6));
        builder.add_faction("Red");
        builder.add_faction("Blue");
        let attacker = builder.add_unit(0, "inf", (2, 2));
        let defender = builder.add_unit(1, "wagon", (3, 2));
        let world = builder.build();
        (world, attacker, defender)
    }

    #[test]
    fn estimate_favors_stronger_side() {
        let (world, attacker, _) = world();
        let r = estimate_losses(&world, &[attacker], HexCoord::new(3, 2), true);
        assert!(r.defender_losses > r.attacker_losses);
        assert!(r.defender_percent > r.attacker_percent);
    }

    #[test]
    fn ranged_attack_halves_counterattack() {
        let (world, attacker, _) = world();
        let close = estimate_losses(&world, &[attacker], HexCoord::new(3, 2), true);
        let ranged = estimate_losses(&world, &[attacker], HexCoord::new(3, 2), false);
        assert_eq!(ranged.defender_losses, close.defender_losses);
        assert!(ranged.attacker_losses <= close.attacker_losses);
    }

    #[test]
    fn empty_target_estimates_zero() {
        let (world, attacker, _) = world();
        let r = estimate_losses(&world, &[attacker], HexCoord::new(5, 5), true);
        assert_eq!(r, CombatResults::default());
    }

    #[test]
    fn losses_are_applied_in_stack_order() {
        let (mut world, _, defender) = world();
        let dead = apply_losses(&mut world, &[defender], 100);
        assert_eq!(dead, vec![defender]);
        assert!(!world.entity(defender).unwrap().is_alive());
        assert!(world.entity(defender).unwrap().site.is_none());
    }
}
