//! Target ranking heuristics.
//!
//! All selections are deterministic: candidate lists are pre-sorted by
//! distance with `(y, x)` tie-breaks, comparisons are lexicographic, and
//! the only stochastic step is the final coin flip between two targets the
//! faction genuinely cannot tell apart.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use hexfield_core::{
    CombatResults, EntityId, HexCoord, Path, Valuable, WorldState, combat, path, rng,
};

use crate::options::AlgorithmOptions;

/// How far a target is from being attackable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RangeCategory {
    /// In attack range from where the stack stands.
    Short,
    /// One step of movement brings the stack into range.
    Medium,
    /// Reaching the target needs multi-turn movement.
    Long,
}

/// Which loss figures decide between two combat outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombatComparison {
    /// `defender_losses - attacker_losses`; right when losses are final.
    Absolute,
    /// `defender_percent - attacker_percent`; right when units heal back.
    Relative,
}

impl CombatComparison {
    /// Larger is better for the attacker.
    pub fn key(&self, results: &CombatResults) -> i32 {
        match self {
            CombatComparison::Absolute => results.defender_losses - results.attacker_losses,
            CombatComparison::Relative => results.defender_percent - results.attacker_percent,
        }
    }
}

/// Picks the comparison mode from the healing ability of existing units.
///
/// All classes heal: relative. None heal: absolute. Mixed: placed units are
/// counted until one side holds a strict majority, short-circuiting as soon
/// as it is established.
pub fn select_combat_comparison(world: &WorldState) -> CombatComparison {
    let mut heal_classes: BTreeSet<&str> = BTreeSet::new();
    let mut other_classes: BTreeSet<&str> = BTreeSet::new();
    for entity in world.entities() {
        if entity.is_unit() && entity.is_alive() {
            if entity.can_heal() {
                heal_classes.insert(entity.class.as_str());
            } else {
                other_classes.insert(entity.class.as_str());
            }
        }
    }
    if other_classes.is_empty() {
        return CombatComparison::Relative;
    }
    if heal_classes.is_empty() {
        return CombatComparison::Absolute;
    }

    let placed: Vec<bool> = world
        .entities()
        .filter(|e| e.is_unit() && e.is_alive() && e.is_placed())
        .map(|e| e.can_heal())
        .collect();
    let total = placed.len();
    let mut healers = 0usize;
    let mut fighters = 0usize;
    for heals in placed {
        if heals {
            healers += 1;
            if healers * 2 > total {
                return CombatComparison::Relative;
            }
        } else {
            fighters += 1;
            if fighters * 2 > total {
                return CombatComparison::Absolute;
            }
        }
    }
    CombatComparison::Absolute
}

/// Compares two valuables from `faction`'s point of view.
///
/// Contextual evaluation first, context-free valuation second, and a coin
/// flip from the shared PRNG when both agree.
pub fn select_valuable(
    world: &WorldState,
    faction: hexfield_core::FactionId,
    a: Valuable<'_>,
    b: Valuable<'_>,
) -> Ordering {
    let Some(faction) = world.faction(faction) else {
        return Ordering::Equal;
    };
    let by_evaluation = faction
        .evaluate(world, a)
        .partial_cmp(&faction.evaluate(world, b))
        .unwrap_or(Ordering::Equal);
    if by_evaluation != Ordering::Equal {
        return by_evaluation;
    }
    let by_valuation = a
        .valuation()
        .partial_cmp(&b.valuation())
        .unwrap_or(Ordering::Equal);
    if by_valuation != Ordering::Equal {
        return by_valuation;
    }
    if rng::coin() {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

fn compare_sites(world: &WorldState, faction: hexfield_core::FactionId, a: HexCoord, b: HexCoord) -> Ordering {
    match (world.site(a), world.site(b)) {
        (Some(sa), Some(sb)) => {
            select_valuable(world, faction, Valuable::Site(sa), Valuable::Site(sb))
        }
        _ => Ordering::Equal,
    }
}

/// The `target-limit` candidates nearest to `origin`, `(y, x)` tie-broken.
fn nearest_candidates(
    origin: HexCoord,
    candidates: &[HexCoord],
    options: &AlgorithmOptions,
) -> Vec<HexCoord> {
    let mut sorted = candidates.to_vec();
    sorted.sort_by_key(|c| (origin.distance(*c), c.y, c.x));
    sorted.dedup();
    sorted.truncate(options.target_limit() as usize);
    sorted
}

/// Attack-target choice for an already positioned stack.
///
/// Examines the `target-limit` closest candidates that are actually in the
/// stack's attack-target list and ranks them by: mobile defenders first,
/// better combat outcome second, more valuable site last.
pub fn select_attack_target_in_range(
    world: &WorldState,
    options: &AlgorithmOptions,
    units: &[EntityId],
    candidates: &[HexCoord],
    comparison: CombatComparison,
) -> Option<HexCoord> {
    let origin = path::stack_site(world, units)?;
    let faction = world.entity(*units.first()?)?.owner?;
    let in_range = path::find_attack_targets(world, units);
    let mut best: Option<(HexCoord, bool, i32)> = None;
    for target in nearest_candidates(origin, candidates, options) {
        if !in_range.contains(&target) {
            continue;
        }
        let mobile = world
            .site(target)
            .is_some_and(|s| s.count_mobile_units(world) > 0);
        let adjacent = combat::adjacent_attack(world, units, target);
        let outcome = comparison.key(&combat::estimate_losses(world, units, target, adjacent));
        let better = match &best {
            None => true,
            Some((held, held_mobile, held_outcome)) => {
                match mobile
                    .cmp(held_mobile)
                    .then(outcome.cmp(held_outcome))
                {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => {
                        compare_sites(world, faction, target, *held) == Ordering::Greater
                    }
                }
            }
        };
        if better {
            best = Some((target, mobile, outcome));
        }
    }
    best.map(|(target, _, _)| target)
}

/// A ranked attack opportunity for a unit that may move first.
#[derive(Clone, Debug)]
pub struct AttackChoice {
    pub target: HexCoord,
    /// `0` in range now, `1` one step away, the A* cost otherwise.
    pub path_cost: i32,
    pub category: RangeCategory,
    /// Path toward the chosen firing position; `None` when already there.
    pub approach: Option<Path>,
}

struct AttackCandidate {
    target: HexCoord,
    category: RangeCategory,
    preferred: bool,
    mobile: bool,
    outcome: i32,
    distance: i32,
    path: Option<Path>,
    path_cost: i32,
}

/// Full-range attack-target choice for a single mobile unit.
///
/// Candidates are classified Short / Medium / Long; Short and Medium beat
/// Long, then the preferred set, mobile defenders, combat outcome, Short
/// over Medium, site distance, and valuation decide. Long targets rank by
/// preferred set, path cost, distance, and valuation. The returned
/// `path_cost` is `0` for Short, `1` for Medium, and the actual A* cost for
/// Long.
pub fn select_attack_target(
    world: &WorldState,
    options: &AlgorithmOptions,
    unit: EntityId,
    candidates: &[HexCoord],
    preferred: Option<&BTreeSet<HexCoord>>,
    comparison: CombatComparison,
) -> Option<AttackChoice> {
    let entity = world.entity(unit)?;
    let origin = entity.site?;
    let faction = entity.owner?;
    let budget = entity.movement_left;

    let mut near: Vec<AttackCandidate> = Vec::new();
    let mut long: Vec<AttackCandidate> = Vec::new();
    for target in nearest_candidates(origin, candidates, options) {
        let is_preferred = preferred.is_some_and(|p| p.contains(&target));
        let mobile = world
            .site(target)
            .is_some_and(|s| s.count_mobile_units(world) > 0);
        let distance = origin.distance(target);

        if path::in_attack_range(world, unit, origin, target) {
            let adjacent = distance == 1;
            let outcome =
                comparison.key(&combat::estimate_losses(world, &[unit], target, adjacent));
            near.push(AttackCandidate {
                target,
                category: RangeCategory::Short,
                preferred: is_preferred,
                mobile,
                outcome,
                distance,
                path: None,
                path_cost: 0,
            });
            continue;
        }

        if let Some((step, step_cost)) = one_step_firing_position(world, unit, origin, target, budget)
        {
            let adjacent = step.distance(target) == 1;
            let outcome =
                comparison.key(&combat::estimate_losses(world, &[unit], target, adjacent));
            let path = Path {
                found: true,
                nodes: vec![origin, step],
                step_costs: vec![step_cost],
                cost: step_cost,
            };
            near.push(AttackCandidate {
                target,
                category: RangeCategory::Medium,
                preferred: is_preferred,
                mobile,
                outcome,
                distance,
                path: Some(path),
                path_cost: 1,
            });
            continue;
        }

        if let Some(path) = approach_path(world, unit, origin, target) {
            let cost = path.cost;
            long.push(AttackCandidate {
                target,
                category: RangeCategory::Long,
                preferred: is_preferred,
                mobile,
                outcome: 0,
                distance,
                path: Some(path),
                path_cost: cost,
            });
        }
    }

    let chosen = if !near.is_empty() {
        near.into_iter().reduce(|held, next| {
            let order = next
                .preferred
                .cmp(&held.preferred)
                .then(next.mobile.cmp(&held.mobile))
                .then(next.outcome.cmp(&held.outcome))
                .then(held.category.cmp(&next.category))
                .then(held.distance.cmp(&next.distance))
                .then_with(|| compare_sites(world, faction, next.target, held.target));
            if order == Ordering::Greater { next } else { held }
        })
    } else {
        long.into_iter().reduce(|held, next| {
            let order = next
                .preferred
                .cmp(&held.preferred)
                .then(held.path_cost.cmp(&next.path_cost))
                .then(held.distance.cmp(&next.distance))
                .then_with(|| compare_sites(world, faction, next.target, held.target));
            if order == Ordering::Greater { next } else { held }
        })
    };

    chosen.map(|c| AttackChoice {
        target: c.target,
        path_cost: c.path_cost,
        category: c.category,
        approach: c.path,
    })
}

/// A neighbor the unit can step onto this turn that has `target` in range,
/// with the cost of that step.
fn one_step_firing_position(
    world: &WorldState,
    unit: EntityId,
    origin: HexCoord,
    target: HexCoord,
    budget: i32,
) -> Option<(HexCoord, i32)> {
    let units = [unit];
    let agent = path::MoveAgent::new(world, &units, true);
    world
        .grid
        .neighbors_in_bounds(origin)
        .into_iter()
        .filter_map(|n| agent.step_cost(n).map(|c| (n, c)))
        .filter(|(_, c)| *c <= budget)
        .filter(|(n, _)| path::in_attack_range(world, unit, *n, target))
        .min_by_key(|(n, _)| (n.y, n.x))
}

/// Cheapest multi-turn path to any firing position for `target`.
fn approach_path(
    world: &WorldState,
    unit: EntityId,
    origin: HexCoord,
    target: HexCoord,
) -> Option<Path> {
    let entity = world.entity(unit)?;
    let range = entity.attack_range.max(1);
    let units = [unit];
    let agent = path::MoveAgent::new(world, &units, true);

    let mut positions: Vec<HexCoord> = Vec::new();
    for site in world.grid.iter() {
        let coord = site.coord;
        if coord == origin || coord.distance(target) > range {
            continue;
        }
        if agent.step_cost(coord).is_none() {
            continue;
        }
        if path::in_attack_range(world, unit, coord, target) {
            positions.push(coord);
        }
    }
    positions.sort_by_key(|c| (origin.distance(*c), c.y, c.x));

    let mut best: Option<Path> = None;
    for position in positions {
        let path = path::find_move_path(world, &units, origin, position, true);
        if !path.found {
            continue;
        }
        if best.as_ref().is_none_or(|b| path.cost < b.cost) {
            best = Some(path);
        }
    }
    best
}

/// A ranked movement destination.
#[derive(Clone, Debug)]
pub struct MoveChoice {
    pub target: HexCoord,
    pub path: Path,
    pub category: RangeCategory,
}

/// Movement-target choice for a stack.
///
/// Considers the `target-limit` nearest candidates reachable at all. With
/// `supply_index` set, only candidates holding that resource qualify and
/// richer ones win. Remaining ties go to the closer range category, the
/// cheaper path, and finally the more valuable site.
pub fn select_move_target(
    world: &WorldState,
    options: &AlgorithmOptions,
    units: &[EntityId],
    candidates: &[HexCoord],
    supply_index: Option<usize>,
) -> Option<MoveChoice> {
    let origin = path::stack_site(world, units)?;
    let faction = world.entity(*units.first()?)?.owner?;
    let budget = path::stack_budget(world, units);

    let mut best: Option<(MoveChoice, i32)> = None;
    for target in nearest_candidates(origin, candidates, options) {
        if target == origin {
            continue;
        }
        let supply = match supply_index {
            Some(index) => {
                let value = world.site(target).map(|s| s.supply_at(index)).unwrap_or(0);
                if value <= 0 {
                    continue;
                }
                value
            }
            None => 0,
        };
        let path = path::find_move_path(world, units, origin, target, false);
        if !path.found || path.nodes.len() < 2 {
            continue;
        }
        let category = if path.cost <= budget {
            RangeCategory::Medium
        } else {
            RangeCategory::Long
        };
        let candidate = MoveChoice {
            target,
            path,
            category,
        };
        let better = match &best {
            None => true,
            Some((held, held_supply)) => {
                match supply
                    .cmp(held_supply)
                    .then(held.category.cmp(&candidate.category))
                    .then(held.path.cost.cmp(&candidate.path.cost))
                {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => {
                        compare_sites(world, faction, candidate.target, held.target)
                            == Ordering::Greater
                    }
                }
            }
        };
        if better {
            best = Some((candidate, supply));
        }
    }
    best.map(|(choice, _)| choice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexfield_core::{ClassFlags, EntityClass, Executor, WorldBuilder};

    fn base_builder() -> WorldBuilder {
        let mut b = WorldBuilder::new(12, 12);
        b.add_class(EntityClass::unit("inf", "Infantry", 60, 50, 4));
        b.add_class(EntityClass::unit("cav", "Cavalry", 70, 30, 8));
        b.add_class(EntityClass::unit("bunker", "Bunker", 0, 80, 0));
        b.add_class(
            EntityClass::unit("medic", "Medic", 10, 20, 4).with_flags(ClassFlags::CAN_HEAL),
        );
        b.add_faction("Red");
        b.add_faction("Blue");
        b
    }

    fn refreshed(mut world: WorldState) -> WorldState {
        Executor::new(&mut world).execute_begin_turn().unwrap();
        world
    }

    #[test]
    fn comparison_follows_the_healing_majority() {
        let mut b = base_builder();
        b.add_unit(0, "inf", (1, 1));
        b.add_unit(1, "inf", (8, 8));
        let world = b.build();
        assert_eq!(select_combat_comparison(&world), CombatComparison::Absolute);

        let mut b = base_builder();
        b.add_unit(0, "medic", (1, 1));
        b.add_unit(1, "medic", (8, 8));
        let world = b.build();
        assert_eq!(select_combat_comparison(&world), CombatComparison::Relative);

        let mut b = base_builder();
        b.add_unit(0, "medic", (1, 1));
        b.add_unit(0, "medic", (1, 2));
        b.add_unit(1, "inf", (8, 8));
        let world = b.build();
        assert_eq!(select_combat_comparison(&world), CombatComparison::Relative);

        let mut b = base_builder();
        b.add_unit(0, "medic", (1, 1));
        b.add_unit(1, "inf", (8, 8));
        b.add_unit(1, "inf", (9, 8));
        let world = b.build();
        assert_eq!(select_combat_comparison(&world), CombatComparison::Absolute);
    }

    #[test]
    fn in_range_selection_prefers_mobile_defenders() {
        let mut b = base_builder();
        let attacker = b.add_unit(0, "inf", (5, 5));
        b.add_unit(1, "bunker", (6, 5));
        b.add_unit(1, "cav", (4, 5));
        let world = refreshed(b.build());
        let options = AlgorithmOptions::default();
        let chosen = select_attack_target_in_range(
            &world,
            &options,
            &[attacker],
            &[HexCoord::new(6, 5), HexCoord::new(4, 5)],
            CombatComparison::Absolute,
        );
        assert_eq!(chosen, Some(HexCoord::new(4, 5)));
    }

    #[test]
    fn full_range_selection_classifies_categories() {
        let options = AlgorithmOptions::default();

        // Adjacent enemy: Short, reported cost 0.
        let mut b = base_builder();
        let unit = b.add_unit(0, "inf", (5, 5));
        b.add_unit(1, "inf", (6, 5));
        let world = refreshed(b.build());
        let choice = select_attack_target(
            &world,
            &options,
            unit,
            &[HexCoord::new(6, 5)],
            None,
            CombatComparison::Absolute,
        )
        .unwrap();
        assert_eq!(choice.category, RangeCategory::Short);
        assert_eq!(choice.path_cost, 0);

        // Two hexes out: Medium, reported cost 1.
        let mut b = base_builder();
        let unit = b.add_unit(0, "inf", (4, 5));
        b.add_unit(1, "inf", (6, 5));
        let world = refreshed(b.build());
        let choice = select_attack_target(
            &world,
            &options,
            unit,
            &[HexCoord::new(6, 5)],
            None,
            CombatComparison::Absolute,
        )
        .unwrap();
        assert_eq!(choice.category, RangeCategory::Medium);
        assert_eq!(choice.path_cost, 1);

        // Far away: Long, reported cost is the real path cost.
        let mut b = base_builder();
        let unit = b.add_unit(0, "inf", (0, 5));
        b.add_unit(1, "inf", (9, 5));
        let world = refreshed(b.build());
        let choice = select_attack_target(
            &world,
            &options,
            unit,
            &[HexCoord::new(9, 5)],
            None,
            CombatComparison::Absolute,
        )
        .unwrap();
        assert_eq!(choice.category, RangeCategory::Long);
        assert!(choice.path_cost > 1);
        assert!(choice.approach.is_some());
    }

    #[test]
    fn move_selection_filters_and_prefers_supply() {
        let mut b = base_builder();
        let unit = b.add_unit(0, "inf", (5, 5));
        b.set_site_owner((6, 5), 0);
        b.set_site_supplies((6, 5), vec![0]);
        b.set_site_owner((2, 5), 0);
        b.set_site_supplies((2, 5), vec![5]);
        let world = refreshed(b.build());
        let options = AlgorithmOptions::default();
        let candidates = [HexCoord::new(6, 5), HexCoord::new(2, 5)];

        // The adjacent site carries no supply at index 0: the farther one
        // wins under the filter.
        let chosen = select_move_target(&world, &options, &[unit], &candidates, Some(0)).unwrap();
        assert_eq!(chosen.target, HexCoord::new(2, 5));

        // Without the filter the nearer site wins on path cost.
        let chosen = select_move_target(&world, &options, &[unit], &candidates, None).unwrap();
        assert_eq!(chosen.target, HexCoord::new(6, 5));
    }
}
