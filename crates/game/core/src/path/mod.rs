//! Hex pathfinding and reachability queries.
//!
//! A* over the site grid with unit-stack cost functions. The search is
//! fully deterministic: frontier ties break on lower `(y, x)` coordinates,
//! so two runs over equal worlds expand identical node sequences.

mod agent;

pub use agent::MoveAgent;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};

use crate::grid::HexCoord;
use crate::state::{
    ClassFlags, ClassId, EntityCategory, EntityId, FactionId, WorldState,
};

/// Result of a single best-path search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathResult {
    /// False when the target was unreachable; `nodes` then lead to the
    /// explored coordinate closest to the target.
    pub found: bool,
    /// Ordered coordinates from source to destination, source included.
    pub nodes: Vec<HexCoord>,
    /// Total step cost along `nodes`.
    pub cost: i32,
}

/// A computed movement path with per-step costs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    pub found: bool,
    pub nodes: Vec<HexCoord>,
    /// Cost of entering `nodes[i + 1]` from `nodes[i]`.
    pub step_costs: Vec<i32>,
    pub cost: i32,
}

impl Path {
    fn empty(source: HexCoord) -> Self {
        Self {
            found: false,
            nodes: vec![source],
            step_costs: Vec::new(),
            cost: 0,
        }
    }

    /// The farthest node along the path whose cumulative cost fits within
    /// `remaining_movement`. Returns `None` when not even the first step
    /// fits.
    pub fn get_last_node(&self, remaining_movement: i32) -> Option<HexCoord> {
        let mut spent = 0;
        let mut last = None;
        for (i, step) in self.step_costs.iter().enumerate() {
            spent += step;
            if spent > remaining_movement {
                break;
            }
            last = Some(self.nodes[i + 1]);
        }
        last
    }

    /// Cumulative cost up to and including `node`, if it lies on the path.
    pub fn cost_to(&self, node: HexCoord) -> Option<i32> {
        let index = self.nodes.iter().position(|n| *n == node)?;
        Some(self.step_costs[..index].iter().sum())
    }
}

#[derive(Clone, Copy, Eq, PartialEq)]
struct Node {
    f: i32,
    g: i32,
    coord: HexCoord,
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; equal scores pop in (y, x) order.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.g.cmp(&self.g))
            .then_with(|| other.coord.cmp(&self.coord))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* search from `source` to `target` under the agent's cost model.
///
/// On failure the returned nodes form the cheapest path to the explored
/// coordinate closest to the target, so callers can still advance.
pub fn find_best_path(agent: &MoveAgent<'_>, source: HexCoord, target: HexCoord) -> PathResult {
    if source == target {
        return PathResult {
            found: true,
            nodes: vec![source],
            cost: 0,
        };
    }

    let grid = &agent.world().grid;
    let mut open = BinaryHeap::new();
    let mut came_from: HashMap<HexCoord, HexCoord> = HashMap::new();
    let mut g_score: HashMap<HexCoord, i32> = HashMap::new();

    g_score.insert(source, 0);
    open.push(Node {
        f: source.distance(target),
        g: 0,
        coord: source,
    });

    // Closest explored node for the best-effort result on failure.
    let mut best = source;
    let mut best_h = source.distance(target);

    while let Some(node) = open.pop() {
        if node.coord == target {
            let (nodes, cost) = reconstruct(&came_from, &g_score, source, target);
            return PathResult {
                found: true,
                nodes,
                cost,
            };
        }
        if node.g > *g_score.get(&node.coord).unwrap_or(&i32::MAX) {
            continue; // stale heap entry
        }

        for next in grid.neighbors_in_bounds(node.coord) {
            let Some(step) = agent.step_cost(next) else {
                continue;
            };
            let tentative = node.g + step;
            if tentative < *g_score.get(&next).unwrap_or(&i32::MAX) {
                came_from.insert(next, node.coord);
                g_score.insert(next, tentative);
                let h = next.distance(target);
                if h < best_h || (h == best_h && next < best) {
                    best = next;
                    best_h = h;
                }
                open.push(Node {
                    f: tentative + h,
                    g: tentative,
                    coord: next,
                });
            }
        }
    }

    let (nodes, cost) = reconstruct(&came_from, &g_score, source, best);
    PathResult {
        found: false,
        nodes,
        cost,
    }
}

fn reconstruct(
    came_from: &HashMap<HexCoord, HexCoord>,
    g_score: &HashMap<HexCoord, i32>,
    source: HexCoord,
    end: HexCoord,
) -> (Vec<HexCoord>, i32) {
    let mut nodes = vec![end];
    let mut current = end;
    while current != source {
        match came_from.get(&current) {
            Some(prev) => {
                nodes.push(*prev);
                current = *prev;
            }
            None => break,
        }
    }
    nodes.reverse();
    (nodes, g_score.get(&end).copied().unwrap_or(0))
}

/// The minimum remaining movement over a stack; the stack moves as one.
pub fn stack_budget(world: &WorldState, units: &[EntityId]) -> i32 {
    units
        .iter()
        .filter_map(|id| world.entity(*id))
        .map(|e| e.movement_left)
        .min()
        .unwrap_or(0)
}

/// The shared site of a stack, if all units are placed together.
pub fn stack_site(world: &WorldState, units: &[EntityId]) -> Option<HexCoord> {
    let first = world.entity(*units.first()?)?.site?;
    units
        .iter()
        .all(|id| world.entity(*id).and_then(|e| e.site) == Some(first))
        .then_some(first)
}

/// Best path for `units` from `source` to `target`, with per-step costs.
pub fn find_move_path(
    world: &WorldState,
    units: &[EntityId],
    source: HexCoord,
    target: HexCoord,
    attacking: bool,
) -> Path {
    let agent = MoveAgent::new(world, units, attacking);
    let result = find_best_path(&agent, source, target);
    if result.nodes.len() < 2 {
        let mut path = Path::empty(source);
        path.found = result.found;
        return path;
    }
    let step_costs: Vec<i32> = result.nodes[1..]
        .iter()
        .map(|n| agent.step_cost(*n).unwrap_or(i32::MAX))
        .collect();
    Path {
        found: result.found,
        cost: result.cost,
        nodes: result.nodes,
        step_costs,
    }
}

/// Neighbor hexes the stack can step onto within its remaining movement.
///
/// The one-step outward frontier used for "nearby" reasoning.
pub fn find_move_targets(world: &WorldState, units: &[EntityId]) -> Vec<HexCoord> {
    let Some(source) = stack_site(world, units) else {
        return Vec::new();
    };
    let budget = stack_budget(world, units);
    let agent = MoveAgent::new(world, units, false);
    let mut targets: Vec<HexCoord> = world
        .grid
        .neighbors_in_bounds(source)
        .into_iter()
        .filter(|c| agent.step_cost(*c).is_some_and(|cost| cost <= budget))
        .collect();
    targets.sort();
    targets
}

/// Geometric half of the attack check: range and line-of-sight only.
///
/// Ignores whether the unit has already spent its attack; use
/// [`can_attack_target`] for the full rule.
pub fn in_attack_range(world: &WorldState, unit: EntityId, from: HexCoord, to: HexCoord) -> bool {
    let Some(entity) = world.entity(unit) else {
        return false;
    };
    let distance = from.distance(to);
    if distance < 1 || distance > entity.attack_range {
        return false;
    }
    if distance > 1 && entity.ranged_mode == crate::state::RangedAttackMode::Line {
        let line = from.line_to(to);
        for coord in &line[1..line.len() - 1] {
            let blocked = world.site(*coord).is_some_and(|s| {
                s.entities.iter().any(|id| {
                    world
                        .entity(*id)
                        .is_some_and(|e| e.flags.contains(ClassFlags::BLOCKS_ATTACK))
                })
            });
            if blocked {
                return false;
            }
        }
    }
    true
}

/// Whether `unit` could attack the stack at `to` from `from`.
///
/// The unit must still have its attack available and `to` must satisfy
/// range and, for line-mode ranged classes, an unblocked line of sight.
pub fn can_attack_target(
    world: &WorldState,
    unit: EntityId,
    from: HexCoord,
    to: HexCoord,
) -> bool {
    world.entity(unit).is_some_and(|e| e.can_attack()) && in_attack_range(world, unit, from, to)
}

/// Every site the stack could attack from where it stands.
///
/// A site qualifies when it holds units alien to the stack's owner and at
/// least one stack member has it in range.
pub fn find_attack_targets(world: &WorldState, units: &[EntityId]) -> Vec<HexCoord> {
    let mut targets = BTreeSet::new();
    for id in units {
        let Some(entity) = world.entity(*id) else {
            continue;
        };
        let (Some(from), Some(owner)) = (entity.site, entity.owner) else {
            continue;
        };
        if !entity.can_attack() {
            continue;
        }
        let range = entity.attack_range;
        for site in world.grid.iter() {
            if from.distance(site.coord) > range {
                continue;
            }
            if !site.has_alien_units(world, owner) {
                continue;
            }
            if can_attack_target(world, *id, from, site.coord) {
                targets.insert(site.coord);
            }
        }
    }
    targets.into_iter().collect()
}

/// For each relevant class, the sites where the faction could place one.
///
/// Covers buildable classes and classes with unplaced entities. The
/// placement rule is site-driven, so all classes share the site list.
pub fn find_all_place_targets(
    world: &WorldState,
    faction: FactionId,
    category: EntityCategory,
) -> BTreeMap<ClassId, Vec<HexCoord>> {
    let Some(faction_data) = world.faction(faction) else {
        return BTreeMap::new();
    };

    let mut classes: BTreeSet<ClassId> = faction_data
        .buildable
        .iter()
        .filter(|id| world.class(id).is_some_and(|c| c.category == category))
        .cloned()
        .collect();
    for id in &faction_data.entities {
        if let Some(entity) = world.entity(*id) {
            if entity.category == category && entity.is_alive() && !entity.is_placed() {
                classes.insert(entity.class.clone());
            }
        }
    }

    let sites: Vec<HexCoord> = faction_data
        .sites
        .iter()
        .copied()
        .filter(|c| faction_data.can_place_at(world, *c))
        .collect();

    classes
        .into_iter()
        .map(|class| (class, sites.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::WorldBuilder;
    use crate::state::{EntityClass, RangedAttackMode};

    fn builder() -> WorldBuilder {
        let mut builder = WorldBuilder::new(12, 12);
        builder.add_class(EntityClass::unit("inf", "Infantry", 60, 50, 10));
        builder.add_class(EntityClass::terrain("hill", "Hill", 3));
        builder.add_class(
            EntityClass::terrain("wall", "Wall", 1).with_flags(ClassFlags::BLOCKS_ATTACK),
        );
        builder.add_class(
            EntityClass::unit("arty", "Artillery", 70, 20, 2).with_range(3, RangedAttackMode::Line),
        );
        builder.add_faction("Red");
        builder.add_faction("Blue");
        builder
    }

    fn refreshed(mut world: WorldState) -> WorldState {
        crate::command::Executor::new(&mut world)
            .execute_begin_turn()
            .unwrap();
        world
    }

    #[test]
    fn straight_path_has_unit_costs() {
        let mut b = builder();
        let unit = b.add_unit(0, "inf", (0, 5));
        let world = refreshed(b.build());
        let path = find_move_path(&world, &[unit], HexCoord::new(0, 5), HexCoord::new(4, 5), false);
        assert!(path.found);
        assert_eq!(path.nodes.first(), Some(&HexCoord::new(0, 5)));
        assert_eq!(path.nodes.last(), Some(&HexCoord::new(4, 5)));
        assert_eq!(path.cost, path.step_costs.iter().sum::<i32>());
        assert_eq!(path.cost, 4);
    }

    #[test]
    fn path_routes_around_difficult_terrain() {
        let mut b = builder();
        let unit = b.add_unit(0, "inf", (0, 0));
        // A ridge of hills on the direct line.
        for y in 0..4 {
            b.add_terrain("hill", (1, y));
            b.add_terrain("hill", (1, y));
        }
        let world = refreshed(b.build());
        let path = find_move_path(&world, &[unit], HexCoord::new(0, 0), HexCoord::new(3, 0), false);
        assert!(path.found);
        // Either way the total must match the per-step sum exactly.
        assert_eq!(path.cost, path.step_costs.iter().sum::<i32>());
        assert!(path.cost <= 1 + 6 + 1 + 1, "cost {} too high", path.cost);
    }

    #[test]
    fn get_last_node_respects_budget() {
        let mut b = builder();
        let unit = b.add_unit(0, "inf", (0, 5));
        b.add_terrain("hill", (2, 5));
        let world = refreshed(b.build());
        let path = find_move_path(&world, &[unit], HexCoord::new(0, 5), HexCoord::new(4, 5), false);
        // Steps cost 1, then 4 (hill), then 1, 1 along the straight row if
        // taken directly; the farthest node within 2 movement must lie at
        // cumulative cost <= 2.
        let node = path.get_last_node(2).unwrap();
        assert!(path.cost_to(node).unwrap() <= 2);
        assert!(path.get_last_node(0).is_none());
    }

    #[test]
    fn unreachable_target_returns_best_effort_prefix() {
        let mut b = builder();
        let unit = b.add_unit(0, "inf", (0, 0));
        let enemy = b.add_unit(1, "inf", (3, 3));
        let world = refreshed(b.build());
        let _ = enemy;
        // Enemy-held sites are impassable; the enemy site itself cannot be
        // entered, so the search fails but walks adjacent.
        let path = find_move_path(&world, &[unit], HexCoord::new(0, 0), HexCoord::new(3, 3), false);
        assert!(!path.found);
        let last = *path.nodes.last().unwrap();
        assert!(last.distance(HexCoord::new(3, 3)) <= 1);
    }

    #[test]
    fn move_targets_are_the_reachable_frontier() {
        let mut b = builder();
        let unit = b.add_unit(0, "inf", (5, 5));
        let world = refreshed(b.build());
        let targets = find_move_targets(&world, &[unit]);
        assert_eq!(targets.len(), 6);
        let mut sorted = targets.clone();
        sorted.sort();
        assert_eq!(targets, sorted);
    }

    #[test]
    fn attack_targets_respect_range() {
        let mut b = builder();
        let unit = b.add_unit(0, "inf", (5, 5));
        b.add_unit(1, "inf", (6, 5));
        b.add_unit(1, "inf", (9, 5));
        let world = refreshed(b.build());
        let targets = find_attack_targets(&world, &[unit]);
        assert_eq!(targets, vec![HexCoord::new(6, 5)]);
    }

    #[test]
    fn line_mode_is_blocked_by_blockers() {
        let mut b = builder();
        let arty = b.add_unit(0, "arty", (2, 5));
        b.add_unit(1, "inf", (5, 5));
        b.add_terrain("wall", (4, 5));
        let world = refreshed(b.build());
        assert!(!can_attack_target(
            &world,
            arty,
            HexCoord::new(2, 5),
            HexCoord::new(5, 5)
        ));
        // Adjacent attacks ignore blockers.
        assert!(can_attack_target(
            &world,
            arty,
            HexCoord::new(4, 5),
            HexCoord::new(5, 5)
        ));
    }

    #[test]
    fn place_targets_list_owned_sites_per_class() {
        let mut b = builder();
        b.set_buildable(0, &["inf"]);
        b.set_build_points(0, 50);
        b.set_site_owner((2, 2), 0);
        b.set_site_owner((3, 2), 0);
        let world = b.build();
        let faction = world.factions[0].id;
        let targets = find_all_place_targets(&world, faction, EntityCategory::Unit);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets["inf"].len(), 2);
    }
}
