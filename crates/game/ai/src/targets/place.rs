//! Placement policies for freshly built entities.

use std::collections::BTreeMap;

use tracing::debug;

use hexfield_core::{
    ClassId, EntityCategory, EntityId, Executor, FactionId, HexCoord, Valuable, WorldState, path,
    rng,
};

use crate::context::AlgorithmContext;
use crate::error::AlgorithmError;

/// Threat picture for a set of candidate sites.
///
/// Every site holding at least one enemy unit contributes, to each target,
/// the sum of `evaluate(unit) / (1 + distance)` over those units.
pub fn evaluate_threats(world: &WorldState, faction: FactionId, targets: &[HexCoord]) -> Vec<f64> {
    let mut threats = vec![0.0; targets.len()];
    let Some(faction_data) = world.faction(faction) else {
        return threats;
    };
    for site in world.grid.iter() {
        let value: f64 = site
            .units(world)
            .into_iter()
            .filter(|u| u.owner != Some(faction))
            .map(|u| faction_data.evaluate(world, Valuable::Unit(u)))
            .sum();
        if value == 0.0 {
            continue;
        }
        for (threat, target) in threats.iter_mut().zip(targets) {
            let distance = target.distance(site.coord) as f64;
            *threat += value / (1.0 + distance);
        }
    }
    threats
}

fn normalized(mut values: Vec<f64>) -> Vec<f64> {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        for v in &mut values {
            *v /= sum;
        }
    }
    values
}

/// Unplaced live units of the active faction, grouped by class.
fn unplaced_by_class(world: &WorldState) -> BTreeMap<ClassId, Vec<EntityId>> {
    let faction = world.active_faction();
    let mut by_class: BTreeMap<ClassId, Vec<EntityId>> = BTreeMap::new();
    for id in &faction.entities {
        if let Some(entity) = world.entity(*id) {
            if entity.is_unit() && entity.is_alive() && !entity.is_placed() {
                by_class.entry(entity.class.clone()).or_default().push(*id);
            }
        }
    }
    by_class
}

/// Distributes unplaced units across placement targets by threat.
///
/// A single valid target takes everything. Otherwise raw threats are
/// normalized, scaled by the faction's valuation of each site, normalized
/// again, and the targets are served in descending weight with
/// `ceil(remaining * weight)` units each until the pool runs dry. Equal
/// weights fall back to site-coordinate order, so the distribution never
/// depends on evaluation order.
pub fn place_by_threat(world: &mut WorldState, ctx: &AlgorithmContext) -> Result<(), AlgorithmError> {
    let faction_id = world.active_faction_id();
    let place_targets = path::find_all_place_targets(world, faction_id, EntityCategory::Unit);

    for (class, mut units) in unplaced_by_class(world) {
        let Some(targets) = place_targets.get(&class) else {
            continue;
        };
        if targets.is_empty() || units.is_empty() {
            continue;
        }
        if targets.len() == 1 {
            ctx.checkpoint()?;
            Executor::new(world).execute_place(&units, targets[0])?;
            continue;
        }

        let threats = normalized(evaluate_threats(world, faction_id, targets));
        let faction = world.active_faction();
        let weighted: Vec<f64> = threats
            .iter()
            .zip(targets)
            .map(|(threat, target)| {
                let site_value = world
                    .site(*target)
                    .map(|s| faction.evaluate(world, Valuable::Site(s)))
                    .unwrap_or(0.0);
                threat * site_value
            })
            .collect();
        let weights = normalized(weighted);

        let mut order: Vec<usize> = (0..targets.len()).collect();
        order.sort_by(|a, b| {
            weights[*b]
                .partial_cmp(&weights[*a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| targets[*a].cmp(&targets[*b]))
        });
        let first_choice = targets[order[0]];

        for index in order {
            if units.is_empty() {
                break;
            }
            let share = (units.len() as f64 * weights[index]).ceil() as usize;
            let share = share.min(units.len());
            if share == 0 {
                continue;
            }
            let batch: Vec<EntityId> = units.drain(..share).collect();
            ctx.checkpoint()?;
            debug!(
                target: "ai::targets",
                class = %class, site = %targets[index], count = batch.len(),
                "placing by threat",
            );
            Executor::new(world).execute_place(&batch, targets[index])?;
        }
        if !units.is_empty() {
            // Weights summed below one from rounding; the best site absorbs
            // the remainder.
            ctx.checkpoint()?;
            Executor::new(world).execute_place(&units, first_choice)?;
        }
    }
    Ok(())
}

/// Scatters unplaced units uniformly at random.
///
/// Classes with a single valid target place everything there; with several,
/// random targets receive random counts until the class pool is exhausted
/// or a placement is refused.
pub fn place_random(world: &mut WorldState, ctx: &AlgorithmContext) -> Result<(), AlgorithmError> {
    let faction_id = world.active_faction_id();
    let place_targets = path::find_all_place_targets(world, faction_id, EntityCategory::Unit);

    for (class, mut units) in unplaced_by_class(world) {
        let Some(targets) = place_targets.get(&class) else {
            continue;
        };
        if targets.is_empty() {
            continue;
        }
        if targets.len() == 1 {
            ctx.checkpoint()?;
            Executor::new(world).execute_place(&units, targets[0])?;
            continue;
        }
        while !units.is_empty() {
            let target = targets[rng::index(targets.len())];
            let count = rng::range_inclusive(1, units.len() as i32) as usize;
            let batch: Vec<EntityId> = units.drain(..count).collect();
            ctx.checkpoint()?;
            if !Executor::new(world).execute_place(&batch, target)? {
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexfield_core::{Command, EntityClass, WorldBuilder};

    fn placement_world() -> WorldState {
        let mut b = WorldBuilder::new(10, 10);
        b.add_class(EntityClass::unit("inf", "Infantry", 60, 50, 4));
        b.add_faction("Red");
        b.add_faction("Blue");
        b.set_buildable(0, &["inf"]);
        b.set_build_points(0, 30);
        b.set_site_owner((1, 1), 0);
        b.set_site_owner((4, 1), 0);
        b.set_site_owner((7, 1), 0);
        // The enemy sits nearest to the middle target.
        b.add_unit(1, "inf", (4, 4));
        b.build()
    }

    #[test]
    fn threats_decay_with_distance() {
        let world = placement_world();
        let targets = [HexCoord::new(1, 1), HexCoord::new(4, 1), HexCoord::new(7, 1)];
        let threats = evaluate_threats(&world, world.factions[0].id, &targets);
        assert!(threats[1] > threats[0]);
        assert!(threats[1] > threats[2]);
        assert!(threats.iter().all(|t| *t > 0.0));
    }

    #[test]
    fn single_target_takes_all_units() {
        let mut b = WorldBuilder::new(6, 6);
        b.add_class(EntityClass::unit("inf", "Infantry", 60, 50, 4));
        b.add_faction("Red");
        b.set_buildable(0, &["inf"]);
        b.set_build_points(0, 30);
        b.set_site_owner((2, 2), 0);
        let mut world = b.build();
        let ctx = AlgorithmContext::detached();
        Executor::new(&mut world).execute_build("inf", 3).unwrap();
        place_by_threat(&mut world, &ctx).unwrap();
        let site = world.site(HexCoord::new(2, 2)).unwrap();
        assert_eq!(site.entities.len(), 3);
    }

    #[test]
    fn threat_placement_serves_hottest_site_first() {
        let mut world = placement_world();
        let ctx = AlgorithmContext::detached();
        Executor::new(&mut world).execute_build("inf", 3).unwrap();
        place_by_threat(&mut world, &ctx).unwrap();

        let placements: Vec<(usize, HexCoord)> = world
            .history
            .iter()
            .filter_map(|c| match c {
                Command::Place { entities, site } => Some((entities.len(), *site)),
                _ => None,
            })
            .collect();
        assert!(!placements.is_empty());
        // The middle site carries the highest threat and is served first.
        assert_eq!(placements[0].1, HexCoord::new(4, 1));
        let total: usize = placements.iter().map(|(n, _)| n).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn random_placement_exhausts_the_pool() {
        let mut world = placement_world();
        let ctx = AlgorithmContext::detached();
        Executor::new(&mut world).execute_build("inf", 2).unwrap();
        rng::reseed(0);
        place_random(&mut world, &ctx).unwrap();
        let placed = world.active_faction().placed_units(&world).len();
        assert_eq!(placed, 2);
    }
}
