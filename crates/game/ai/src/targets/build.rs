//! Build policies for the active faction.

use std::cmp::Ordering;

use tracing::debug;

use hexfield_core::{ClassId, EntityCategory, Executor, Valuable, WorldState, path, rng};

use crate::context::AlgorithmContext;
use crate::error::AlgorithmError;

/// Builds classes in order of contextual value.
///
/// For every buildable class with at least one valid placement target the
/// desired count is `ceil(max_buildable * evaluate(class))`; classes the
/// faction values at exactly zero are skipped. Commands are emitted in
/// descending evaluation order, re-querying the remaining build limit after
/// the first command so resource consumption is absorbed. The evaluations
/// are deliberately not normalized: a uniformly low evaluation conserves
/// build points for later turns.
pub fn build_by_value(world: &mut WorldState, ctx: &AlgorithmContext) -> Result<(), AlgorithmError> {
    let faction_id = world.active_faction_id();
    let place_targets = path::find_all_place_targets(world, faction_id, EntityCategory::Unit);

    let faction = world.active_faction();
    let mut plans: Vec<(ClassId, i32, f64)> = Vec::new();
    for class in faction.buildable_units(world) {
        if place_targets.get(&class.id).is_none_or(|t| t.is_empty()) {
            continue;
        }
        let evaluation = faction.evaluate(world, Valuable::Class(class));
        if evaluation == 0.0 {
            continue;
        }
        let max_buildable = faction.get_build_count(world, &class.id);
        if max_buildable <= 0 {
            continue;
        }
        let desired = (max_buildable as f64 * evaluation).ceil() as i32;
        plans.push((class.id.clone(), desired, evaluation));
    }
    plans.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    for (class, desired, evaluation) in plans {
        ctx.checkpoint()?;
        let remaining = world.active_faction().get_build_count(world, &class);
        let count = desired.min(remaining);
        if count < 1 {
            continue;
        }
        debug!(target: "ai::targets", class = %class, count, evaluation, "building by value");
        Executor::new(world).execute_build(&class, count)?;
    }
    Ok(())
}

/// Builds uniformly random classes and counts until nothing can be built.
pub fn build_random(world: &mut WorldState, ctx: &AlgorithmContext) -> Result<(), AlgorithmError> {
    loop {
        ctx.checkpoint()?;
        let faction_id = world.active_faction_id();
        let place_targets = path::find_all_place_targets(world, faction_id, EntityCategory::Unit);
        let faction = world.active_faction();
        let choices: Vec<(ClassId, i32)> = faction
            .buildable_units(world)
            .into_iter()
            .filter(|c| place_targets.get(&c.id).is_some_and(|t| !t.is_empty()))
            .filter_map(|c| {
                let max = faction.get_build_count(world, &c.id);
                (max > 0).then(|| (c.id.clone(), max))
            })
            .collect();
        if choices.is_empty() {
            return Ok(());
        }
        let (class, max) = choices[rng::index(choices.len())].clone();
        let count = rng::range_inclusive(1, max);
        if !Executor::new(world).execute_build(&class, count)? {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexfield_core::{Command, EntityClass, WorldBuilder, rng};

    fn build_world() -> WorldState {
        let mut b = WorldBuilder::new(6, 6);
        // evaluate(a) = 160/200 = 0.8, evaluate(b) = 80/200 = 0.4 with no
        // units fielded yet.
        b.add_class(EntityClass::unit("a", "Guard", 80, 80, 3).with_build_cost(20));
        b.add_class(EntityClass::unit("b", "Scout", 40, 40, 6).with_build_cost(12));
        b.add_faction("Red");
        b.set_buildable(0, &["a", "b"]);
        b.set_build_points(0, 60);
        b.set_site_owner((2, 2), 0);
        b.build()
    }

    #[test]
    fn build_by_value_orders_by_evaluation_and_requeries_limits() {
        let mut world = build_world();
        let ctx = AlgorithmContext::detached();
        build_by_value(&mut world, &ctx).unwrap();

        let builds: Vec<(String, i32)> = world
            .history
            .iter()
            .filter_map(|c| match c {
                Command::Build { class, count } => Some((class.clone(), *count)),
                _ => None,
            })
            .collect();
        // Class a: max 60/20 = 3, desired ceil(3 * 0.8) = 3.
        // Class b afterwards: 0 points left, nothing emitted.
        assert_eq!(builds, vec![("a".to_owned(), 3)]);
    }

    #[test]
    fn build_by_value_skips_classes_without_targets() {
        let mut b = WorldBuilder::new(6, 6);
        b.add_class(EntityClass::unit("a", "Guard", 80, 80, 3));
        b.add_faction("Red");
        b.set_buildable(0, &["a"]);
        b.set_build_points(0, 100);
        // No owned site: no placement target, no build.
        let mut world = b.build();
        let ctx = AlgorithmContext::detached();
        build_by_value(&mut world, &ctx).unwrap();
        assert!(world.history.is_empty());
    }

    #[test]
    fn build_random_exhausts_the_buildable_set() {
        rng::reseed(0);
        let mut world = build_world();
        let ctx = AlgorithmContext::detached();
        build_random(&mut world, &ctx).unwrap();
        // Cheapest class costs 12: fewer than 12 points must remain.
        assert!(world.factions[0].build_points < 12);
        assert!(world.history.iter().any(|c| matches!(c, Command::Build { .. })));
    }
}
