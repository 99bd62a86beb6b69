//! Attack attempts under odds thresholds.

use tracing::debug;

use hexfield_core::{EntityId, Executor, HexCoord, WorldState, combat, path};

use crate::context::AlgorithmContext;
use crate::error::AlgorithmError;

/// Attacks `target` with `attackers` if the estimated outcome satisfies
/// `odds`.
///
/// With `odds > 0` the attack is rejected when the estimated attacker
/// percentage loss exceeds the defender's divided by `odds`, or when the
/// attacker would lose more than 10% against a defender losing less than
/// `10 * odds` percent. At `odds == 0` anything goes. Executed attacks
/// prune attackers that end up inactive from `active_units`.
pub fn attempt_attack(
    world: &mut WorldState,
    attackers: &[EntityId],
    target: HexCoord,
    odds: i32,
    active_units: &mut Vec<EntityId>,
    ctx: &AlgorithmContext,
) -> Result<bool, AlgorithmError> {
    if odds > 0 {
        let adjacent = combat::adjacent_attack(world, attackers, target);
        let estimate = combat::estimate_losses(world, attackers, target, adjacent);
        let too_costly = estimate.attacker_percent > estimate.defender_percent / odds;
        let too_bloody = estimate.attacker_percent > 10 && estimate.defender_percent < 10 * odds;
        if too_costly || too_bloody {
            debug!(
                target: "ai::targets",
                site = %target, odds,
                attacker_percent = estimate.attacker_percent,
                defender_percent = estimate.defender_percent,
                "attack rejected by odds",
            );
            return Ok(false);
        }
    }

    ctx.checkpoint()?;
    let executed = Executor::new(world).execute_attack(attackers, target)?;
    if executed {
        active_units.retain(|id| {
            !attackers.contains(id) || world.entity(*id).is_some_and(|e| e.is_active())
        });
    }
    Ok(executed)
}

/// Group attack led by `lead_unit`.
///
/// Tries the leader alone first; each rejection pulls in one more active
/// unit that has `target` in its own attack-target list and retries.
/// Members that lose the ability to participate drop out of the attempt
/// but stay in `active_units`.
pub fn attempt_group_attack(
    world: &mut WorldState,
    lead_unit: EntityId,
    target: HexCoord,
    odds: i32,
    active_units: &mut Vec<EntityId>,
    ctx: &AlgorithmContext,
) -> Result<bool, AlgorithmError> {
    let mut group = vec![lead_unit];
    loop {
        group.retain(|id| can_participate(world, *id, target));
        if !group.is_empty()
            && attempt_attack(world, &group, target, odds, active_units, ctx)?
        {
            return Ok(true);
        }

        let support = active_units
            .iter()
            .copied()
            .find(|id| !group.contains(id) && can_participate(world, *id, target));
        match support {
            Some(unit) => group.push(unit),
            None => return Ok(false),
        }
    }
}

fn can_participate(world: &WorldState, unit: EntityId, target: HexCoord) -> bool {
    world
        .entity(unit)
        .and_then(|e| e.site)
        .is_some_and(|from| path::can_attack_target(world, unit, from, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexfield_core::{EntityClass, Executor, WorldBuilder};

    fn armies(defense: i32) -> (WorldState, EntityId, EntityId) {
        let mut b = WorldBuilder::new(8, 8);
        b.add_class(EntityClass::unit("inf", "Infantry", 60, 50, 4));
        b.add_class(EntityClass::unit("target", "Target", 10, defense, 2));
        b.add_faction("Red");
        b.add_faction("Blue");
        let first = b.add_unit(0, "inf", (2, 2));
        let second = b.add_unit(0, "inf", (2, 3));
        b.add_unit(1, "target", (3, 2));
        let mut world = b.build();
        Executor::new(&mut world).execute_begin_turn().unwrap();
        (world, first, second)
    }

    #[test]
    fn weak_target_is_attacked_at_high_odds() {
        let (mut world, first, second) = armies(5);
        let mut active = vec![first, second];
        let ctx = AlgorithmContext::detached();
        let ok =
            attempt_attack(&mut world, &[first], HexCoord::new(3, 2), 4, &mut active, &ctx)
                .unwrap();
        assert!(ok);
        // The attacker spent its turn and left the active list.
        assert_eq!(active, vec![second]);
    }

    #[test]
    fn strong_target_is_rejected_at_high_odds_but_not_at_zero() {
        let (mut world, first, second) = armies(90);
        let mut active = vec![first, second];
        let ctx = AlgorithmContext::detached();
        let rejected =
            attempt_attack(&mut world, &[first], HexCoord::new(3, 2), 4, &mut active, &ctx)
                .unwrap();
        assert!(!rejected);
        assert_eq!(world.history.len(), 1, "rejection must not mutate");

        let ok = attempt_attack(&mut world, &[first], HexCoord::new(3, 2), 0, &mut active, &ctx)
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn group_attack_pulls_in_support() {
        let (mut world, first, second) = armies(90);
        let mut active = vec![first, second];
        let ctx = AlgorithmContext::detached();
        // Alone the leader is rejected at odds 2; with support the estimate
        // improves enough to go through.
        let ok = attempt_group_attack(
            &mut world,
            first,
            HexCoord::new(3, 2),
            2,
            &mut active,
            &ctx,
        )
        .unwrap();
        assert!(ok);
        let attack = world.history.iter().last().unwrap();
        match attack {
            hexfield_core::Command::Attack { units, .. } => assert_eq!(units.len(), 2),
            other => panic!("expected attack, got {other:?}"),
        }
    }
}
