//! The Seeker decision policy.
//!
//! A greedy per-unit search: every active unit looks for an attack target
//! and a movement duty (free capture, resupply, garrison), the two are
//! reconciled, and the unit acts. Full passes over the unit list repeat at
//! the same odds threshold as long as commands come out of them; a pass
//! that found targets but issued nothing relaxes the odds by one, and a
//! pass without any target ends the turn. Odds run from 4 down to 0, so
//! the loop terminates: commands strictly consume unit budgets and idle
//! passes strictly consume odds.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use hexfield_core::{EntityId, Executor, FactionId, HexCoord, Path, WorldState, path};

use crate::algorithm::DecisionAlgorithm;
use crate::context::AlgorithmContext;
use crate::error::AlgorithmError;
use crate::faction_state::FactionStateStore;
use crate::options::AlgorithmOptions;
use crate::targets::{
    AttackChoice, CombatComparison, MoveChoice, attempt_group_attack, build_by_value,
    build_random, place_by_threat, place_random, select_attack_target,
    select_attack_target_in_range, select_combat_comparison, select_move_target,
};

/// Opening odds threshold; relaxed one step per target-free pass.
const ODDS_START: i32 = 4;
/// Supply priorities at or above this are acted on during the unit cycle.
const SUPPLY_URGENT_PRIORITY: i32 = 60;
/// Faction state older than this many turns is discarded.
const STATE_MAX_AGE: i32 = 1;

/// Per-faction memory the Seeker keeps between turns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SeekerFactionState {
    /// Sites engaged last turn; preferred when targets tie this turn.
    pub preferred_targets: BTreeSet<HexCoord>,
}

/// The shipped greedy decision algorithm.
#[derive(Default)]
pub struct Seeker {
    states: FactionStateStore<SeekerFactionState>,
}

impl Seeker {
    pub const ID: &'static str = "seeker";

    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the per-faction store, mainly for tests and session
    /// persistence.
    pub fn states(&mut self) -> &mut FactionStateStore<SeekerFactionState> {
        &mut self.states
    }
}

impl DecisionAlgorithm for Seeker {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn find_best_commands(
        &mut self,
        world: &mut WorldState,
        options: &AlgorithmOptions,
        ctx: &AlgorithmContext,
    ) -> Result<(), AlgorithmError> {
        let faction = world.active_faction_id();
        let preferred = {
            let slot = self.states.state_for(world, faction, STATE_MAX_AGE);
            std::mem::take(&mut slot.state.preferred_targets)
        };
        let comparison = select_combat_comparison(world);

        let run = TurnRun::new(&mut *world, options, ctx, faction, comparison, preferred);
        let engaged = run.run()?;

        let slot = self.states.state_for(world, faction, STATE_MAX_AGE);
        slot.state.preferred_targets = engaged;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MoveKind {
    FreeCapture,
    Resupply,
    Garrison,
}

enum UnitOutcome {
    /// At least one command was executed for the unit.
    Commanded,
    /// A target existed but no command came out (odds too strict).
    TargetOnly,
    /// Nothing to do; the unit joins the waiting set.
    NoTarget,
}

enum UnitAction {
    AttackNow(HexCoord),
    Advance(Path),
    Hold,
}

/// One invocation's working state; dropped when the turn is decided.
struct TurnRun<'a> {
    world: &'a mut WorldState,
    options: &'a AlgorithmOptions,
    ctx: &'a AlgorithmContext,
    faction: FactionId,
    comparison: CombatComparison,
    attack_targets: Vec<HexCoord>,
    capture_targets: BTreeSet<HexCoord>,
    free_capture_targets: BTreeSet<HexCoord>,
    garrison_targets: BTreeSet<HexCoord>,
    active_units: Vec<EntityId>,
    waiting_units: BTreeSet<EntityId>,
    engaged_targets: BTreeSet<HexCoord>,
    preferred: BTreeSet<HexCoord>,
}

impl<'a> TurnRun<'a> {
    fn new(
        world: &'a mut WorldState,
        options: &'a AlgorithmOptions,
        ctx: &'a AlgorithmContext,
        faction: FactionId,
        comparison: CombatComparison,
        preferred: BTreeSet<HexCoord>,
    ) -> Self {
        let mut run = Self {
            world,
            options,
            ctx,
            faction,
            comparison,
            attack_targets: Vec::new(),
            capture_targets: BTreeSet::new(),
            free_capture_targets: BTreeSet::new(),
            garrison_targets: BTreeSet::new(),
            active_units: Vec::new(),
            waiting_units: BTreeSet::new(),
            engaged_targets: BTreeSet::new(),
            preferred,
        };
        run.classify_sites();
        run.collect_active_units();
        run
    }

    fn classify_sites(&mut self) {
        for site in self.world.grid.iter() {
            let coord = site.coord;
            if site.has_alien_units(self.world, self.faction) {
                self.attack_targets.push(coord);
                if site.can_capture && site.owner != Some(self.faction) {
                    self.capture_targets.insert(coord);
                }
            } else if site.can_capture {
                if site.owner == Some(self.faction) {
                    self.garrison_targets.insert(coord);
                } else {
                    self.free_capture_targets.insert(coord);
                }
            }
        }
    }

    fn collect_active_units(&mut self) {
        let placed = self
            .world
            .faction(self.faction)
            .map(|f| f.placed_units(self.world))
            .unwrap_or_default();
        self.active_units = placed
            .into_iter()
            .filter(|id| self.world.entity(*id).is_some_and(|e| e.is_active()))
            .collect();
    }

    fn run(mut self) -> Result<BTreeSet<HexCoord>, AlgorithmError> {
        debug!(
            target: "ai::seeker",
            faction = self.faction.0,
            units = self.active_units.len(),
            attack_targets = self.attack_targets.len(),
            "seeker turn start",
        );

        let mut odds = ODDS_START;
        'relaxing: while odds >= 0 {
            self.ctx
                .report(Some(&format!("seeking targets at odds {odds}")));
            loop {
                self.ctx.checkpoint()?;
                let (issued, found) = self.cycle(odds)?;
                if issued {
                    self.waiting_units.clear();
                    continue;
                }
                if !found {
                    break 'relaxing;
                }
                break;
            }
            odds -= 1;
        }

        if self.options.use_random_build {
            build_random(self.world, self.ctx)?;
        } else {
            build_by_value(self.world, self.ctx)?;
        }
        if self.options.use_random_place {
            place_random(self.world, self.ctx)?;
        } else {
            place_by_threat(self.world, self.ctx)?;
        }

        Ok(self.engaged_targets)
    }

    /// One pass over the active units.
    ///
    /// Returns whether any command was issued and whether any unit saw a
    /// target. A unit that goes inactive is dropped and the pass restarts.
    fn cycle(&mut self, odds: i32) -> Result<(bool, bool), AlgorithmError> {
        let mut issued = false;
        let mut found = false;
        let mut index = 0;
        while index < self.active_units.len() {
            let unit = self.active_units[index];
            if self.waiting_units.contains(&unit) {
                index += 1;
                continue;
            }
            match self.act_unit(unit, odds)? {
                UnitOutcome::Commanded => {
                    issued = true;
                    found = true;
                }
                UnitOutcome::TargetOnly => {
                    found = true;
                }
                UnitOutcome::NoTarget => {
                    self.waiting_units.insert(unit);
                }
            }
            let inactive = self
                .world
                .entity(unit)
                .is_none_or(|e| !e.is_active());
            if inactive {
                self.active_units.retain(|u| *u != unit);
                break;
            }
            index += 1;
        }
        Ok((issued, found))
    }

    /// Decides and executes for one unit, following up while the unit can
    /// still act (attack after closing in, keep walking after a capture).
    fn act_unit(&mut self, unit: EntityId, odds: i32) -> Result<UnitOutcome, AlgorithmError> {
        let mut acted = false;
        let mut saw_target = false;
        loop {
            let Some(entity) = self.world.entity(unit) else {
                break;
            };
            if !entity.is_active() {
                break;
            }
            let Some(site) = entity.site else {
                break;
            };

            let attack = self.pick_attack_target(unit, odds);
            if let Some(choice) = &attack {
                saw_target = true;
                self.engaged_targets.insert(choice.target);
                self.preferred.insert(choice.target);
            }
            let movement = self.pick_move_target(unit, odds, attack.as_ref());
            if movement.is_some() {
                saw_target = true;
            }

            match self.reconcile(unit, site, attack, movement) {
                UnitAction::AttackNow(target) => {
                    trace!(target: "ai::seeker", unit = unit.0, site = %target, "attacking");
                    self.world.move_entity_to_top(unit);
                    let ok = attempt_group_attack(
                        self.world,
                        unit,
                        target,
                        odds,
                        &mut self.active_units,
                        self.ctx,
                    )?;
                    if ok {
                        acted = true;
                        self.after_attack(target);
                    }
                    break;
                }
                UnitAction::Advance(path) => {
                    let budget = self
                        .world
                        .entity(unit)
                        .map(|e| e.movement_left)
                        .unwrap_or(0);
                    let Some(node) = path.get_last_node(budget) else {
                        break;
                    };
                    if node == site {
                        break;
                    }
                    self.ctx.checkpoint()?;
                    trace!(target: "ai::seeker", unit = unit.0, to = %node, "advancing");
                    if !Executor::new(self.world).execute_move(&[unit], node)? {
                        break;
                    }
                    acted = true;
                    self.after_move(node);
                    continue;
                }
                UnitAction::Hold => break,
            }
        }

        Ok(if acted {
            UnitOutcome::Commanded
        } else if saw_target {
            UnitOutcome::TargetOnly
        } else {
            UnitOutcome::NoTarget
        })
    }

    fn pick_attack_target(&self, unit: EntityId, odds: i32) -> Option<AttackChoice> {
        let entity = self.world.entity(unit)?;
        if !entity.is_combat() {
            return None;
        }
        let mut choice = if entity.can_move() {
            let choice = select_attack_target(
                self.world,
                self.options,
                unit,
                &self.attack_targets,
                Some(&self.preferred),
                self.comparison,
            );
            // A move-only unit may end up "in range" geometrically without
            // being able to strike; that target is useless.
            match choice {
                Some(c) if c.path_cost == 0 && !entity.can_attack() => None,
                other => other,
            }
        } else if entity.can_attack() {
            select_attack_target_in_range(
                self.world,
                self.options,
                &[unit],
                &self.attack_targets,
                self.comparison,
            )
            .map(|target| AttackChoice {
                target,
                path_cost: 0,
                category: crate::targets::RangeCategory::Short,
                approach: None,
            })
        } else {
            None
        };

        // Suicide guard: an immobile unit at rock-bottom odds does not
        // throw itself at a purely passive defense; its turn will come.
        if odds == 0 && !entity.can_move() {
            if let Some(c) = &choice {
                if self.defenders_all_passive(c.target) {
                    choice = None;
                }
            }
        }
        choice
    }

    fn defenders_all_passive(&self, target: HexCoord) -> bool {
        let Some(site) = self.world.site(target) else {
            return false;
        };
        let defenders: Vec<_> = site
            .units(self.world)
            .into_iter()
            .filter(|u| u.owner != Some(self.faction))
            .collect();
        !defenders.is_empty() && defenders.iter().all(|u| u.can_defend_only())
    }

    fn pick_move_target(
        &self,
        unit: EntityId,
        odds: i32,
        attack: Option<&AttackChoice>,
    ) -> Option<(MoveChoice, MoveKind)> {
        let entity = self.world.entity(unit)?;
        if !entity.can_move() {
            return None;
        }
        // Already in range at decent odds: stay put and fight.
        if attack.is_some_and(|c| c.path_cost == 0) && odds > 1 {
            return None;
        }

        let mut result: Option<(MoveChoice, MoveKind)> = None;
        if entity.can_capture() {
            let candidates: Vec<HexCoord> =
                self.free_capture_targets.iter().copied().collect();
            if let Some(choice) =
                select_move_target(self.world, self.options, &[unit], &candidates, None)
            {
                result = Some((choice, MoveKind::FreeCapture));
            }
        }

        // Urgent resupply overrides other duties, with two exceptions: a
        // capture already one step away wins, and suicide odds never mix
        // with a supply run.
        if odds > 0 {
            let urgent = entity
                .get_required_supplies()
                .into_iter()
                .find(|r| r.priority >= SUPPLY_URGENT_PRIORITY);
            if let Some(requirement) = urgent {
                let capture_one_step = result.as_ref().is_some_and(|(choice, kind)| {
                    *kind == MoveKind::FreeCapture && choice.path.nodes.len() == 2
                });
                if !capture_one_step {
                    let supply_sites = self
                        .world
                        .faction(self.faction)
                        .map(|f| f.get_supply_targets(self.world))
                        .unwrap_or_default();
                    if let Some(choice) = select_move_target(
                        self.world,
                        self.options,
                        &[unit],
                        &supply_sites,
                        Some(requirement.index),
                    ) {
                        result = Some((choice, MoveKind::Resupply));
                    }
                }
            }
        }

        if result.is_none() {
            let site = entity.site;
            let candidates: Vec<HexCoord> = self
                .garrison_targets
                .iter()
                .copied()
                .filter(|c| Some(*c) != site)
                .collect();
            if let Some(choice) =
                select_move_target(self.world, self.options, &[unit], &candidates, None)
            {
                result = Some((choice, MoveKind::Garrison));
            }
        }
        result
    }

    /// Weighs the attack opportunity against the movement duty.
    fn reconcile(
        &self,
        unit: EntityId,
        site: HexCoord,
        attack: Option<AttackChoice>,
        movement: Option<(MoveChoice, MoveKind)>,
    ) -> UnitAction {
        match (attack, movement) {
            (None, None) => UnitAction::Hold,
            (Some(a), None) => {
                if a.path_cost == 0 {
                    UnitAction::AttackNow(a.target)
                } else {
                    match a.approach {
                        Some(path) => UnitAction::Advance(path),
                        None => UnitAction::Hold,
                    }
                }
            }
            (None, Some((m, _))) => UnitAction::Advance(m.path),
            (Some(a), Some((m, kind))) => {
                if a.path_cost == 0 {
                    return UnitAction::AttackNow(a.target);
                }
                // The attack is one step out: a garrison site reachable this
                // turn that also puts the unit in range serves both duties.
                if a.path_cost == 1 {
                    if let Some(path) = self.garrison_step_into_range(unit, a.target) {
                        return UnitAction::Advance(path);
                    }
                }
                if kind == MoveKind::Garrison && a.path_cost < m.path.cost {
                    // The attack is reachable at better range than the
                    // garrison; garrison duty can wait.
                    return match a.approach {
                        Some(path) => UnitAction::Advance(path),
                        None => UnitAction::Hold,
                    };
                }
                if self.sacrifice_guard(site, &a, &m) {
                    return UnitAction::Hold;
                }
                let move_one_step = m.path.nodes.len() == 2;
                if a.path_cost < m.path.cost && !move_one_step {
                    match a.approach {
                        Some(path) => UnitAction::Advance(path),
                        None => UnitAction::Advance(m.path),
                    }
                } else {
                    UnitAction::Advance(m.path)
                }
            }
        }
    }

    /// A garrison target the unit can reach this turn that has the attack
    /// target in range.
    fn garrison_step_into_range(&self, unit: EntityId, target: HexCoord) -> Option<Path> {
        let entity = self.world.entity(unit)?;
        let site = entity.site?;
        let budget = entity.movement_left;
        for garrison in &self.garrison_targets {
            if *garrison == site {
                continue;
            }
            let path = path::find_move_path(self.world, &[unit], site, *garrison, false);
            if !path.found || path.cost > budget {
                continue;
            }
            if path::in_attack_range(self.world, unit, *garrison, target) {
                return Some(path);
            }
        }
        None
    }

    /// The last combat unit on a capturable site does not walk away to a
    /// lesser site while a capture-capable enemy stands next door; it holds
    /// the ground and fights.
    ///
    /// The two sites are compared by context-free valuation.
    fn sacrifice_guard(&self, site: HexCoord, attack: &AttackChoice, movement: &MoveChoice) -> bool {
        let Some(current) = self.world.site(site) else {
            return false;
        };
        if !current.can_capture || current.count_combat_units(self.world) != 1 {
            return false;
        }
        let enemy_captures = self.world.site(attack.target).is_some_and(|s| {
            s.units(self.world)
                .iter()
                .any(|u| u.owner != Some(self.faction) && u.can_capture())
        });
        if !enemy_captures {
            return false;
        }
        let Some(move_site) = self.world.site(movement.target) else {
            return false;
        };
        move_site.valuation() < current.valuation()
    }

    /// Target-list bookkeeping after a successful attack.
    fn after_attack(&mut self, target: HexCoord) {
        let cleared = self
            .world
            .site(target)
            .is_none_or(|s| !s.has_alien_units(self.world, self.faction));
        if cleared {
            self.attack_targets.retain(|c| *c != target);
            self.engaged_targets.remove(&target);
            if self.capture_targets.remove(&target) {
                self.free_capture_targets.insert(target);
            }
        }
    }

    /// Target-list bookkeeping after a move.
    fn after_move(&mut self, destination: HexCoord) {
        let owned = self
            .world
            .site(destination)
            .is_some_and(|s| s.owner == Some(self.faction));
        if owned
            && (self.capture_targets.contains(&destination)
                || self.free_capture_targets.contains(&destination))
        {
            self.capture_targets.remove(&destination);
            self.free_capture_targets.remove(&destination);
            self.garrison_targets.insert(destination);
        }
    }
}
