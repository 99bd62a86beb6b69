//! Immutable entity-class data shared by every entity of a class.
//!
//! Classes are scenario data: they never change after loading and are kept
//! in a [`ClassRegistry`] shared by reference across world clones.

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Stable class identifier string, as it appears in scenario data.
pub type ClassId = String;

bitflags! {
    /// Static capability flags of an entity class.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ClassFlags: u16 {
        /// Can initiate attacks.
        const CAN_ATTACK = 1 << 0;
        /// Has a movement allowance.
        const CAN_MOVE = 1 << 1;
        /// Can take ownership of capturable sites.
        const CAN_CAPTURE = 1 << 2;
        /// Fights back but never initiates combat.
        const DEFEND_ONLY = 1 << 3;
        /// Regenerates strength at the start of its faction's turn.
        const CAN_HEAL = 1 << 4;
        /// Participates in combat at all (attack or defense).
        const COMBAT = 1 << 5;
        /// Blocks line-of-sight ranged attacks passing over its site.
        const BLOCKS_ATTACK = 1 << 6;
    }
}

/// How ranged attacks of a class reach their target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangedAttackMode {
    /// Range is pure distance; nothing in between matters.
    #[default]
    Direct,
    /// The straight hex line to the target must be free of blocking entities.
    Line,
}

/// Entity taxonomy. Units act; terrain shapes movement; upgrades modify.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
pub enum EntityCategory {
    Unit,
    Terrain,
    Upgrade,
}

/// One resource index a unit needs replenished, with scenario-defined urgency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyRequirement {
    /// Index into a site's per-resource supply vector.
    pub index: usize,
    /// Urgency in 0..=100; 60 and above is treated as pressing.
    pub priority: i32,
}

/// Immutable scenario data for one class of entities.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityClass {
    pub id: ClassId,
    pub name: String,
    pub category: EntityCategory,
    pub flags: ClassFlags,
    pub attack: i32,
    pub defense: i32,
    /// Movement allowance granted at the start of each turn.
    pub movement: i32,
    pub attack_range: i32,
    pub ranged_mode: RangedAttackMode,
    /// Base strength new entities start with.
    pub strength: i32,
    pub build_cost: i32,
    /// Terrain difficulty contribution; summed per site and clamped to >= 1.
    pub difficulty: i32,
    /// Frame index into the scenario image catalog.
    pub frame: u32,
    pub required_supplies: Vec<SupplyRequirement>,
}

impl EntityClass {
    /// A combat unit class with the given offensive/defensive values.
    pub fn unit(id: &str, name: &str, attack: i32, defense: i32, movement: i32) -> Self {
        let mut flags = ClassFlags::COMBAT;
        if attack > 0 {
            flags |= ClassFlags::CAN_ATTACK;
        }
        if movement > 0 {
            flags |= ClassFlags::CAN_MOVE;
        }
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            category: EntityCategory::Unit,
            flags,
            attack,
            defense,
            movement,
            attack_range: 1,
            ranged_mode: RangedAttackMode::Direct,
            strength: 100,
            build_cost: 10,
            difficulty: 0,
            frame: 0,
            required_supplies: Vec::new(),
        }
    }

    /// A terrain class contributing `difficulty` to the step cost of its site.
    pub fn terrain(id: &str, name: &str, difficulty: i32) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            category: EntityCategory::Terrain,
            flags: ClassFlags::empty(),
            attack: 0,
            defense: 0,
            movement: 0,
            attack_range: 0,
            ranged_mode: RangedAttackMode::Direct,
            strength: 100,
            build_cost: 0,
            difficulty,
            frame: 0,
            required_supplies: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: ClassFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn without_flags(mut self, flags: ClassFlags) -> Self {
        self.flags -= flags;
        self
    }

    pub fn with_range(mut self, range: i32, mode: RangedAttackMode) -> Self {
        self.attack_range = range;
        self.ranged_mode = mode;
        self
    }

    pub fn with_build_cost(mut self, cost: i32) -> Self {
        self.build_cost = cost;
        self
    }

    pub fn with_supply(mut self, index: usize, priority: i32) -> Self {
        self.required_supplies.push(SupplyRequirement { index, priority });
        self
    }

    /// Context-free worth in `[0, 1]`, derived from combat stats.
    pub fn valuation(&self) -> f64 {
        ((self.attack + self.defense) as f64 / 200.0).clamp(0.0, 1.0)
    }
}

/// All classes of a scenario, keyed by id.
///
/// Shared through `Arc` by every clone of a world state; the registry is
/// immutable once the scenario is built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassRegistry {
    classes: BTreeMap<ClassId, EntityClass>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: EntityClass) {
        self.classes.insert(class.id.clone(), class);
    }

    pub fn get(&self, id: &str) -> Option<&EntityClass> {
        self.classes.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ClassId> {
        self.classes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityClass> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_constructor_derives_flags() {
        let c = EntityClass::unit("inf", "Infantry", 60, 50, 4);
        assert!(c.flags.contains(ClassFlags::CAN_ATTACK | ClassFlags::CAN_MOVE));
        assert!(c.flags.contains(ClassFlags::COMBAT));
        let passive = EntityClass::unit("fort", "Fort", 0, 80, 0);
        assert!(!passive.flags.contains(ClassFlags::CAN_ATTACK));
        assert!(!passive.flags.contains(ClassFlags::CAN_MOVE));
    }

    #[test]
    fn valuation_is_clamped() {
        let c = EntityClass::unit("max", "Max", 200, 200, 1);
        assert_eq!(c.valuation(), 1.0);
        let z = EntityClass::terrain("road", "Road", 1);
        assert_eq!(z.valuation(), 0.0);
    }
}
