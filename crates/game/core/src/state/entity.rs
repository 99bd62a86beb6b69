//! Entities: the mutable occupants of the world arena.

use serde::{Deserialize, Serialize};

use crate::grid::HexCoord;
use crate::state::class::{
    ClassFlags, ClassId, EntityCategory, EntityClass, RangedAttackMode, SupplyRequirement,
};
use crate::state::faction::FactionId;

/// Stable arena id, never reused within one world lineage.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityId(pub u32);

/// A single entity instance.
///
/// The static class attributes (flags, combat values, movement allowance)
/// are copied in at creation so predicates never need a registry lookup;
/// `class` keeps the identity for build accounting and serialization.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub class: ClassId,
    pub name: String,
    pub category: EntityCategory,
    pub flags: ClassFlags,
    pub attack: i32,
    pub defense: i32,
    pub movement: i32,
    pub attack_range: i32,
    pub ranged_mode: RangedAttackMode,
    pub required_supplies: Vec<SupplyRequirement>,
    pub difficulty: i32,
    pub owner: Option<FactionId>,
    /// Present iff the entity is placed; the site's stack holds the id back.
    pub site: Option<HexCoord>,
    pub strength: i32,
    pub max_strength: i32,
    /// Movement budget left this turn.
    pub movement_left: i32,
    /// Set once the entity has attacked this turn.
    pub attack_done: bool,
}

impl Entity {
    /// Instantiates an entity of `class`, owned but not yet placed.
    pub fn from_class(id: EntityId, class: &EntityClass, owner: Option<FactionId>) -> Self {
        Self {
            id,
            class: class.id.clone(),
            name: format!("{} #{}", class.name, id.0),
            category: class.category,
            flags: class.flags,
            attack: class.attack,
            defense: class.defense,
            movement: class.movement,
            attack_range: class.attack_range,
            ranged_mode: class.ranged_mode,
            required_supplies: class.required_supplies.clone(),
            difficulty: class.difficulty,
            owner,
            site: None,
            strength: class.strength,
            max_strength: class.strength,
            movement_left: 0,
            attack_done: true,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.strength > 0
    }

    pub fn is_placed(&self) -> bool {
        self.site.is_some()
    }

    pub fn is_unit(&self) -> bool {
        self.category == EntityCategory::Unit
    }

    pub fn is_combat(&self) -> bool {
        self.flags.contains(ClassFlags::COMBAT)
    }

    pub fn is_mobile(&self) -> bool {
        self.movement > 0
    }

    /// Alive, placed, and still able to spend movement or an attack.
    pub fn is_active(&self) -> bool {
        self.is_alive() && self.is_placed() && (self.can_move() || self.can_attack())
    }

    pub fn can_move(&self) -> bool {
        self.is_alive()
            && self.is_placed()
            && self.flags.contains(ClassFlags::CAN_MOVE)
            && self.movement_left > 0
    }

    pub fn can_attack(&self) -> bool {
        self.is_alive()
            && self.is_placed()
            && self.flags.contains(ClassFlags::CAN_ATTACK)
            && !self.attack_done
    }

    pub fn can_capture(&self) -> bool {
        self.flags.contains(ClassFlags::CAN_CAPTURE)
    }

    pub fn can_defend_only(&self) -> bool {
        self.flags.contains(ClassFlags::DEFEND_ONLY)
    }

    pub fn can_heal(&self) -> bool {
        self.flags.contains(ClassFlags::CAN_HEAL)
    }

    /// The supply indices this entity wants replenished, most urgent first.
    pub fn get_required_supplies(&self) -> Vec<SupplyRequirement> {
        let mut supplies = self.required_supplies.clone();
        supplies.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.index.cmp(&b.index)));
        supplies
    }

    /// Context-free worth in `[0, 1]`: class stats scaled by remaining strength.
    pub fn valuation(&self) -> f64 {
        if self.max_strength <= 0 {
            return 0.0;
        }
        let base = ((self.attack + self.defense) as f64 / 200.0).clamp(0.0, 1.0);
        base * self.strength as f64 / self.max_strength as f64
    }

    /// Resets the per-turn action budget at the start of the owner's turn.
    pub(crate) fn refresh_for_turn(&mut self) {
        self.movement_left = self.movement;
        self.attack_done = !self.flags.contains(ClassFlags::CAN_ATTACK);
    }
}
