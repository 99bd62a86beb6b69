//! Factions and contextual valuation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::grid::HexCoord;
use crate::state::class::{ClassId, EntityCategory, EntityClass};
use crate::state::entity::{Entity, EntityId};
use crate::state::site::Site;
use crate::state::WorldState;

/// Index of a faction in the world's ordered faction list.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FactionId(pub u32);

/// Anything a faction can put a contextual value on.
///
/// `valuation` is the context-free worth; [`Faction::evaluate`] layers the
/// faction's situation on top of it.
#[derive(Clone, Copy, Debug)]
pub enum Valuable<'a> {
    Site(&'a Site),
    Unit(&'a Entity),
    Class(&'a EntityClass),
}

impl Valuable<'_> {
    /// Context-free worth in `[0, 1]`.
    pub fn valuation(&self) -> f64 {
        match self {
            Valuable::Site(s) => s.valuation(),
            Valuable::Unit(u) => u.valuation(),
            Valuable::Class(c) => c.valuation(),
        }
    }
}

/// One player faction: entity and site ownership plus build bookkeeping.
#[derive(Clone, Debug, PartialEq)]
pub struct Faction {
    pub id: FactionId,
    pub name: String,
    pub entities: BTreeSet<EntityId>,
    pub sites: BTreeSet<HexCoord>,
    /// Points available for building new entities this game.
    pub build_points: i32,
    /// Classes this faction may build, in scenario order.
    pub buildable: Vec<ClassId>,
    /// Per-class availability caps; classes without an entry are limited by
    /// build points alone.
    pub unit_pool: BTreeMap<ClassId, i32>,
}

impl Faction {
    pub fn new(id: FactionId, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            entities: BTreeSet::new(),
            sites: BTreeSet::new(),
            build_points: 0,
            buildable: Vec::new(),
            unit_pool: BTreeMap::new(),
        }
    }

    /// Owned entity ids of `category`, in id order.
    pub fn get_entities(
        &self,
        world: &WorldState,
        category: EntityCategory,
        placed_only: bool,
    ) -> Vec<EntityId> {
        self.entities
            .iter()
            .copied()
            .filter(|id| {
                world.entity(*id).is_some_and(|e| {
                    e.category == category && e.is_alive() && (!placed_only || e.is_placed())
                })
            })
            .collect()
    }

    /// All live owned units.
    pub fn units(&self, world: &WorldState) -> Vec<EntityId> {
        self.get_entities(world, EntityCategory::Unit, false)
    }

    /// Live owned units that are placed on the map.
    pub fn placed_units(&self, world: &WorldState) -> Vec<EntityId> {
        self.get_entities(world, EntityCategory::Unit, true)
    }

    /// Buildable unit classes that exist in the registry.
    pub fn buildable_units<'w>(&self, world: &'w WorldState) -> Vec<&'w EntityClass> {
        self.buildable
            .iter()
            .filter_map(|id| world.class(id))
            .filter(|c| c.category == EntityCategory::Unit)
            .collect()
    }

    /// How many entities of `class` the faction can still build: what the
    /// build points afford, capped by the class availability pool.
    pub fn get_build_count(&self, world: &WorldState, class: &str) -> i32 {
        let Some(class_data) = world.class(class) else {
            return 0;
        };
        if class_data.build_cost <= 0 {
            return 0;
        }
        let affordable = self.build_points / class_data.build_cost;
        match self.unit_pool.get(class) {
            Some(cap) => affordable.min(*cap),
            None => affordable,
        }
    }

    /// Whether `entities` may be placed on `site` right now.
    ///
    /// Placement requires an owned site free of alien units, and every
    /// candidate to be an unplaced, live entity of this faction.
    pub fn can_place(&self, world: &WorldState, entities: &[EntityId], site: HexCoord) -> bool {
        if !self.can_place_at(world, site) {
            return false;
        }
        !entities.is_empty()
            && entities.iter().all(|id| {
                world
                    .entity(*id)
                    .is_some_and(|e| e.owner == Some(self.id) && e.is_alive() && !e.is_placed())
            })
    }

    /// Site-only half of the placement rule, shared with target enumeration.
    pub fn can_place_at(&self, world: &WorldState, site: HexCoord) -> bool {
        let Some(site) = world.site(site) else {
            return false;
        };
        site.owner == Some(self.id) && !site.has_alien_units(world, self.id)
    }

    /// Owned sites that still hold any supply.
    pub fn get_supply_targets(&self, world: &WorldState) -> Vec<HexCoord> {
        self.sites
            .iter()
            .copied()
            .filter(|c| world.site(*c).is_some_and(|s| s.total_supply() > 0))
            .collect()
    }

    /// Contextual valuation of `valuable` from this faction's point of view.
    ///
    /// Stays within `[0, 1]`. Class worth decays with the number of units of
    /// that class already fielded; alien-held sites and supply the faction
    /// actually needs raise a site's worth; capture-capable enemy units are
    /// worth more than their raw stats.
    pub fn evaluate(&self, world: &WorldState, valuable: Valuable<'_>) -> f64 {
        match valuable {
            Valuable::Class(class) => {
                let owned = self
                    .entities
                    .iter()
                    .filter(|id| {
                        world
                            .entity(**id)
                            .is_some_and(|e| e.is_alive() && e.class == class.id)
                    })
                    .count() as f64;
                (class.valuation() * 4.0 / (4.0 + owned)).clamp(0.0, 1.0)
            }
            Valuable::Unit(unit) => {
                let bonus = if unit.can_capture() { 1.25 } else { 1.0 };
                (unit.valuation() * bonus).clamp(0.0, 1.0)
            }
            Valuable::Site(site) => {
                let mut value = site.valuation();
                if site.owner.is_some() && site.owner != Some(self.id) {
                    value += 0.2;
                }
                if self.needs_supply_from(world, site) {
                    value += 0.2;
                }
                value.clamp(0.0, 1.0)
            }
        }
    }

    fn needs_supply_from(&self, world: &WorldState, site: &Site) -> bool {
        self.entities.iter().any(|id| {
            world.entity(*id).is_some_and(|e| {
                e.is_alive()
                    && e.required_supplies
                        .iter()
                        .any(|r| site.supply_at(r.index) > 0)
            })
        })
    }
}
