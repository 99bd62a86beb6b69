//! Authoritative world state.
//!
//! The arena design keeps entity ↔ site ↔ faction references acyclic: sites
//! and factions store ids, and every back reference resolves through
//! [`WorldState`]. Cloning a world is a plain deep clone; the class registry
//! is immutable scenario data and shared by `Arc` across clones.

mod class;
mod entity;
mod faction;
mod site;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use class::{
    ClassFlags, ClassId, ClassRegistry, EntityCategory, EntityClass, RangedAttackMode,
    SupplyRequirement,
};
pub use entity::{Entity, EntityId};
pub use faction::{Faction, FactionId, Valuable};
pub use site::Site;

use crate::command::CommandHistory;
use crate::error::{CoreError, Result};
use crate::grid::{HexCoord, SiteGrid};

/// The complete, self-contained game snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldState {
    classes: Arc<ClassRegistry>,
    pub factions: Vec<Faction>,
    pub grid: SiteGrid,
    entities: BTreeMap<EntityId, Entity>,
    next_entity_id: u32,
    pub active_faction_index: usize,
    pub current_turn: i32,
    pub game_over: bool,
    pub history: CommandHistory,
}

impl WorldState {
    /// Creates an empty world over a fresh grid.
    pub fn new(classes: Arc<ClassRegistry>, factions: Vec<Faction>, grid: SiteGrid) -> Self {
        Self {
            classes,
            factions,
            grid,
            entities: BTreeMap::new(),
            next_entity_id: 1,
            active_faction_index: 0,
            current_turn: 1,
            game_over: false,
            history: CommandHistory::default(),
        }
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn class(&self, id: &str) -> Option<&EntityClass> {
        self.classes.get(id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Resolves an entity or reports the invariant violation.
    pub fn require_entity(&self, id: EntityId) -> Result<&Entity> {
        self.entities.get(&id).ok_or(CoreError::MissingEntity(id))
    }

    /// All entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn site(&self, coord: HexCoord) -> Option<&Site> {
        self.grid.get(coord)
    }

    pub fn site_mut(&mut self, coord: HexCoord) -> Option<&mut Site> {
        self.grid.get_mut(coord)
    }

    pub fn faction(&self, id: FactionId) -> Option<&Faction> {
        self.factions.iter().find(|f| f.id == id)
    }

    pub fn faction_mut(&mut self, id: FactionId) -> Option<&mut Faction> {
        self.factions.iter_mut().find(|f| f.id == id)
    }

    pub fn active_faction(&self) -> &Faction {
        &self.factions[self.active_faction_index]
    }

    pub fn active_faction_id(&self) -> FactionId {
        self.factions[self.active_faction_index].id
    }

    /// Allocates and registers a new entity of `class` for `owner`.
    ///
    /// The entity starts unplaced; placement and turn refresh go through the
    /// executor.
    pub fn spawn_entity(&mut self, class: &str, owner: Option<FactionId>) -> Result<EntityId> {
        let class = self
            .classes
            .get(class)
            .ok_or_else(|| CoreError::MissingClass(class.to_owned()))?
            .clone();
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        let entity = Entity::from_class(id, &class, owner);
        if let Some(owner) = owner {
            if let Some(faction) = self.faction_mut(owner) {
                faction.entities.insert(id);
            }
        }
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Raises the entity to the top of its site's stack.
    ///
    /// Returns false when the entity is not placed.
    pub fn move_entity_to_top(&mut self, id: EntityId) -> bool {
        let Some(coord) = self.entities.get(&id).and_then(|e| e.site) else {
            return false;
        };
        let Some(site) = self.grid.get_mut(coord) else {
            return false;
        };
        let Some(pos) = site.entities.iter().position(|e| *e == id) else {
            return false;
        };
        let id = site.entities.remove(pos);
        site.entities.push(id);
        true
    }

    /// Factions that still field at least one live unit.
    pub fn surviving_factions(&self) -> Vec<FactionId> {
        self.factions
            .iter()
            .filter(|f| {
                f.entities
                    .iter()
                    .any(|id| self.entity(*id).is_some_and(|e| e.is_unit() && e.is_alive()))
            })
            .map(|f| f.id)
            .collect()
    }

    /// Flips `game_over` once at most one faction still has units.
    pub(crate) fn refresh_game_over(&mut self) {
        if self.surviving_factions().len() <= 1 {
            self.game_over = true;
        }
    }

    /// Removes a dead entity from its site and faction; the arena entry stays
    /// so historic commands keep resolving the id.
    pub(crate) fn bury(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.strength = entity.strength.min(0);
        let coord = entity.site.take();
        let owner = entity.owner;
        if let Some(coord) = coord {
            if let Some(site) = self.grid.get_mut(coord) {
                site.entities.retain(|e| *e != id);
            }
        }
        if let Some(owner) = owner {
            if let Some(faction) = self.faction_mut(owner) {
                faction.entities.remove(&id);
            }
        }
    }
}
