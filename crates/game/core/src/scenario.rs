//! Programmatic world construction.
//!
//! Scenario files live outside the engine; the runtime and the test suites
//! build worlds through [`WorldBuilder`] instead. Entity ids are assigned
//! in call order, so a builder script is fully deterministic.

use std::sync::Arc;

use crate::grid::{HexCoord, SiteGrid};
use crate::state::{
    ClassRegistry, EntityClass, EntityId, Faction, FactionId, WorldState,
};

enum Spawn {
    Unit { faction: usize, class: String, at: HexCoord },
    Terrain { class: String, at: HexCoord },
}

/// Builder for a complete initial [`WorldState`].
pub struct WorldBuilder {
    classes: ClassRegistry,
    factions: Vec<Faction>,
    width: i32,
    height: i32,
    spawns: Vec<Spawn>,
    owners: Vec<(HexCoord, usize)>,
    capture_sites: Vec<(HexCoord, bool)>,
    supplies: Vec<(HexCoord, Vec<i32>)>,
}

impl WorldBuilder {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            classes: ClassRegistry::new(),
            factions: Vec::new(),
            width,
            height,
            spawns: Vec::new(),
            owners: Vec::new(),
            capture_sites: Vec::new(),
            supplies: Vec::new(),
        }
    }

    pub fn add_class(&mut self, class: EntityClass) -> &mut Self {
        self.classes.insert(class);
        self
    }

    pub fn add_faction(&mut self, name: &str) -> FactionId {
        let id = FactionId(self.factions.len() as u32);
        self.factions.push(Faction::new(id, name));
        id
    }

    pub fn set_build_points(&mut self, faction: usize, points: i32) -> &mut Self {
        self.factions[faction].build_points = points;
        self
    }

    pub fn set_buildable(&mut self, faction: usize, classes: &[&str]) -> &mut Self {
        self.factions[faction].buildable = classes.iter().map(|c| (*c).to_owned()).collect();
        self
    }

    /// Caps how many entities of `class` the faction may ever build.
    pub fn set_unit_pool(&mut self, faction: usize, class: &str, count: i32) -> &mut Self {
        self.factions[faction]
            .unit_pool
            .insert(class.to_owned(), count);
        self
    }

    /// Queues a unit spawn; the returned id is valid after `build`.
    pub fn add_unit(&mut self, faction: usize, class: &str, at: (i32, i32)) -> EntityId {
        self.spawns.push(Spawn::Unit {
            faction,
            class: class.to_owned(),
            at: HexCoord::new(at.0, at.1),
        });
        EntityId(self.spawns.len() as u32)
    }

    /// Queues a terrain spawn; terrain is unowned.
    pub fn add_terrain(&mut self, class: &str, at: (i32, i32)) -> EntityId {
        self.spawns.push(Spawn::Terrain {
            class: class.to_owned(),
            at: HexCoord::new(at.0, at.1),
        });
        EntityId(self.spawns.len() as u32)
    }

    pub fn set_site_owner(&mut self, at: (i32, i32), faction: usize) -> &mut Self {
        self.owners.push((HexCoord::new(at.0, at.1), faction));
        self
    }

    pub fn set_site_capture(&mut self, at: (i32, i32), can_capture: bool) -> &mut Self {
        self.capture_sites.push((HexCoord::new(at.0, at.1), can_capture));
        self
    }

    pub fn set_site_supplies(&mut self, at: (i32, i32), supplies: Vec<i32>) -> &mut Self {
        self.supplies.push((HexCoord::new(at.0, at.1), supplies));
        self
    }

    /// Materializes the world. Panics on ids or coordinates that do not
    /// resolve; scenario scripts are trusted input.
    pub fn build(self) -> WorldState {
        let grid = SiteGrid::new(self.width, self.height);
        let mut world = WorldState::new(Arc::new(self.classes), self.factions, grid);

        for (coord, faction) in self.owners {
            let id = world.factions[faction].id;
            world
                .site_mut(coord)
                .expect("owner coordinate out of bounds")
                .owner = Some(id);
            world.factions[faction].sites.insert(coord);
        }
        for (coord, can_capture) in self.capture_sites {
            world
                .site_mut(coord)
                .expect("capture coordinate out of bounds")
                .can_capture = can_capture;
        }
        for (coord, supplies) in self.supplies {
            world
                .site_mut(coord)
                .expect("supply coordinate out of bounds")
                .supplies = Some(supplies);
        }

        for spawn in self.spawns {
            let (class, owner, at) = match spawn {
                Spawn::Unit { faction, class, at } => {
                    (class, Some(world.factions[faction].id), at)
                }
                Spawn::Terrain { class, at } => (class, None, at),
            };
            let id = world
                .spawn_entity(&class, owner)
                .expect("scenario references unknown class");
            world
                .entity_mut(id)
                .expect("freshly spawned entity")
                .site = Some(at);
            world
                .site_mut(at)
                .expect("spawn coordinate out of bounds")
                .entities
                .push(id);
        }

        world
    }
}
