//! Per-faction persistent algorithm state.
//!
//! Algorithms keep data across turns, keyed by faction. A slot carries the
//! turn it was last refreshed on; when the stored turn falls outside the
//! caller's freshness window the state is reset rather than reused.

use std::collections::BTreeMap;

use hexfield_core::{FactionId, WorldState};

/// One faction's slot: the payload plus its last-updated turn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FactionSlot<S> {
    turn: i32,
    pub state: S,
}

impl<S> FactionSlot<S> {
    /// The turn this slot was last refreshed on; monotonically
    /// non-decreasing over the slot's lifetime.
    pub fn turn(&self) -> i32 {
        self.turn
    }
}

/// Store of per-faction slots for one algorithm instance.
#[derive(Clone, Debug, Default)]
pub struct FactionStateStore<S> {
    slots: BTreeMap<FactionId, FactionSlot<S>>,
}

impl<S: Default> FactionStateStore<S> {
    pub fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }

    /// The slot for `faction`, refreshed to the world's current turn.
    ///
    /// The existing payload is kept iff `0 <= current - stored <= max_age`;
    /// anything else (including a world rewound behind the slot) resets it.
    pub fn state_for(
        &mut self,
        world: &WorldState,
        faction: FactionId,
        max_age: i32,
    ) -> &mut FactionSlot<S> {
        let current = world.current_turn;
        let slot = self.slots.entry(faction).or_insert_with(|| FactionSlot {
            turn: current,
            state: S::default(),
        });
        let age = current - slot.turn;
        if !(0..=max_age).contains(&age) {
            slot.state = S::default();
        }
        slot.turn = current;
        slot
    }

    pub fn remove(&mut self, faction: FactionId) -> Option<FactionSlot<S>> {
        self.slots.remove(&faction)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
