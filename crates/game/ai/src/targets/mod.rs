//! Shared algorithm primitives: target selection, attacks, build and
//! placement policies.
//!
//! Everything here is reusable by any decision algorithm; the Seeker is
//! just the first composition of these pieces.

mod attack;
mod build;
mod place;
mod select;

pub use attack::{attempt_attack, attempt_group_attack};
pub use build::{build_by_value, build_random};
pub use place::{evaluate_threats, place_by_threat, place_random};
pub use select::{
    AttackChoice, CombatComparison, MoveChoice, RangeCategory, select_attack_target,
    select_attack_target_in_range, select_combat_comparison, select_move_target, select_valuable,
};
