//! Unit-level planning: actions, their dependency arena, and per-unit state.

pub mod action;
pub mod roster;
pub mod state;

pub use action::{
    ActionArena, ActionId, ActionPriority, UnitAction, UnitActionKind, SEARCH_TAG_HIDE,
    SEARCH_TAG_NO_HIDE,
};
pub use roster::Roster;
pub use state::{SoldierClass, UnitFlags, UnitProperties, UnitState};
