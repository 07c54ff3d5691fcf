//! UnitAction and the dependency arena.
//!
//! ## Key concepts
//! - **UnitAction**: one pending instruction for a unit (signal, search, acquire target)
//! - **ActionId**: generation-checked handle into the [`ActionArena`]
//! - **Blocking links**: `a` blocked by `b` stores `b` in `a.blocking` and `a` in `b.blocked`
//!
//! Removing an action from the arena unlinks it from every partner, so a
//! blocked action is released as soon as its last blocker is destroyed and no
//! list ever keeps a handle to a dead slot.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SquadError};
use crate::signals::SignalData;
use crate::types::{vec3_zero, AgentId, Vec3};

/// What executing the action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitActionKind {
    /// Unset; executing it is an invariant violation.
    #[default]
    None,
    Signal,
    Search,
    AcquireTarget,
}

/// Ordered priority; a higher value is more important.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum ActionPriority {
    VeryLow = 1,
    Low = 2,
    #[default]
    Normal = 3,
    High = 4,
    VeryHigh = 5,
}

/// Tag value of a search action heading to a hide spot.
pub const SEARCH_TAG_HIDE: i32 = 1;
/// Tag value of a search action heading to a plain point.
pub const SEARCH_TAG_NO_HIDE: i32 = 0;

/// Generation-checked handle to an action in an [`ActionArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId {
    index: u32,
    generation: u32,
}

/// One pending instruction for a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitAction {
    pub kind: UnitActionKind,
    /// Blocking actions hold the unit's current slot until reported executed.
    pub blocking: bool,
    pub priority: ActionPriority,
    pub point: Vec3,
    pub direction: Vec3,
    pub distance: f32,
    pub signal_text: String,
    pub signal_data: SignalData,
    pub tag: i32,
    /// Entity an acquire-target order points the unit at.
    #[serde(default)]
    pub target: Option<AgentId>,
    /// Actions that must complete before this one may run.
    blocked_by: Vec<ActionId>,
    /// Actions waiting on this one.
    blocks: Vec<ActionId>,
}

impl Default for UnitAction {
    fn default() -> Self {
        Self {
            kind: UnitActionKind::None,
            blocking: false,
            priority: ActionPriority::Normal,
            point: vec3_zero(),
            direction: vec3_zero(),
            distance: 0.0,
            signal_text: String::new(),
            signal_data: SignalData::default(),
            tag: 0,
            target: None,
            blocked_by: Vec::new(),
            blocks: Vec::new(),
        }
    }
}

impl UnitAction {
    /// Signal action carrying free-form text and payload.
    pub fn signal(text: impl Into<String>, data: SignalData, blocking: bool) -> Self {
        Self {
            kind: UnitActionKind::Signal,
            blocking,
            signal_text: text.into(),
            signal_data: data,
            ..Self::default()
        }
    }

    /// Search order toward `point`, facing `direction`.
    pub fn search(point: Vec3, direction: Vec3, hide_spot: bool) -> Self {
        Self {
            kind: UnitActionKind::Search,
            blocking: true,
            point,
            direction,
            tag: if hide_spot { SEARCH_TAG_HIDE } else { SEARCH_TAG_NO_HIDE },
            ..Self::default()
        }
    }

    /// Order to acquire `target` as attention target.
    pub fn acquire_target(target: AgentId, point: Vec3) -> Self {
        Self {
            kind: UnitActionKind::AcquireTarget,
            blocking: false,
            point,
            target: Some(target),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: ActionPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn is_blocked(&self) -> bool {
        !self.blocked_by.is_empty()
    }

    /// Handles of the actions this one waits for.
    pub fn blockers(&self) -> &[ActionId] {
        &self.blocked_by
    }

    /// Handles of the actions waiting for this one.
    pub fn dependents(&self) -> &[ActionId] {
        &self.blocks
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Slot {
    generation: u32,
    action: Option<UnitAction>,
}

/// Storage for every live action of a squad.
///
/// Actions of different units may block each other, so the arena is shared
/// by the whole roster while each unit's plan only keeps handles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl ActionArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn insert(&mut self, mut action: UnitAction) -> ActionId {
        // Links are only created through `block`.
        action.blocked_by.clear();
        action.blocks.clear();
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.action = Some(action);
            return ActionId { index, generation: slot.generation };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, action: Some(action) });
        ActionId { index, generation: 0 }
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ActionId) -> Option<&UnitAction> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.action.as_ref())
    }

    pub fn get_mut(&mut self, id: ActionId) -> Option<&mut UnitAction> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.action.as_mut())
    }

    /// `false` for stale handles as well as for unblocked actions.
    pub fn is_blocked(&self, id: ActionId) -> bool {
        self.get(id).map(UnitAction::is_blocked).unwrap_or(false)
    }

    /// Registers that `action` may not run before `blocker` is destroyed.
    ///
    /// No cycle detection: callers must not create cycles.
    pub fn block(&mut self, action: ActionId, blocker: ActionId) -> Result<()> {
        if !self.contains(blocker) {
            return Err(SquadError::StaleAction(blocker));
        }
        match self.get_mut(action) {
            Some(waiting) => waiting.blocked_by.push(blocker),
            None => return Err(SquadError::StaleAction(action)),
        }
        if let Some(blocking) = self.get_mut(blocker) {
            blocking.blocks.push(action);
        }
        Ok(())
    }

    /// Destroys an action and unlinks it from all partners.
    pub fn remove(&mut self, id: ActionId) -> Option<UnitAction> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let action = slot.action.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;

        // Release everything that waited on us.
        for dependent in &action.blocks {
            if let Some(waiting) = self.get_mut(*dependent) {
                waiting.blocked_by.retain(|b| *b != id);
            }
        }
        // Forget us on everything we waited on.
        for blocker in &action.blocked_by {
            if let Some(blocking) = self.get_mut(*blocker) {
                blocking.blocks.retain(|b| *b != id);
            }
        }

        Some(action)
    }
}


#[cfg(all(test, feature = "proptest"))]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Insert,
        Block(usize, usize),
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            2 => Just(Op::Insert),
            2 => (0..16usize, 0..16usize).prop_map(|(a, b)| Op::Block(a, b)),
            1 => (0..16usize).prop_map(Op::Remove),
        ]
    }

    proptest! {
        /// Links stay symmetric and never point at destroyed actions.
        #[test]
        fn prop_links_symmetric_and_live(ops in prop::collection::vec(op(), 1..64)) {
            let mut arena = ActionArena::new();
            let mut handles: Vec<ActionId> = Vec::new();

            for op in ops {
                match op {
                    Op::Insert => {
                        handles.push(arena.insert(UnitAction::signal("x", SignalData::default(), true)));
                    }
                    Op::Block(a, b) if !handles.is_empty() => {
                        let (a, b) = (handles[a % handles.len()], handles[b % handles.len()]);
                        // Only forward links, so no cycles are ever built.
                        if a.index > b.index && arena.contains(a) && arena.contains(b) {
                            arena.block(a, b).unwrap();
                        }
                    }
                    Op::Remove(i) if !handles.is_empty() => {
                        let id = handles.remove(i % handles.len());
                        arena.remove(id);
                        prop_assert!(!arena.contains(id));
                    }
                    _ => {}
                }
            }

            prop_assert_eq!(arena.len(), handles.iter().filter(|h| arena.contains(**h)).count());
            for id in &handles {
                let Some(action) = arena.get(*id) else { continue };
                for blocker in action.blockers() {
                    prop_assert!(arena.contains(*blocker));
                    prop_assert!(arena.get(*blocker).unwrap().dependents().contains(id));
                }
                for dependent in action.dependents() {
                    prop_assert!(arena.contains(*dependent));
                    prop_assert!(arena.get(*dependent).unwrap().blockers().contains(id));
                }
            }
        }
    }
}
