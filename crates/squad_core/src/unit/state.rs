//! Per-squad-member live record and plan execution.

use std::collections::VecDeque;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::action::{ActionArena, ActionId, ActionPriority, UnitAction, UnitActionKind};
use crate::debug_flags::plans_debug_enabled;
use crate::services::SignalSink;
use crate::signals::{Order, Outbound, SignalData};
use crate::types::{vec3_zero, AgentId, Vec3};

bitflags! {
    /// Independent state bits; callers clear stale bits themselves.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct UnitFlags: u8 {
        const FOLLOWING = 1 << 0;
        const HIDING = 1 << 1;
        const BEHIND = 1 << 2;
        const FAR = 1 << 3;
        const MOVING = 1 << 4;
        const SPECIAL = 1 << 5;
    }
}

bitflags! {
    /// Roles a unit can fill; tactics command units whose properties intersect their mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct UnitProperties: u8 {
        const COMBAT_GROUND = 1 << 0;
        const COMBAT_FLIGHT = 1 << 1;
        const COMBAT_MARINE = 1 << 2;
        const COMBAT_RECON = 1 << 3;
        /// May be diverted to cover fire during a search.
        const COVER_FIRE = 1 << 4;
    }
}

impl UnitProperties {
    pub const ALL: UnitProperties = UnitProperties::all();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SoldierClass {
    #[default]
    Unknown,
    Leader,
    Rifleman,
    Support,
    Sniper,
    Engineer,
}

/// Live record of one squad member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitState {
    agent: AgentId,
    plan: VecDeque<ActionId>,
    current_action: Option<ActionId>,
    suspended: bool,
    pub flags: UnitFlags,
    pub properties: UnitProperties,
    pub soldier_class: SoldierClass,
    /// Last point the unit was sent to.
    pub tag_point: Vec3,
    /// Free integer tag, used for method/direction codes.
    pub group: i32,
    pub formation_index: Option<usize>,
    pub width: f32,
    pub height: f32,
    /// Preferred distance to the target, 0 when unset.
    pub distance: f32,
    pub distance2: f32,
    pub last_reinforcement_time: f32,
}

impl UnitState {
    pub fn new(agent: AgentId, properties: UnitProperties) -> Self {
        Self {
            agent,
            plan: VecDeque::new(),
            current_action: None,
            suspended: false,
            flags: UnitFlags::empty(),
            properties,
            soldier_class: SoldierClass::Unknown,
            tag_point: vec3_zero(),
            group: 0,
            formation_index: None,
            width: 0.5,
            height: 1.8,
            distance: 0.0,
            distance2: 0.0,
            last_reinforcement_time: 0.0,
        }
    }

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn plan(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.plan.iter().copied()
    }

    pub fn plan_len(&self) -> usize {
        self.plan.len()
    }

    pub fn current_action(&self) -> Option<ActionId> {
        self.current_action
    }

    pub fn is_plan_finished(&self) -> bool {
        self.plan.is_empty()
    }

    /// No action is currently executing.
    pub fn idle(&self) -> bool {
        self.current_action.is_none()
    }

    pub fn is_task_suspended(&self) -> bool {
        self.suspended
    }

    pub fn suspend_task(&mut self) {
        self.suspended = true;
    }

    pub fn resume_task(&mut self) {
        self.suspended = false;
    }

    pub fn is_blocked(&self, arena: &ActionArena) -> bool {
        if self.suspended {
            return true;
        }
        self.plan.front().map(|id| arena.is_blocked(*id)).unwrap_or(false)
    }

    /// Appends an already inserted action to the plan.
    pub fn push_action(&mut self, id: ActionId) {
        self.plan.push_back(id);
    }

    /// Runs the plan head: non-blocking actions are executed and discarded
    /// until a blocking one takes the current slot or a blocked one is reached.
    pub fn execute_task(&mut self, arena: &mut ActionArena, sink: &mut dyn SignalSink) {
        if self.suspended {
            return;
        }

        while let Some(&front) = self.plan.front() {
            if self.current_action == Some(front) {
                // Still executing; completion arrives through `task_executed`.
                return;
            }

            let Some(action) = arena.get(front) else {
                log::error!("{}: plan holds a stale action handle {:?}", self.agent, front);
                debug_assert!(false, "stale action handle in plan");
                self.plan.pop_front();
                continue;
            };

            if action.is_blocked() {
                return;
            }

            let handled = dispatch(self.agent, action, sink);
            if handled && action.blocking {
                self.current_action = Some(front);
                return;
            }

            self.plan.pop_front();
            arena.remove(front);
        }
    }

    /// The agent reported completion of the current blocking action.
    pub fn task_executed(&mut self, arena: &mut ActionArena) {
        let Some(current) = self.current_action.take() else {
            return;
        };
        if self.plan.front() == Some(&current) {
            self.plan.pop_front();
        } else {
            self.plan.retain(|id| *id != current);
        }
        arena.remove(current);
    }

    /// Destroys planned actions: everything when `max_priority` is `None`,
    /// otherwise only actions at or below `max_priority`.
    pub fn clear_planning(&mut self, arena: &mut ActionArena, max_priority: Option<ActionPriority>) {
        let mut kept = VecDeque::with_capacity(self.plan.len());

        while let Some(id) = self.plan.pop_front() {
            let remove = match (max_priority, arena.get(id)) {
                (None, _) => true,
                (Some(max), Some(action)) => action.priority <= max,
                (Some(_), None) => true,
            };

            if remove {
                arena.remove(id);
                if self.current_action == Some(id) {
                    self.current_action = None;
                    self.suspended = false;
                }
            } else {
                kept.push_back(id);
            }
        }

        self.plan = kept;
    }

    pub fn is_following(&self) -> bool {
        self.flags.contains(UnitFlags::FOLLOWING)
    }

    pub fn set_following(&mut self) {
        self.flags.insert(UnitFlags::FOLLOWING);
    }

    pub fn clear_following(&mut self) {
        self.flags.remove(UnitFlags::FOLLOWING);
    }

    pub fn is_hiding(&self) -> bool {
        self.flags.contains(UnitFlags::HIDING)
    }

    pub fn set_hiding(&mut self) {
        self.flags.insert(UnitFlags::HIDING);
    }

    pub fn clear_hiding(&mut self) {
        self.flags.remove(UnitFlags::HIDING);
    }

    pub fn is_behind(&self) -> bool {
        self.flags.contains(UnitFlags::BEHIND)
    }

    pub fn set_behind(&mut self, behind: bool) {
        self.flags.set(UnitFlags::BEHIND, behind);
    }

    pub fn is_far(&self) -> bool {
        self.flags.contains(UnitFlags::FAR)
    }

    pub fn set_far(&mut self, far: bool) {
        self.flags.set(UnitFlags::FAR, far);
    }

    pub fn is_moving(&self) -> bool {
        self.flags.contains(UnitFlags::MOVING)
    }

    pub fn set_moving(&mut self) {
        self.flags.insert(UnitFlags::MOVING);
    }

    pub fn clear_moving(&mut self) {
        self.flags.remove(UnitFlags::MOVING);
    }

    pub fn is_special(&self) -> bool {
        self.flags.contains(UnitFlags::SPECIAL)
    }

    pub fn set_special(&mut self, special: bool) {
        self.flags.set(UnitFlags::SPECIAL, special);
    }
}

/// Sends the signal an action stands for. Returns `false` for unknown kinds,
/// which are then skipped as non-blocking no-ops.
fn dispatch(agent: AgentId, action: &UnitAction, sink: &mut dyn SignalSink) -> bool {
    if plans_debug_enabled() {
        log::debug!("{}: executing {:?} (blocking={})", agent, action.kind, action.blocking);
    }

    match action.kind {
        UnitActionKind::Signal => {
            sink.send_to(
                agent,
                Outbound::from_name(&action.signal_text),
                action.signal_data.clone(),
            );
            true
        }
        UnitActionKind::Search => {
            let data = SignalData {
                point: action.point,
                point2: action.direction,
                i_value: action.tag,
                f_value: action.distance,
                ..SignalData::default()
            };
            sink.send_to(agent, Outbound::Order(Order::Search), data);
            true
        }
        UnitActionKind::AcquireTarget => {
            let data = SignalData {
                point: action.point,
                n_id: action.target.map_or(0, |t| t.0),
                ..SignalData::default()
            };
            sink.send_to(agent, Outbound::Order(Order::AcquireTarget), data);
            true
        }
        UnitActionKind::None => {
            log::error!("{}: unit action with unset kind skipped", agent);
            debug_assert!(false, "unit action with unset kind");
            false
        }
    }
}
