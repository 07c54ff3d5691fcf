//! # Squad tactics
//!
//! A tactic is a squad-level behavior issued by the director. It owns no
//! units: it reads and writes the [`UnitState`](crate::unit::UnitState)s of
//! the roster units whose properties match its mask, fills their plans, and
//! reacts to inbound signals.
//!
//! ## Tactic types
//! - **Search**: spread the squad over candidate points around the last known enemy position
//! - **Attack / SwitchPositions**: rotate units through formation points and shoot spots
//!   around the beacon
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut tactic = Tactic::create(&params, &config);
//! let status = tactic.update(&mut ctx);
//! let handled = tactic.process_signal(&mut ctx, &event);
//! ```

pub mod attack;
pub mod common;
pub mod search;
pub mod switch_positions;

#[cfg(test)]
pub(crate) mod testing;

pub use attack::AttackState;
pub use search::{SearchPoint, SearchPointMap, SearchTactic};
pub use switch_positions::{
    DangerPoint, PointProperties, SpecialAction, SpecialActionStatus, SwitchPositionsTactic,
    TargetData,
};

use serde::{Deserialize, Serialize};

use crate::beacon::Beacon;
use crate::config::TacticsConfig;
use crate::error::TacticFailure;
use crate::services::{SignalSink, TacticalServices};
use crate::signals::SignalEvent;
use crate::types::{vec3_zero, AgentId, Vec3};
use crate::unit::{Roster, UnitProperties, UnitState};

/// Result of one tactic update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Running,
    Done,
    Failed(TacticFailure),
}

impl ActionStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, ActionStatus::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackSubtype {
    SwitchPositions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaderActionType {
    Search,
    Attack(AttackSubtype),
}

/// Parameter bundle the director issues a tactic with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderActionParams {
    pub action_type: LeaderActionType,
    /// Search: unused. Attack: seconds without target before failing (0 = config).
    pub duration: f32,
    /// Attack: formation descriptor (empty = config).
    pub name: String,
    /// Search: last known enemy position. Attack: defense point.
    pub point: Vec3,
    pub point2: Vec3,
    /// Search: query radius. Attack: formation radius at scale 1.0 (0 = template).
    pub size: f32,
    pub unit_properties: UnitProperties,
    /// Search: nearby-object type (0 = config).
    pub i_value: i32,
    /// Attack: minimum distance to target (0 = config).
    pub f_value: f32,
    pub priority: i32,
}

impl Default for LeaderActionParams {
    fn default() -> Self {
        Self {
            action_type: LeaderActionType::Search,
            duration: 0.0,
            name: String::new(),
            point: vec3_zero(),
            point2: vec3_zero(),
            size: 0.0,
            unit_properties: UnitProperties::ALL,
            i_value: 0,
            f_value: 0.0,
            priority: 0,
        }
    }
}

impl LeaderActionParams {
    pub fn search(enemy_pos: Vec3, size: f32) -> Self {
        Self { action_type: LeaderActionType::Search, point: enemy_pos, size, ..Self::default() }
    }

    pub fn switch_positions(formation: &str) -> Self {
        Self {
            action_type: LeaderActionType::Attack(AttackSubtype::SwitchPositions),
            name: formation.to_string(),
            ..Self::default()
        }
    }

    pub fn with_unit_properties(mut self, properties: UnitProperties) -> Self {
        self.unit_properties = properties;
        self
    }

    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }
}

/// Fields every tactic carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacticBase {
    pub action_type: LeaderActionType,
    pub priority: i32,
    /// Roles this tactic may command.
    pub unit_properties: UnitProperties,
}

impl TacticBase {
    pub fn from_params(params: &LeaderActionParams) -> Self {
        Self {
            action_type: params.action_type,
            priority: params.priority,
            unit_properties: params.unit_properties,
        }
    }
}

/// Everything a tactic touches during one update or signal delivery.
pub struct TacticContext<'a> {
    pub roster: &'a mut Roster,
    pub beacon: &'a mut Beacon,
    pub services: &'a dyn TacticalServices,
    pub sink: &'a mut dyn SignalSink,
    pub config: &'a TacticsConfig,
    /// Agent leading the squad, if it is an agent at all.
    pub leader_agent: Option<AgentId>,
    /// Accumulated simulation time in seconds.
    pub now: f32,
    /// Frame delta in seconds.
    pub dt: f32,
}

/// The active squad behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tactic {
    Search(SearchTactic),
    SwitchPositions(SwitchPositionsTactic),
}

impl Tactic {
    pub fn create(params: &LeaderActionParams, config: &TacticsConfig) -> Self {
        match params.action_type {
            LeaderActionType::Search => Tactic::Search(SearchTactic::new(params, config)),
            LeaderActionType::Attack(AttackSubtype::SwitchPositions) => {
                Tactic::SwitchPositions(SwitchPositionsTactic::new(params, config))
            }
        }
    }

    pub fn base(&self) -> &TacticBase {
        match self {
            Tactic::Search(t) => t.base(),
            Tactic::SwitchPositions(t) => t.base(),
        }
    }

    pub fn action_type(&self) -> LeaderActionType {
        self.base().action_type
    }

    pub fn update(&mut self, ctx: &mut TacticContext<'_>) -> ActionStatus {
        match self {
            Tactic::Search(t) => t.update(ctx),
            Tactic::SwitchPositions(t) => t.update(ctx),
        }
    }

    /// `false` when the signal is not one this tactic handles.
    pub fn process_signal(&mut self, ctx: &mut TacticContext<'_>, event: &SignalEvent) -> bool {
        match self {
            Tactic::Search(t) => t.process_signal(ctx, event),
            Tactic::SwitchPositions(t) => t.process_signal(ctx, event),
        }
    }

    /// Called after `unit` left the roster.
    pub fn unit_removed(&mut self, unit: &UnitState) {
        match self {
            Tactic::Search(t) => t.unit_removed(unit),
            Tactic::SwitchPositions(t) => t.unit_removed(unit.agent()),
        }
    }

    /// Called once when the tactic is discarded or replaced.
    pub fn on_exit(&mut self, ctx: &mut TacticContext<'_>) {
        match self {
            Tactic::Search(_) => {}
            Tactic::SwitchPositions(t) => t.on_exit(ctx),
        }
    }
}
