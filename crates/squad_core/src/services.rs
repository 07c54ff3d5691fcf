//! Collaborator interfaces the coordinator consumes.
//!
//! Everything behind these traits is owned by the surrounding engine:
//! agents, navigation, raycasts, spatial queries. The core only queries them
//! and sends signals back through a [`SignalSink`].

use serde::{Deserialize, Serialize};

use crate::signals::{AgentSignal, Outbound, SignalData};
use crate::types::{AgentId, NavInfo, Vec3};

/// How an agent's current attention target was perceived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetKind {
    /// Directly perceived live entity.
    #[default]
    Live,
    /// Remembered position of an entity no longer seen.
    Memory,
    /// Position of a heard sound.
    Sound,
}

/// Snapshot of an agent's attention target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetInfo {
    /// Entity behind the target, if it is an entity at all.
    pub id: Option<AgentId>,
    pub position: Vec3,
    /// Facing of the target, zero when unknown.
    pub direction: Vec3,
    pub kind: TargetKind,
    pub hostile: bool,
    pub alive: bool,
    /// Vehicles tolerate several simultaneous special-action claimants.
    pub vehicle: bool,
}

impl TargetInfo {
    pub fn is_live_hostile(&self) -> bool {
        self.kind == TargetKind::Live && self.hostile && self.alive
    }
}

/// Snapshot of an agent resolved from a weak handle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: AgentId,
    pub position: Vec3,
    pub direction: Vec3,
    pub enabled: bool,
    pub alive: bool,
    pub attention_target: Option<TargetInfo>,
}

/// A hide spot returned by the spatial query service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HideSpot {
    pub position: Vec3,
    pub direction: Vec3,
}

/// Resolves weak agent handles.
pub trait AgentDirectory {
    /// `None` when the agent no longer exists.
    fn agent(&self, id: AgentId) -> Option<AgentInfo>;

    /// Last position the squad knows the player at, if any.
    fn last_known_player_position(&self) -> Option<Vec3> {
        None
    }
}

/// Navigation graph classification.
pub trait NavigationQuery {
    fn nav_info(&self, position: &Vec3) -> NavInfo;
}

/// Line-of-sight raycasts.
pub trait VisibilityQuery {
    fn line_of_sight(&self, from: &Vec3, to: &Vec3) -> bool;
}

/// Spatial searches around a point.
pub trait SpatialQuery {
    fn hide_spots(&self, center: &Vec3, radius: f32) -> Vec<HideSpot>;

    /// Objects of the given type worth investigating.
    fn nearby_objects(&self, center: &Vec3, radius: f32, object_type: i32) -> Vec<Vec3>;

    /// Auxiliary firing positions outside the formation.
    fn shoot_spots(&self, center: &Vec3, radius: f32) -> Vec<Vec3>;
}

/// All services a tactic needs, as one object.
pub trait TacticalServices: AgentDirectory + NavigationQuery + VisibilityQuery + SpatialQuery {}

impl<T> TacticalServices for T where
    T: AgentDirectory + NavigationQuery + VisibilityQuery + SpatialQuery
{
}

/// Destination for outbound signals.
pub trait SignalSink {
    fn send(&mut self, signal: AgentSignal);

    fn send_to(&mut self, to: AgentId, signal: Outbound, data: SignalData) {
        self.send(AgentSignal { to, signal, data });
    }
}

/// Sink that keeps every signal in order, for tests and the scenario runner.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub signals: Vec<AgentSignal>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<AgentSignal> {
        std::mem::take(&mut self.signals)
    }

    pub fn count(&self, name: &str) -> usize {
        self.signals.iter().filter(|s| s.name() == name).count()
    }

    pub fn sent_to(&self, to: AgentId, name: &str) -> Vec<&AgentSignal> {
        self.signals.iter().filter(|s| s.to == to && s.name() == name).collect()
    }
}

impl SignalSink for RecordingSink {
    fn send(&mut self, signal: AgentSignal) {
        self.signals.push(signal);
    }
}
