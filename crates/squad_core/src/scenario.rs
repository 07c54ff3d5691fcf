//! Scripted squad scenarios.
//!
//! A scenario file (YAML or JSON) describes a small world, the squad, the
//! tactic to issue and a timeline of scripted events. [`ScenarioWorld`]
//! implements every service trait over that description, so the coordinator
//! can be driven without an engine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::TacticsConfig;
use crate::error::{Result, ScenarioError};
use crate::leader::SquadLeader;
use crate::services::{
    AgentDirectory, AgentInfo, HideSpot, NavigationQuery, RecordingSink, SpatialQuery, TargetInfo,
    TargetKind, VisibilityQuery,
};
use crate::signals::{AgentSignal, InboundKind, SignalData, SignalEvent};
use crate::tactics::{ActionStatus, LeaderActionParams};
use crate::types::{segment_point_dist_sq, vec3_zero, AgentId, NavInfo, Vec3};
use crate::unit::{SoldierClass, UnitProperties};

fn default_true() -> bool {
    true
}

fn default_dt() -> f32 {
    0.1
}

fn default_properties() -> UnitProperties {
    UnitProperties::ALL
}

// ============================================================================
// World
// ============================================================================

/// Attention target as written in a scenario file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTarget {
    #[serde(default)]
    pub id: Option<AgentId>,
    pub position: Vec3,
    #[serde(default = "vec3_zero")]
    pub direction: Vec3,
    #[serde(default)]
    pub kind: TargetKind,
    #[serde(default = "default_true")]
    pub hostile: bool,
    #[serde(default = "default_true")]
    pub alive: bool,
    #[serde(default)]
    pub vehicle: bool,
}

impl From<ScenarioTarget> for TargetInfo {
    fn from(t: ScenarioTarget) -> Self {
        TargetInfo {
            id: t.id,
            position: t.position,
            direction: t.direction,
            kind: t.kind,
            hostile: t.hostile,
            alive: t.alive,
            vehicle: t.vehicle,
        }
    }
}

impl From<TargetInfo> for ScenarioTarget {
    fn from(t: TargetInfo) -> Self {
        ScenarioTarget {
            id: t.id,
            position: t.position,
            direction: t.direction,
            kind: t.kind,
            hostile: t.hostile,
            alive: t.alive,
            vehicle: t.vehicle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAgent {
    pub id: AgentId,
    pub position: Vec3,
    #[serde(default = "vec3_zero")]
    pub direction: Vec3,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub alive: bool,
    #[serde(default)]
    pub target: Option<ScenarioTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioObject {
    pub position: Vec3,
    #[serde(default)]
    pub object_type: i32,
}

/// Sphere that blocks line of sight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Blocker {
    pub center: Vec3,
    pub radius: f32,
}

/// Axis-aligned ground rectangle with its own navigation class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavRegion {
    pub min: [f32; 2],
    pub max: [f32; 2],
    pub nav: NavInfo,
}

impl NavRegion {
    fn contains(&self, p: &Vec3) -> bool {
        p.x >= self.min[0] && p.x <= self.max[0] && p.y >= self.min[1] && p.y <= self.max[1]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioWorld {
    pub agents: Vec<ScenarioAgent>,
    pub hide_spots: Vec<HideSpot>,
    pub objects: Vec<ScenarioObject>,
    pub shoot_spots: Vec<Vec3>,
    pub blockers: Vec<Blocker>,
    /// First matching region wins.
    pub nav_regions: Vec<NavRegion>,
    pub default_nav: NavInfo,
    pub player_position: Option<Vec3>,
}

impl ScenarioWorld {
    pub fn add_agent(&mut self, id: AgentId, position: Vec3) -> &mut ScenarioAgent {
        self.agents.retain(|a| a.id != id);
        self.agents.push(ScenarioAgent {
            id,
            position,
            direction: vec3_zero(),
            enabled: true,
            alive: true,
            target: None,
        });
        let last = self.agents.len() - 1;
        &mut self.agents[last]
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut ScenarioAgent> {
        self.agents.iter_mut().find(|a| a.id == id)
    }

    /// Returns `false` when the agent does not exist.
    pub fn move_agent(&mut self, id: AgentId, position: Vec3) -> bool {
        self.agent_mut(id).map(|a| a.position = position).is_some()
    }

    pub fn kill_agent(&mut self, id: AgentId) -> bool {
        self.agent_mut(id).map(|a| a.alive = false).is_some()
    }

    pub fn set_enabled(&mut self, id: AgentId, enabled: bool) -> bool {
        self.agent_mut(id).map(|a| a.enabled = enabled).is_some()
    }

    pub fn set_target(&mut self, id: AgentId, target: TargetInfo) -> bool {
        self.agent_mut(id).map(|a| a.target = Some(target.into())).is_some()
    }

    pub fn clear_target(&mut self, id: AgentId) -> bool {
        self.agent_mut(id).map(|a| a.target = None).is_some()
    }

    pub fn add_object(&mut self, position: Vec3, object_type: i32) {
        self.objects.push(ScenarioObject { position, object_type });
    }

    pub fn add_blocker(&mut self, center: Vec3, radius: f32) {
        self.blockers.push(Blocker { center, radius });
    }
}

impl AgentDirectory for ScenarioWorld {
    fn agent(&self, id: AgentId) -> Option<AgentInfo> {
        self.agents.iter().find(|a| a.id == id).map(|a| AgentInfo {
            id: a.id,
            position: a.position,
            direction: a.direction,
            enabled: a.enabled,
            alive: a.alive,
            attention_target: a.target.map(TargetInfo::from),
        })
    }

    fn last_known_player_position(&self) -> Option<Vec3> {
        self.player_position
    }
}

impl NavigationQuery for ScenarioWorld {
    fn nav_info(&self, position: &Vec3) -> NavInfo {
        self.nav_regions
            .iter()
            .find(|r| r.contains(position))
            .map(|r| r.nav)
            .unwrap_or(self.default_nav)
    }
}

impl VisibilityQuery for ScenarioWorld {
    fn line_of_sight(&self, from: &Vec3, to: &Vec3) -> bool {
        !self
            .blockers
            .iter()
            .any(|b| segment_point_dist_sq(from, to, &b.center) < b.radius * b.radius)
    }
}

impl SpatialQuery for ScenarioWorld {
    fn hide_spots(&self, center: &Vec3, radius: f32) -> Vec<HideSpot> {
        self.hide_spots
            .iter()
            .filter(|s| (s.position - center).norm_squared() <= radius * radius)
            .copied()
            .collect()
    }

    /// Type 0 matches every object.
    fn nearby_objects(&self, center: &Vec3, radius: f32, object_type: i32) -> Vec<Vec3> {
        self.objects
            .iter()
            .filter(|o| object_type == 0 || o.object_type == object_type)
            .filter(|o| (o.position - center).norm_squared() <= radius * radius)
            .map(|o| o.position)
            .collect()
    }

    fn shoot_spots(&self, center: &Vec3, radius: f32) -> Vec<Vec3> {
        self.shoot_spots
            .iter()
            .filter(|p| (*p - center).norm_squared() <= radius * radius)
            .copied()
            .collect()
    }
}

// ============================================================================
// Scenario file
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioUnit {
    pub agent: AgentId,
    #[serde(default = "default_properties")]
    pub properties: UnitProperties,
    #[serde(default)]
    pub soldier_class: SoldierClass,
    /// Preferred distance to the target, 0 = config default.
    #[serde(default)]
    pub distance: f32,
}

/// Tactic the scenario issues on frame 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioTactic {
    Search {
        enemy_pos: Vec3,
        #[serde(default)]
        radius: f32,
        #[serde(default)]
        object_type: i32,
        #[serde(default = "default_properties")]
        unit_properties: UnitProperties,
    },
    SwitchPositions {
        #[serde(default)]
        formation: String,
        /// Seconds without a target before failing, 0 = config default.
        #[serde(default)]
        duration: f32,
        #[serde(default)]
        size: f32,
        #[serde(default)]
        min_distance: f32,
        #[serde(default = "default_properties")]
        unit_properties: UnitProperties,
    },
}

impl ScenarioTactic {
    pub fn to_params(&self) -> LeaderActionParams {
        match self {
            ScenarioTactic::Search { enemy_pos, radius, object_type, unit_properties } => {
                let mut params = LeaderActionParams::search(*enemy_pos, *radius)
                    .with_unit_properties(*unit_properties);
                params.i_value = *object_type;
                params
            }
            ScenarioTactic::SwitchPositions {
                formation,
                duration,
                size,
                min_distance,
                unit_properties,
            } => {
                let mut params = LeaderActionParams::switch_positions(formation)
                    .with_duration(*duration)
                    .with_unit_properties(*unit_properties);
                params.size = *size;
                params.f_value = *min_distance;
                params
            }
        }
    }
}

/// Something that happens at the start of a frame, before the update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioEvent {
    Signal {
        frame: u32,
        name: String,
        sender: AgentId,
        #[serde(default)]
        data: SignalData,
    },
    TaskExecuted {
        frame: u32,
        agent: AgentId,
    },
    MoveAgent {
        frame: u32,
        agent: AgentId,
        position: Vec3,
    },
    KillAgent {
        frame: u32,
        agent: AgentId,
    },
    SetTarget {
        frame: u32,
        agent: AgentId,
        #[serde(default)]
        target: Option<ScenarioTarget>,
    },
    RemoveUnit {
        frame: u32,
        agent: AgentId,
    },
}

impl ScenarioEvent {
    pub fn frame(&self) -> u32 {
        match self {
            ScenarioEvent::Signal { frame, .. }
            | ScenarioEvent::TaskExecuted { frame, .. }
            | ScenarioEvent::MoveAgent { frame, .. }
            | ScenarioEvent::KillAgent { frame, .. }
            | ScenarioEvent::SetTarget { frame, .. }
            | ScenarioEvent::RemoveUnit { frame, .. } => *frame,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedStatus {
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAssertion {
    /// Outbound signal name.
    pub signal: String,
    #[serde(default)]
    pub to: Option<AgentId>,
    #[serde(default)]
    pub count_min: Option<u32>,
    #[serde(default)]
    pub count_max: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub config: TacticsConfig,
    #[serde(default)]
    pub leader_agent: Option<AgentId>,
    pub world: ScenarioWorld,
    pub squad: Vec<ScenarioUnit>,
    pub tactic: ScenarioTactic,
    pub frames: u32,
    #[serde(default = "default_dt")]
    pub dt: f32,
    /// Agents report completion of a blocking order one frame after receiving it.
    #[serde(default)]
    pub auto_complete_tasks: bool,
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
    #[serde(default)]
    pub expect_status: Option<ExpectedStatus>,
    #[serde(default)]
    pub assertions: Vec<ScenarioAssertion>,
}

impl ScenarioSpec {
    pub fn from_yaml_str(text: &str) -> std::result::Result<Self, ScenarioError> {
        let spec: Self = serde_yaml::from_str(text)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn from_json_str(text: &str) -> std::result::Result<Self, ScenarioError> {
        let spec: Self = serde_json::from_str(text)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Loads a `.json` file as JSON, anything else as YAML.
    pub fn load_from_path(path: impl AsRef<Path>) -> std::result::Result<Self, ScenarioError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ScenarioError> {
        if self.frames == 0 {
            return Err(ScenarioError::Invalid("frames must be positive".to_string()));
        }
        if self.dt.is_nan() || self.dt <= 0.0 {
            return Err(ScenarioError::Invalid(format!("dt must be positive, got {}", self.dt)));
        }
        if self.squad.is_empty() {
            return Err(ScenarioError::Invalid("squad is empty".to_string()));
        }
        for (i, unit) in self.squad.iter().enumerate() {
            if self.squad[..i].iter().any(|u| u.agent == unit.agent) {
                return Err(ScenarioError::Invalid(format!("{} listed twice", unit.agent)));
            }
            if !self.world.agents.iter().any(|a| a.id == unit.agent) {
                return Err(ScenarioError::Invalid(format!("{} is not in the world", unit.agent)));
            }
        }
        if let Some(leader) = self.leader_agent {
            if !self.world.agents.iter().any(|a| a.id == leader) {
                return Err(ScenarioError::Invalid(format!("leader {} is not in the world", leader)));
            }
        }
        self.config
            .validate()
            .map_err(|e| ScenarioError::Invalid(e.to_string()))?;
        Ok(())
    }

    /// Squad leader with the scenario's config and roster, no tactic yet.
    pub fn build_leader(&self) -> Result<SquadLeader> {
        let mut leader = SquadLeader::new(self.config.clone());
        if let Some(agent) = self.leader_agent {
            leader = leader.with_leader_agent(agent);
        }
        for unit in &self.squad {
            let state = leader.add_unit(unit.agent, unit.properties)?;
            state.soldier_class = unit.soldier_class;
            state.distance = unit.distance;
        }
        Ok(leader)
    }
}

// ============================================================================
// Runner
// ============================================================================

/// An outbound signal with the frame it was emitted on (0 = tactic start).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSignal {
    pub frame: u32,
    pub signal: AgentSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub id: String,
    pub frames_run: u32,
    /// Last status the tactic reported.
    pub status: Option<ActionStatus>,
    pub signals: Vec<FrameSignal>,
    /// Scripted events that referenced unknown signals or agents.
    pub skipped_events: usize,
    pub assertion_failures: Vec<String>,
}

impl ScenarioReport {
    pub fn count(&self, name: &str) -> usize {
        self.signals.iter().filter(|s| s.signal.name() == name).count()
    }

    pub fn passed(&self) -> bool {
        self.assertion_failures.is_empty()
    }
}

pub struct ScenarioRunResult {
    pub report: ScenarioReport,
    pub leader: SquadLeader,
    pub world: ScenarioWorld,
}

pub fn run_scenario(spec: &ScenarioSpec) -> Result<ScenarioReport> {
    run_scenario_with_leader(spec).map(|result| result.report)
}

/// Runs the scenario and keeps the final leader and world, for snapshots.
pub fn run_scenario_with_leader(spec: &ScenarioSpec) -> Result<ScenarioRunResult> {
    let mut world = spec.world.clone();
    let mut leader = spec.build_leader()?;
    let mut sink = RecordingSink::new();
    let mut signals = Vec::new();
    let mut skipped_events = 0;
    let mut status = None;
    let mut frames_run = 0;

    log::info!("scenario '{}': {} frames at dt={}", spec.id, spec.frames, spec.dt);
    leader.start_tactic(&world, &mut sink, &spec.tactic.to_params());
    collect(&mut sink, 0, &mut signals);

    for frame in 1..=spec.frames {
        if spec.auto_complete_tasks {
            let busy: Vec<AgentId> = leader
                .roster()
                .units()
                .iter()
                .filter(|u| !u.idle())
                .map(|u| u.agent())
                .collect();
            for agent in busy {
                leader.task_executed(agent)?;
            }
        }

        for event in spec.events.iter().filter(|e| e.frame() == frame) {
            if !apply_event(event, &mut leader, &mut world, &mut sink) {
                skipped_events += 1;
            }
        }

        status = leader.update(&world, &mut sink, spec.dt);
        collect(&mut sink, frame, &mut signals);
        frames_run = frame;

        if status.as_ref().is_some_and(ActionStatus::is_finished) {
            break;
        }
    }

    let mut report = ScenarioReport {
        id: spec.id.clone(),
        frames_run,
        status,
        signals,
        skipped_events,
        assertion_failures: Vec::new(),
    };
    report.assertion_failures = check_assertions(spec, &report);

    log::info!(
        "scenario '{}' finished after {} frames: {:?}, {} signals",
        spec.id,
        report.frames_run,
        report.status,
        report.signals.len()
    );
    Ok(ScenarioRunResult { report, leader, world })
}

fn collect(sink: &mut RecordingSink, frame: u32, out: &mut Vec<FrameSignal>) {
    out.extend(sink.drain().into_iter().map(|signal| FrameSignal { frame, signal }));
}

/// Applies one scripted event. Returns `false` when it was skipped.
fn apply_event(
    event: &ScenarioEvent,
    leader: &mut SquadLeader,
    world: &mut ScenarioWorld,
    sink: &mut RecordingSink,
) -> bool {
    let applied = match event {
        ScenarioEvent::Signal { name, sender, data, .. } => {
            if InboundKind::from_name(name).is_none() {
                log::warn!("unknown signal '{}' from {}, skipped", name, sender);
                return false;
            }
            let event = SignalEvent::with_data(name.clone(), *sender, data.clone());
            leader.process_signal(world, sink, &event);
            true
        }
        ScenarioEvent::TaskExecuted { agent, .. } => leader.task_executed(*agent).is_ok(),
        ScenarioEvent::MoveAgent { agent, position, .. } => world.move_agent(*agent, *position),
        ScenarioEvent::KillAgent { agent, .. } => world.kill_agent(*agent),
        ScenarioEvent::SetTarget { agent, target, .. } => match target {
            Some(target) => world.set_target(*agent, (*target).into()),
            None => world.clear_target(*agent),
        },
        ScenarioEvent::RemoveUnit { agent, .. } => leader.remove_unit(*agent).is_ok(),
    };
    if !applied {
        log::warn!("event {:?} references an unknown agent, skipped", event);
    }
    applied
}

fn check_assertions(spec: &ScenarioSpec, report: &ScenarioReport) -> Vec<String> {
    let mut failures = Vec::new();

    if let Some(expected) = spec.expect_status {
        let matches = match (&report.status, expected) {
            (Some(ActionStatus::Running), ExpectedStatus::Running) => true,
            (Some(ActionStatus::Done), ExpectedStatus::Done) => true,
            (Some(ActionStatus::Failed(_)), ExpectedStatus::Failed) => true,
            _ => false,
        };
        if !matches {
            failures.push(format!("expected status {:?}, got {:?}", expected, report.status));
        }
    }

    for assertion in &spec.assertions {
        let count = report
            .signals
            .iter()
            .filter(|s| s.signal.name() == assertion.signal)
            .filter(|s| assertion.to.map_or(true, |to| s.signal.to == to))
            .count() as u32;
        if let Some(min) = assertion.count_min {
            if count < min {
                failures.push(format!(
                    "{}: expected at least {}, got {}",
                    assertion.signal, min, count
                ));
            }
        }
        if let Some(max) = assertion.count_max {
            if count > max {
                failures.push(format!(
                    "{}: expected at most {}, got {}",
                    assertion.signal, max, count
                ));
            }
        }
    }

    failures
}
