//! Shared fixture for tactic tests.

use super::TacticContext;
use crate::beacon::Beacon;
use crate::config::TacticsConfig;
use crate::scenario::ScenarioWorld;
use crate::services::{RecordingSink, TargetInfo, TargetKind};
use crate::types::{AgentId, Vec3};
use crate::unit::{Roster, UnitProperties};

pub(crate) struct Fixture {
    pub world: ScenarioWorld,
    pub roster: Roster,
    pub beacon: Beacon,
    pub sink: RecordingSink,
    pub config: TacticsConfig,
    pub leader_agent: Option<AgentId>,
    pub now: f32,
    pub dt: f32,
}

impl Fixture {
    /// Units are placed on the x axis, 2 m apart, in the given order.
    pub fn new(units: &[(u32, UnitProperties)]) -> Self {
        let mut world = ScenarioWorld::default();
        let mut roster = Roster::new();
        for (i, (id, props)) in units.iter().enumerate() {
            world.add_agent(AgentId(*id), Vec3::new(i as f32 * 2.0, 0.0, 0.0));
            roster.add_unit(AgentId(*id), *props).unwrap();
        }
        Self {
            world,
            roster,
            beacon: Beacon::new(),
            sink: RecordingSink::new(),
            config: TacticsConfig::default(),
            leader_agent: None,
            now: 0.0,
            dt: 0.1,
        }
    }

    pub fn ctx(&mut self) -> TacticContext<'_> {
        TacticContext {
            roster: &mut self.roster,
            beacon: &mut self.beacon,
            services: &self.world,
            sink: &mut self.sink,
            config: &self.config,
            leader_agent: self.leader_agent,
            now: self.now,
            dt: self.dt,
        }
    }

    /// Advances the clock by one frame and returns the context for it.
    pub fn next_frame(&mut self) -> TacticContext<'_> {
        self.now += self.dt;
        self.ctx()
    }

    /// Every unit in the fixture sees `target`.
    pub fn all_see(&mut self, target: TargetInfo) {
        for agent in self.roster.agents() {
            self.world.set_target(agent, target);
        }
    }
}

pub(crate) fn ground(n: u32) -> Vec<(u32, UnitProperties)> {
    (1..=n).map(|id| (id, UnitProperties::COMBAT_GROUND)).collect()
}

pub(crate) fn hostile(id: u32, position: Vec3) -> TargetInfo {
    TargetInfo {
        id: Some(AgentId(id)),
        position,
        direction: Vec3::zeros(),
        kind: TargetKind::Live,
        hostile: true,
        alive: true,
        vehicle: false,
    }
}

/// Hostile target with no entity behind it; never the subject of a special action.
pub(crate) fn anonymous(position: Vec3) -> TargetInfo {
    TargetInfo { id: None, ..hostile(0, position) }
}
