//! State shared by every attack tactic.

use serde::{Deserialize, Serialize};

use super::common::is_unit_available;
use super::{LeaderActionParams, TacticContext};
use crate::signals::{Outbound, SignalData};
use crate::types::{vec3_zero, Vec3};
use crate::unit::UnitProperties;

/// Timing and defense-point bookkeeping embedded by attack tactics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackState {
    pub initialized: bool,
    /// No live group target was seen on the last update.
    pub no_target: bool,
    pub time_running: f32,
    /// Seconds without a live group target before the tactic fails.
    pub time_limit: f32,
    pub time_without_target: f32,
    pub defense_point: Vec3,
    pub enemy_pos: Vec3,
}

impl AttackState {
    pub fn new(params: &LeaderActionParams, default_time_limit: f32) -> Self {
        Self {
            initialized: false,
            no_target: false,
            time_running: 0.0,
            time_limit: if params.duration > 0.0 { params.duration } else { default_time_limit },
            time_without_target: 0.0,
            defense_point: params.point,
            enemy_pos: vec3_zero(),
        }
    }

    pub fn tick(&mut self, dt: f32) {
        self.time_running += dt;
    }

    pub fn target_seen(&mut self) {
        self.no_target = false;
        self.time_without_target = 0.0;
    }

    /// Accumulates time without a target. Returns `true` once the limit is exceeded.
    pub fn target_missing(&mut self, dt: f32) -> bool {
        self.no_target = true;
        self.time_without_target += dt;
        self.time_without_target > self.time_limit
    }

    /// Tells every unit the tactic commanded that it may stop firing.
    pub fn notify_fire_disabled(&self, ctx: &mut TacticContext<'_>, mask: UnitProperties) {
        let agents: Vec<_> = ctx
            .roster
            .units()
            .iter()
            .filter(|u| is_unit_available(ctx, u, mask))
            .map(|u| u.agent())
            .collect();

        for agent in agents {
            ctx.sink.send_to(agent, Outbound::FireDisabled, SignalData::default());
        }
    }
}
