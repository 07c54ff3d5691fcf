//! # Attack / SwitchPositions
//!
//! Rotates squad members through formation points and shoot spots around
//! the beacon while keeping them out of danger zones, and grants exclusive
//! special actions on hostile targets.
//!
//! ## Update pass
//! 1. Age danger points
//! 2. Refresh the beacon from the live group targets (or count time without one)
//! 3. Create or rescale the formation, recompute candidate points
//! 4. Free points held by units that died or left the squad
//! 5. Track nav types, behind/far state and target acquisition per unit
//! 6. Arbitrate special actions
//! 7. Assign points to idle or moving units when assignment is stale
//!
//! The tactic never finishes on its own: it fails after losing the group
//! target for longer than its time limit, or runs until replaced.

mod points;
mod special;
mod types;

pub use types::{DangerPoint, PointProperties, SpecialAction, SpecialActionStatus, TargetData};

use std::collections::BTreeSet;

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::attack::AttackState;
use super::common::{available_agent, live_group_targets};
use super::{ActionStatus, LeaderActionParams, TacticBase, TacticContext};
use crate::config::TacticsConfig;
use crate::error::TacticFailure;
use crate::formation::Formation;
use crate::services::TargetInfo;
use crate::signals::{InboundKind, Outbound, SignalData, SignalEvent};
use crate::types::{dist_2d_sq, is_zero, safe_normalize, AgentId, NavType, Vec3};
use crate::unit::UnitAction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchPositionsTactic {
    base: TacticBase,
    attack: AttackState,
    formation_descriptor: String,
    formation: Option<Formation>,
    /// Formation radius requested by the director, 0 = template size.
    formation_size: f32,
    /// Formation points first, shoot spots from `shoot_spot_start` on.
    points: Vec<PointProperties>,
    shoot_spot_start: usize,
    points_assigned: bool,
    /// Resend orders even to units keeping their point.
    reapproach: bool,
    min_distance_to_target: f32,
    danger_points: Vec<DangerPoint>,
    special_actions: Vec<SpecialAction>,
    target_data: FxHashMap<AgentId, TargetData>,
    forbidden_spots: FxHashMap<AgentId, Vec<Vec3>>,
    back_off: BTreeSet<AgentId>,
    acquire_sent: BTreeSet<AgentId>,
    last_scale_update: f32,
    last_pivot: Vec3,
}

impl SwitchPositionsTactic {
    pub fn new(params: &LeaderActionParams, config: &TacticsConfig) -> Self {
        let cfg = &config.switch_positions;
        let formation_descriptor = if params.name.is_empty() {
            cfg.formation_descriptor.clone()
        } else {
            params.name.clone()
        };

        Self {
            base: TacticBase::from_params(params),
            attack: AttackState::new(params, cfg.target_lost_time_limit),
            formation_descriptor,
            formation: None,
            formation_size: params.size,
            points: Vec::new(),
            shoot_spot_start: 0,
            points_assigned: false,
            reapproach: false,
            min_distance_to_target: if params.f_value > 0.0 {
                params.f_value
            } else {
                cfg.min_distance_to_target
            },
            danger_points: Vec::new(),
            special_actions: Vec::new(),
            target_data: FxHashMap::default(),
            forbidden_spots: FxHashMap::default(),
            back_off: BTreeSet::new(),
            acquire_sent: BTreeSet::new(),
            last_scale_update: 0.0,
            last_pivot: Vec3::zeros(),
        }
    }

    pub fn base(&self) -> &TacticBase {
        &self.base
    }

    pub fn attack(&self) -> &AttackState {
        &self.attack
    }

    pub fn formation(&self) -> Option<&Formation> {
        self.formation.as_ref()
    }

    pub fn points(&self) -> &[PointProperties] {
        &self.points
    }

    pub fn danger_points(&self) -> &[DangerPoint] {
        &self.danger_points
    }

    pub fn special_actions(&self) -> &[SpecialAction] {
        &self.special_actions
    }

    pub fn forbidden_spots(&self, agent: AgentId) -> &[Vec3] {
        self.forbidden_spots.get(&agent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn min_distance_to_target(&self) -> f32 {
        self.min_distance_to_target
    }

    pub fn points_assigned(&self) -> bool {
        self.points_assigned
    }

    pub fn target_data(&self, agent: AgentId) -> Option<&TargetData> {
        self.target_data.get(&agent)
    }

    pub fn update(&mut self, ctx: &mut TacticContext<'_>) -> ActionStatus {
        let config = ctx.config;
        let cfg = &config.switch_positions;
        let mask = self.base.unit_properties;

        self.attack.tick(ctx.dt);
        self.prune_danger_points(ctx.dt);

        let targets = live_group_targets(ctx, mask);
        if targets.is_empty() {
            if !self.attack.no_target && self.attack.initialized {
                self.notify_no_group_target(ctx);
            }
            if self.attack.target_missing(ctx.dt) {
                log::info!(
                    "switch positions lost the group target for {:.1}s",
                    self.attack.time_without_target
                );
                return ActionStatus::Failed(TacticFailure::TargetLostTimeout);
            }
            if !self.attack.initialized {
                return ActionStatus::Running;
            }
        } else {
            self.attack.target_seen();
            let positions: Vec<Vec3> = targets.iter().map(|t| t.position).collect();
            let direction = targets.iter().map(|t| t.direction).find(|d| !is_zero(d));
            ctx.beacon.update_from(&positions, direction, ctx.now);
        }

        let Some(beacon) = ctx.beacon.position() else {
            log::warn!("switch positions has no beacon position");
            return ActionStatus::Failed(TacticFailure::BeaconUnavailable);
        };
        self.attack.enemy_pos = beacon;

        if !self.attack.initialized {
            let Some(formation) = Formation::create(&self.formation_descriptor, beacon) else {
                log::warn!("unknown formation '{}'", self.formation_descriptor);
                return ActionStatus::Failed(TacticFailure::FormationUnavailable(
                    self.formation_descriptor.clone(),
                ));
            };
            self.formation = Some(formation);
            self.update_scale(cfg, &targets, beacon);
            self.compute_points(ctx, beacon);
            self.last_scale_update = ctx.now;
            self.last_pivot = beacon;
            self.attack.initialized = true;
            self.points_assigned = false;
            log::info!(
                "switch positions started: formation '{}' with {} points",
                self.formation_descriptor,
                self.points.len()
            );
        } else {
            let mut recompute = dist_2d_sq(&beacon, &self.last_pivot) > cfg.beacon_shift_threshold_sq;
            if !targets.is_empty() && ctx.now - self.last_scale_update >= cfg.scale_update_interval {
                self.last_scale_update = ctx.now;
                recompute |= self.update_scale(cfg, &targets, beacon);
            }
            if recompute {
                self.compute_points(ctx, beacon);
                self.last_pivot = beacon;
                self.force_reapproach();
            }
        }

        self.release_lost_owners(ctx);
        if !self.danger_points.is_empty() {
            self.points_assigned = false;
        }

        self.track_units(ctx, beacon, &targets);
        self.update_special_actions(ctx, &targets);

        if !self.points_assigned || self.reapproach {
            self.assign_points(ctx, beacon);
        }

        ActionStatus::Running
    }

    pub fn process_signal(&mut self, ctx: &mut TacticContext<'_>, event: &SignalEvent) -> bool {
        let Some(kind) = event.kind() else {
            return false;
        };
        let sender = event.sender;
        let data = &event.data;

        match kind {
            InboundKind::FormationPointReached => {
                if let Some(unit) = ctx.roster.get_mut(sender) {
                    unit.clear_moving();
                }
                self.back_off.remove(&sender);
            }
            InboundKind::AttackOrder => self.replay_order(ctx, sender),
            InboundKind::RequestUpdate => {
                if data.i_value != 0 {
                    self.back_off.insert(sender);
                }
                if let Some(unit) = ctx.roster.get_mut(sender) {
                    if !is_zero(&data.point) {
                        unit.tag_point = data.point;
                    }
                }
                self.points_assigned = false;
            }
            InboundKind::RequestUpdateAlternative => {
                if let Some(index) = ctx.roster.get(sender).and_then(|u| u.formation_index) {
                    if let Some(point) = self.points.get(index) {
                        self.forbidden_spots.entry(sender).or_default().push(point.position);
                    }
                }
                self.release_unit_point(ctx, sender);
                self.points_assigned = false;
            }
            InboundKind::ClearSpotList => {
                self.forbidden_spots.remove(&sender);
            }
            InboundKind::RequestUpdateTowards => {
                let nominal = self.nominal_distance(ctx, sender);
                let position = ctx.services.agent(sender).map(|info| info.position);
                if let (Some(position), Some(unit)) = (position, ctx.roster.get_mut(sender)) {
                    let dir = safe_normalize(&data.point);
                    unit.tag_point = position + dir * nominal;
                }
                self.release_unit_point(ctx, sender);
                self.points_assigned = false;
            }
            InboundKind::CheckDeadTarget => self.check_dead_target(ctx, sender, data),
            InboundKind::AddDangerPoint => {
                let duration = if data.i_value > 0 {
                    data.i_value as f32
                } else {
                    ctx.config.switch_positions.danger_point_duration
                };
                self.add_danger_point(ctx, data.point, data.f_value, duration);
            }
            InboundKind::SetDistanceToTarget => {
                if let Some(unit) = ctx.roster.get_mut(sender) {
                    unit.distance = data.f_value;
                }
                self.points_assigned = false;
            }
            InboundKind::ExecutingSpecialAction => self.confirm_special_action(ctx, sender),
            InboundKind::SpecialActionDone => self.finish_special_action(ctx, sender),
            InboundKind::SetMinDistanceToTarget => {
                self.min_distance_to_target = data.f_value;
                self.points_assigned = false;
            }
            InboundKind::UnitMoving
            | InboundKind::UnitStop
            | InboundKind::UnitDamaged
            | InboundKind::SearchOrder => return false,
        }
        true
    }

    /// Releases every point and tells the commanded units to stop firing.
    pub fn on_exit(&mut self, ctx: &mut TacticContext<'_>) {
        if let Some(formation) = self.formation.as_mut() {
            formation.release_all();
        }
        self.formation = None;
        self.points.clear();

        for action in self.special_actions.iter_mut().filter(|a| a.is_active()) {
            if let Some(unit) = action.owner.and_then(|o| ctx.roster.get_mut(o)) {
                unit.set_special(false);
            }
            action.switch_off(ctx.now);
        }
        for unit in ctx.roster.units_mut() {
            unit.formation_index = None;
        }

        self.attack.notify_fire_disabled(ctx, self.base.unit_properties);
        log::info!("switch positions ended after {:.1}s", self.attack.time_running);
    }

    fn notify_no_group_target(&self, ctx: &mut TacticContext<'_>) {
        let mask = self.base.unit_properties;
        let agents: Vec<AgentId> = ctx
            .roster
            .units()
            .iter()
            .filter(|u| available_agent(ctx, u, mask).is_some())
            .map(|u| u.agent())
            .collect();
        let data = SignalData::with_point(self.attack.enemy_pos);
        for agent in agents {
            ctx.sink.send_to(agent, Outbound::NoGroupTarget, data.clone());
        }
    }

    /// Resends the order for the point the unit holds, or queues a fresh assignment.
    fn replay_order(&mut self, ctx: &mut TacticContext<'_>, agent: AgentId) {
        let Some(index) = ctx.roster.index_of(agent) else {
            return;
        };
        let holding = ctx.roster.unit_at(index).formation_index;
        match (holding, ctx.beacon.position()) {
            (Some(point_index), Some(beacon)) if point_index < self.points.len() => {
                self.send_point_order(ctx, index, point_index, beacon);
            }
            _ => self.points_assigned = false,
        }
    }

    fn check_dead_target(&mut self, ctx: &mut TacticContext<'_>, sender: AgentId, data: &SignalData) {
        let targets = live_group_targets(ctx, self.base.unit_properties);
        if !targets.is_empty() {
            self.points_assigned = false;
            return;
        }
        let point = ctx.services.last_known_player_position().unwrap_or(data.point);
        ctx.sink.send_to(sender, Outbound::CheckDeadBody, SignalData::with_point(point));
    }

    fn track_units(&mut self, ctx: &mut TacticContext<'_>, beacon: Vec3, targets: &[TargetInfo]) {
        let mask = self.base.unit_properties;
        let services = ctx.services;
        let far_sq = ctx.config.switch_positions.leader_too_far_distance.powi(2);
        let beacon_dir = ctx.beacon.direction().filter(|d| !is_zero(d));
        let leader = ctx.leader_agent.and_then(|id| services.agent(id));

        for index in 0..ctx.roster.len() {
            let unit = ctx.roster.unit_at(index);
            let Some(info) = available_agent(ctx, unit, mask) else {
                continue;
            };
            let agent = info.id;
            let was_behind = unit.is_behind();
            let was_far = unit.is_far();

            let nav = services.nav_info(&info.position).nav_type;
            let live_target = info.attention_target.filter(TargetInfo::is_live_hostile);
            let tracked = self.target_data.entry(agent).or_default();

            if tracked.nav_type != nav {
                if tracked.nav_type != NavType::Unset {
                    let data = SignalData {
                        i_value: nav.code(),
                        i_value2: tracked.nav_type.code(),
                        ..SignalData::default()
                    };
                    ctx.sink.send_to(agent, Outbound::NavTypeChanged, data);
                }
                tracked.nav_type = nav;
            }

            if let Some(target) = live_target {
                let target_nav = services.nav_info(&target.position).nav_type;
                if tracked.target_nav_type != target_nav {
                    if tracked.target_nav_type != NavType::Unset {
                        let data = SignalData {
                            i_value: target_nav.code(),
                            i_value2: tracked.target_nav_type.code(),
                            point: target.position,
                            ..SignalData::default()
                        };
                        ctx.sink.send_to(agent, Outbound::TargetNavTypeChanged, data);
                    }
                    tracked.target_nav_type = target_nav;
                }
            }
            tracked.target = live_target.and_then(|t| t.id);

            if let Some(dir) = beacon_dir {
                let behind = dir.dot(&(info.position - beacon)) < 0.0;
                if behind != was_behind {
                    let signal = if behind { Outbound::Behind } else { Outbound::NotBehind };
                    ctx.sink.send_to(agent, signal, SignalData::with_point(beacon));
                    ctx.roster.unit_at_mut(index).set_behind(behind);
                }
            }

            if let Some(leader) = leader.filter(|l| l.id != agent) {
                let far = dist_2d_sq(&info.position, &leader.position) > far_sq;
                if far && !was_far {
                    ctx.sink.send_to(
                        agent,
                        Outbound::LeaderTooFar,
                        SignalData::with_point(leader.position),
                    );
                }
                ctx.roster.unit_at_mut(index).set_far(far);
            }

            if live_target.is_some() {
                self.acquire_sent.remove(&agent);
            } else if !self.acquire_sent.contains(&agent) {
                let nearest = targets
                    .iter()
                    .filter_map(|t| t.id.map(|id| (id, t.position)))
                    .min_by(|a, b| {
                        let da = dist_2d_sq(&a.1, &info.position);
                        let db = dist_2d_sq(&b.1, &info.position);
                        da.total_cmp(&db)
                    });
                if let Some((id, position)) = nearest {
                    ctx.roster.push_action_at(index, UnitAction::acquire_target(id, position));
                    ctx.roster.execute_task_at(index, ctx.sink);
                    self.acquire_sent.insert(agent);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tactics::testing::{anonymous, ground, hostile, Fixture};
    use crate::types::NavInfo;
    use crate::unit::UnitProperties;

    fn start(fx: &mut Fixture, tactic: &mut SwitchPositionsTactic) -> ActionStatus {
        tactic.update(&mut fx.ctx())
    }

    #[test]
    fn test_fails_without_target_after_time_limit() {
        let mut fx = Fixture::new(&ground(2));
        fx.dt = 0.5;
        let params = LeaderActionParams::switch_positions("attack_ring").with_duration(1.0);
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);

        assert_eq!(tactic.update(&mut fx.next_frame()), ActionStatus::Running);
        assert_eq!(tactic.update(&mut fx.next_frame()), ActionStatus::Running);
        assert_eq!(
            tactic.update(&mut fx.next_frame()),
            ActionStatus::Failed(TacticFailure::TargetLostTimeout)
        );
    }

    #[test]
    fn test_unknown_formation_fails() {
        let mut fx = Fixture::new(&ground(2));
        fx.all_see(hostile(100, Vec3::new(0.0, 30.0, 0.0)));
        let params = LeaderActionParams::switch_positions("wedge");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);

        assert_eq!(
            start(&mut fx, &mut tactic),
            ActionStatus::Failed(TacticFailure::FormationUnavailable("wedge".to_string()))
        );
    }

    #[test]
    fn test_first_update_assigns_distinct_points() {
        let mut fx = Fixture::new(&ground(4));
        let enemy = Vec3::new(0.0, 30.0, 0.0);
        fx.all_see(anonymous(enemy));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);

        assert_eq!(start(&mut fx, &mut tactic), ActionStatus::Running);

        assert_eq!(fx.beacon.position(), Some(enemy));
        assert!(tactic.points_assigned());
        let mut indices: Vec<usize> =
            fx.roster.units().iter().filter_map(|u| u.formation_index).collect();
        assert_eq!(indices.len(), 4);
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), 4);
        assert_eq!(fx.sink.count("OnAttackSwitchPosition"), 4);
        for index in indices {
            let owner = tactic.points()[index].owner;
            assert!(owner.is_some());
            assert_eq!(tactic.formation().unwrap().owner(index), owner);
        }
    }

    #[test]
    fn test_no_group_target_sent_once() {
        let mut fx = Fixture::new(&ground(2));
        fx.all_see(hostile(100, Vec3::new(0.0, 30.0, 0.0)));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);
        tactic.update(&mut fx.next_frame());

        for agent in fx.roster.agents() {
            fx.world.clear_target(agent);
        }
        tactic.update(&mut fx.next_frame());
        tactic.update(&mut fx.next_frame());

        assert_eq!(fx.sink.count("OnNoGroupTarget"), 2);
        assert!(tactic.attack().no_target);
    }

    #[test]
    fn test_nav_type_change_reported() {
        let mut fx = Fixture::new(&ground(1));
        fx.all_see(hostile(100, Vec3::new(0.0, 30.0, 0.0)));
        fx.world.default_nav = NavInfo { nav_type: NavType::Triangular, building_id: -1 };
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);

        tactic.update(&mut fx.next_frame());
        assert_eq!(fx.sink.count("OnNavTypeChanged"), 0);

        fx.world.default_nav = NavInfo { nav_type: NavType::WaypointHuman, building_id: 3 };
        tactic.update(&mut fx.next_frame());

        let sent = fx.sink.sent_to(AgentId(1), "OnNavTypeChanged");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].data.i_value, NavType::WaypointHuman.code());
        assert_eq!(sent[0].data.i_value2, NavType::Triangular.code());
        assert_eq!(fx.sink.count("OnTargetNavTypeChanged"), 1);
        assert_eq!(
            tactic.target_data(AgentId(1)).map(|d| d.nav_type),
            Some(NavType::WaypointHuman)
        );
    }

    #[test]
    fn test_behind_tracking_follows_target_facing() {
        let mut fx = Fixture::new(&ground(1));
        let mut target = hostile(100, Vec3::new(0.0, 30.0, 0.0));
        target.direction = Vec3::new(0.0, 1.0, 0.0);
        fx.all_see(target);
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);

        tactic.update(&mut fx.next_frame());

        // The unit sits at the origin, the enemy faces away from it.
        assert!(fx.roster.unit_at(0).is_behind());
        assert_eq!(fx.sink.count("OnBehind"), 1);

        target.direction = Vec3::new(0.0, -1.0, 0.0);
        fx.all_see(target);
        tactic.update(&mut fx.next_frame());
        assert!(!fx.roster.unit_at(0).is_behind());
        assert_eq!(fx.sink.count("OnNotBehind"), 1);
    }

    #[test]
    fn test_leader_too_far_sent_on_entering_far() {
        let mut fx = Fixture::new(&ground(2));
        fx.all_see(hostile(100, Vec3::new(0.0, 30.0, 0.0)));
        fx.world.add_agent(AgentId(50), Vec3::new(100.0, 0.0, 0.0));
        fx.leader_agent = Some(AgentId(50));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);

        tactic.update(&mut fx.next_frame());
        tactic.update(&mut fx.next_frame());

        assert_eq!(fx.sink.count("OnLeaderTooFar"), 2);
        assert!(fx.roster.units().iter().all(|u| u.is_far()));

        fx.world.move_agent(AgentId(50), Vec3::new(1.0, 0.0, 0.0));
        tactic.update(&mut fx.next_frame());
        assert!(fx.roster.units().iter().all(|u| !u.is_far()));
    }

    #[test]
    fn test_acquire_target_ordered_for_unaware_units() {
        let mut fx = Fixture::new(&ground(2));
        fx.world.set_target(AgentId(1), hostile(100, Vec3::new(0.0, 30.0, 0.0)));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);

        tactic.update(&mut fx.next_frame());
        tactic.update(&mut fx.next_frame());

        let orders = fx.sink.sent_to(AgentId(2), "ORDER_ACQUIRE_TARGET");
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].data.n_id, 100);
        assert!(fx.sink.sent_to(AgentId(1), "ORDER_ACQUIRE_TARGET").is_empty());
    }

    #[test]
    fn test_set_min_distance_and_unknown_signals() {
        let mut fx = Fixture::new(&ground(1));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);

        let event = SignalEvent::with_data(
            "SetMinDistanceToTarget",
            AgentId(1),
            SignalData::with_float(9.0),
        );
        assert!(tactic.process_signal(&mut fx.ctx(), &event));
        assert_eq!(tactic.min_distance_to_target(), 9.0);

        assert!(!tactic.process_signal(&mut fx.ctx(), &SignalEvent::new("OnUnitMoving", AgentId(1))));
        assert!(!tactic.process_signal(&mut fx.ctx(), &SignalEvent::new("Bogus", AgentId(1))));
    }

    #[test]
    fn test_set_distance_to_target_overrides_unit() {
        let mut fx = Fixture::new(&ground(1));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);

        let event =
            SignalEvent::with_data("SetDistanceToTarget", AgentId(1), SignalData::with_float(22.0));
        assert!(tactic.process_signal(&mut fx.ctx(), &event));
        assert_eq!(fx.roster.unit_at(0).distance, 22.0);
    }

    #[test]
    fn test_check_dead_target_falls_back_to_player_position() {
        let mut fx = Fixture::new(&ground(1));
        fx.world.player_position = Some(Vec3::new(7.0, 8.0, 0.0));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);

        let event = SignalEvent::new("OnCheckDeadTarget", AgentId(1));
        assert!(tactic.process_signal(&mut fx.ctx(), &event));

        let sent = fx.sink.sent_to(AgentId(1), "OnCheckDeadBody");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].data.point, Vec3::new(7.0, 8.0, 0.0));
    }

    #[test]
    fn test_check_dead_target_with_live_target_reassigns() {
        let mut fx = Fixture::new(&ground(2));
        fx.all_see(hostile(100, Vec3::new(0.0, 30.0, 0.0)));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);
        tactic.update(&mut fx.next_frame());
        assert!(tactic.points_assigned());

        let event = SignalEvent::new("OnCheckDeadTarget", AgentId(1));
        assert!(tactic.process_signal(&mut fx.ctx(), &event));

        assert!(!tactic.points_assigned());
        assert_eq!(fx.sink.count("OnCheckDeadBody"), 0);
    }

    #[test]
    fn test_attack_order_replays_current_point() {
        let mut fx = Fixture::new(&ground(1));
        fx.all_see(anonymous(Vec3::new(0.0, 30.0, 0.0)));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);
        tactic.update(&mut fx.next_frame());
        let index = fx.roster.unit_at(0).formation_index.unwrap();

        let event = SignalEvent::new("ORDER_ATTACK", AgentId(1));
        assert!(tactic.process_signal(&mut fx.ctx(), &event));

        let sent = fx.sink.sent_to(AgentId(1), "OnAttackSwitchPosition");
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].data.i_value, index as i32);
    }

    #[test]
    fn test_on_exit_releases_points_and_disables_fire() {
        let mut fx = Fixture::new(&ground(3));
        fx.all_see(hostile(100, Vec3::new(0.0, 30.0, 0.0)));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);
        tactic.update(&mut fx.next_frame());

        tactic.on_exit(&mut fx.ctx());

        assert!(tactic.formation().is_none());
        assert!(fx.roster.units().iter().all(|u| u.formation_index.is_none()));
        assert_eq!(fx.sink.count("OnFireDisabled"), 3);
    }

    #[test]
    fn test_removed_unit_point_goes_to_newcomer() {
        let mut fx = Fixture::new(&ground(8));
        let enemy = Vec3::new(0.0, 30.0, 0.0);
        fx.all_see(anonymous(enemy));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);
        tactic.update(&mut fx.next_frame());
        assert!(tactic.points().iter().any(|p| p.owner == Some(AgentId(1))));

        fx.world.kill_agent(AgentId(1));
        fx.roster.remove_unit(AgentId(1)).unwrap();
        fx.world.add_agent(AgentId(9), Vec3::new(16.0, 0.0, 0.0));
        fx.world.set_target(AgentId(9), anonymous(enemy));
        fx.roster.add_unit(AgentId(9), UnitProperties::COMBAT_GROUND).unwrap();
        assert!(tactic.process_signal(&mut fx.ctx(), &SignalEvent::new("OnRequestUpdate", AgentId(9))));
        for _ in 0..5 {
            assert_eq!(tactic.update(&mut fx.next_frame()), ActionStatus::Running);
        }

        assert!(tactic.points().iter().all(|p| p.owner != Some(AgentId(1))));
        let formation = tactic.formation().unwrap();
        assert!((0..formation.len()).all(|i| formation.owner(i) != Some(AgentId(1))));
        let index = fx.roster.get(AgentId(9)).unwrap().formation_index.unwrap();
        assert_eq!(tactic.points()[index].owner, Some(AgentId(9)));
        assert_eq!(formation.owner(index), Some(AgentId(9)));
    }

    #[test]
    fn test_dead_unit_releases_point() {
        let mut fx = Fixture::new(&ground(3));
        fx.all_see(anonymous(Vec3::new(0.0, 30.0, 0.0)));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);
        tactic.update(&mut fx.next_frame());
        assert!(fx.roster.get(AgentId(2)).unwrap().formation_index.is_some());

        fx.world.kill_agent(AgentId(2));
        tactic.update(&mut fx.next_frame());

        assert!(tactic.points().iter().all(|p| p.owner != Some(AgentId(2))));
        assert_eq!(fx.roster.get(AgentId(2)).unwrap().formation_index, None);
        assert!(fx.roster.get(AgentId(1)).unwrap().formation_index.is_some());
    }

    #[test]
    fn test_unit_removed_frees_point_immediately() {
        let mut fx = Fixture::new(&ground(2));
        fx.all_see(anonymous(Vec3::new(0.0, 30.0, 0.0)));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);
        tactic.update(&mut fx.next_frame());
        assert!(tactic.points_assigned());

        fx.roster.remove_unit(AgentId(2)).unwrap();
        tactic.unit_removed(AgentId(2));

        assert!(!tactic.points_assigned());
        assert!(tactic.points().iter().all(|p| p.owner != Some(AgentId(2))));
        assert!(tactic.points().iter().any(|p| p.owner == Some(AgentId(1))));
    }
}
