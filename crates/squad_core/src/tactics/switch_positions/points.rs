//! Candidate points, point selection and danger zones.

use super::{DangerPoint, PointProperties, SwitchPositionsTactic};
use crate::config::SwitchPositionsConfig;
use crate::debug_flags::tactics_debug_enabled;
use crate::services::TargetInfo;
use crate::signals::{Outbound, SignalData};
use crate::tactics::common::is_unit_available;
use crate::tactics::TacticContext;
use crate::types::{dist_2d_sq, is_zero, safe_normalize, AgentId, Vec3};
use crate::unit::UnitAction;

/// Cardinal directions the enemy spread is measured along.
const SPREAD_PROBES: [(f32, f32); 4] = [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)];

/// Two positions closer than this count as the same spot.
const SAME_SPOT_DISTANCE_SQ: f32 = 1.0;

impl SwitchPositionsTactic {
    /// Ages danger points by `dt` and drops the expired ones.
    pub(super) fn prune_danger_points(&mut self, dt: f32) {
        for danger in &mut self.danger_points {
            danger.time -= dt;
        }
        self.danger_points.retain(|d| !d.expired());
    }

    /// Adds a danger zone. Units already inside stop following and moving
    /// and are told to get out.
    pub fn add_danger_point(
        &mut self,
        ctx: &mut TacticContext<'_>,
        point: Vec3,
        radius: f32,
        duration: f32,
    ) {
        let danger = DangerPoint::new(point, radius, duration);

        for index in 0..ctx.roster.len() {
            let agent = ctx.roster.unit_at(index).agent();
            let Some(info) = ctx.services.agent(agent) else {
                continue;
            };
            if !danger.contains(&info.position) {
                continue;
            }
            let unit = ctx.roster.unit_at_mut(index);
            unit.clear_following();
            unit.clear_moving();
            let data = SignalData { point, f_value: radius, ..SignalData::default() };
            ctx.sink.send_to(agent, Outbound::AvoidDanger, data);
        }

        log::debug!(
            "danger point at ({:.1}, {:.1}) r={:.1} for {:.1}s",
            point.x,
            point.y,
            radius,
            duration
        );
        self.danger_points.push(danger);
        self.points_assigned = false;
    }

    /// Fits the formation scale to the enemy spread. Returns `true` when the
    /// scale moved by more than the configured threshold.
    pub(super) fn update_scale(
        &mut self,
        cfg: &SwitchPositionsConfig,
        targets: &[TargetInfo],
        beacon: Vec3,
    ) -> bool {
        let initialized = self.attack.initialized;
        let Some(formation) = self.formation.as_mut() else {
            return false;
        };
        let base = formation.base_size();
        if base <= 0.0 {
            return false;
        }
        let nominal = if self.formation_size > 0.0 { self.formation_size } else { base };

        let spread = SPREAD_PROBES
            .iter()
            .map(|(px, py)| {
                targets
                    .iter()
                    .map(|t| (t.position.x - beacon.x) * px + (t.position.y - beacon.y) * py)
                    .fold(0.0f32, f32::max)
            })
            .fold(0.0f32, f32::max);

        let scale = ((nominal + spread) / base).clamp(cfg.min_scale, cfg.max_scale);
        let changed = (scale - formation.scale()).abs() > cfg.scale_change_threshold;
        if changed || !initialized {
            formation.set_scale(scale);
        }
        changed
    }

    /// Rebuilds the candidate list around `beacon`. Formation points keep
    /// their owners; shoot spots keep theirs when the spot is still offered.
    pub(super) fn compute_points(&mut self, ctx: &mut TacticContext<'_>, beacon: Vec3) {
        let Some(formation) = self.formation.as_mut() else {
            return;
        };
        formation.set_pivot(beacon);

        let previous = std::mem::take(&mut self.points);
        for index in 0..formation.len() {
            if let Some(position) = formation.point(index) {
                let mut point = PointProperties::new(position, false);
                point.owner = formation.owner(index);
                self.points.push(point);
            }
        }
        self.shoot_spot_start = self.points.len();

        let radius = ctx.config.switch_positions.shoot_spot_radius;
        for position in ctx.services.shoot_spots(&beacon, radius) {
            let mut point = PointProperties::new(position, true);
            point.owner = previous
                .iter()
                .find(|p| p.shoot_spot && p.position == position)
                .and_then(|p| p.owner);
            self.points.push(point);
        }

        for unit in ctx.roster.units_mut() {
            let agent = unit.agent();
            unit.formation_index = self.points.iter().position(|p| p.owner == Some(agent));
        }
    }

    /// Every unit gets its order again on the next assignment pass.
    pub(super) fn force_reapproach(&mut self) {
        self.reapproach = true;
        self.points_assigned = false;
    }

    pub(super) fn nominal_distance(&self, ctx: &TacticContext<'_>, agent: AgentId) -> f32 {
        ctx.roster
            .get(agent)
            .map(|u| u.distance)
            .filter(|d| *d > 0.0)
            .unwrap_or(ctx.config.switch_positions.default_distance_to_target)
    }

    /// Gives up whatever point `agent` holds.
    pub(super) fn release_unit_point(&mut self, ctx: &mut TacticContext<'_>, agent: AgentId) {
        self.free_points_of(agent);
        if let Some(unit) = ctx.roster.get_mut(agent) {
            unit.formation_index = None;
        }
    }

    fn free_points_of(&mut self, agent: AgentId) {
        for point in self.points.iter_mut().filter(|p| p.owner == Some(agent)) {
            point.owner = None;
        }
        if let Some(formation) = self.formation.as_mut() {
            formation.free_points_of(agent);
        }
    }

    /// Forgets a unit that already left the roster.
    pub fn unit_removed(&mut self, agent: AgentId) {
        if self.points.iter().any(|p| p.owner == Some(agent)) {
            self.points_assigned = false;
        }
        self.free_points_of(agent);
        self.target_data.remove(&agent);
        self.forbidden_spots.remove(&agent);
        self.back_off.remove(&agent);
        self.acquire_sent.remove(&agent);
    }

    /// Frees the points of owners that left the roster or can no longer be
    /// commanded, and drops per-unit bookkeeping for units that left.
    pub(super) fn release_lost_owners(&mut self, ctx: &mut TacticContext<'_>) {
        let mask = self.base.unit_properties;
        let view: &TacticContext<'_> = ctx;
        let mut lost: Vec<AgentId> = self
            .points
            .iter()
            .filter_map(|p| p.owner)
            .filter(|&owner| {
                view.roster.get(owner).map_or(true, |unit| !is_unit_available(view, unit, mask))
            })
            .collect();
        lost.sort_unstable();
        lost.dedup();

        for agent in lost {
            log::debug!("{} lost its formation point", agent);
            self.release_unit_point(ctx, agent);
            self.points_assigned = false;
        }

        let roster = &*ctx.roster;
        self.target_data.retain(|agent, _| roster.contains(*agent));
        self.forbidden_spots.retain(|agent, _| roster.contains(*agent));
        self.back_off.retain(|agent| roster.contains(*agent));
        self.acquire_sent.retain(|agent| roster.contains(*agent));
    }

    fn claim_point(&mut self, index: usize, agent: AgentId) {
        for point in self.points.iter_mut().filter(|p| p.owner == Some(agent)) {
            point.owner = None;
        }
        self.points[index].owner = Some(agent);

        if let Some(formation) = self.formation.as_mut() {
            formation.free_points_of(agent);
            if index < self.shoot_spot_start {
                formation.set_owner(index, agent);
            }
        }
    }

    /// Whether `point` may be handed to `agent` at all, ignoring danger and visibility.
    fn admissible(&self, point: &PointProperties, agent: AgentId, beacon: &Vec3) -> bool {
        if point.is_owned_by_other(agent) {
            return false;
        }
        let min = self.min_distance_to_target;
        if dist_2d_sq(&point.position, beacon) < min * min {
            return false;
        }
        let forbidden = self.forbidden_spots.get(&agent);
        !forbidden.is_some_and(|spots| {
            spots.iter().any(|s| dist_2d_sq(s, &point.position) < SAME_SPOT_DISTANCE_SQ)
        })
    }

    /// Picks the best point for the unit at `unit_index`.
    ///
    /// Candidates owned by another unit, too close to the target, forbidden
    /// for this unit, inside a danger zone or reached through one are
    /// skipped, as are points with no line of sight to the target. The rest
    /// are scored by deviation from the unit's nominal distance plus a
    /// continuity term toward its last tag point; a unit asked to back off
    /// earns a bonus for points on its own side of the target. The lowest
    /// cost wins, first one on ties. With no candidate the unit keeps its
    /// current point if that one is still admissible.
    pub fn formation_point_with_target(
        &mut self,
        ctx: &TacticContext<'_>,
        unit_index: usize,
        beacon: Vec3,
    ) -> Option<usize> {
        let cfg = &ctx.config.switch_positions;
        let unit = ctx.roster.unit_at(unit_index);
        let agent = unit.agent();
        let info = ctx.services.agent(agent)?;

        let nominal = if unit.distance > 0.0 { unit.distance } else { cfg.default_distance_to_target };
        let tag_point = unit.tag_point;
        let current = unit.formation_index;
        let backing_off = self.back_off.contains(&agent);
        let unit_side = safe_normalize(&(info.position - beacon));
        let eye = Vec3::new(0.0, 0.0, cfg.eye_height);
        let target_eye = beacon + eye;

        let mut best: Option<(usize, f32)> = None;

        for index in 0..self.points.len() {
            let point = self.points[index];
            if !self.admissible(&point, agent, &beacon) {
                continue;
            }
            let endangered = self.danger_points.iter().any(|d| {
                d.contains(&point.position)
                    || (!d.contains(&info.position) && d.crosses(&info.position, &point.position))
            });
            if endangered {
                continue;
            }

            let slot = &mut self.points[index];
            if !slot.visibility_checked {
                slot.target_visible = ctx.services.line_of_sight(&(slot.position + eye), &target_eye);
                slot.visibility_checked = true;
            }
            if !slot.target_visible {
                continue;
            }

            let distance = (point.position - beacon).norm();
            let mut cost = (distance - nominal).abs();
            if !is_zero(&tag_point) {
                cost += cfg.continuity_weight * (point.position - tag_point).norm();
            }
            if backing_off {
                let side = safe_normalize(&(point.position - beacon));
                cost -= cfg.back_off_bonus * side.dot(&unit_side);
            }

            if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                best = Some((index, cost));
            }
        }

        if let Some((index, cost)) = best {
            if tactics_debug_enabled() {
                log::debug!("{} -> point {} (cost {:.2})", agent, index, cost);
            }
            return Some(index);
        }

        current.filter(|&index| {
            self.points.get(index).is_some_and(|p| self.admissible(p, agent, &beacon))
        })
    }

    /// Hands out points to every available idle or moving unit and sends the
    /// order when a unit's point changed.
    pub(super) fn assign_points(&mut self, ctx: &mut TacticContext<'_>, beacon: Vec3) {
        let mask = self.base.unit_properties;
        for point in &mut self.points {
            point.visibility_checked = false;
        }
        let special_owners: Vec<AgentId> = self
            .special_actions
            .iter()
            .filter(|a| a.is_active())
            .filter_map(|a| a.owner)
            .collect();

        for index in 0..ctx.roster.len() {
            let unit = ctx.roster.unit_at(index);
            let agent = unit.agent();
            if special_owners.contains(&agent) || !is_unit_available(ctx, unit, mask) {
                continue;
            }
            if !(unit.idle() || unit.is_moving()) {
                continue;
            }
            let current = unit.formation_index;

            let Some(chosen) = self.formation_point_with_target(ctx, index, beacon) else {
                continue;
            };
            if current == Some(chosen) && !self.reapproach {
                continue;
            }

            self.claim_point(chosen, agent);
            let unit = ctx.roster.unit_at_mut(index);
            unit.formation_index = Some(chosen);
            unit.tag_point = self.points[chosen].position;
            unit.clear_following();
            unit.set_moving();
            self.back_off.remove(&agent);
            self.send_point_order(ctx, index, chosen, beacon);
        }

        self.points_assigned = true;
        self.reapproach = false;
    }

    /// Queues the move order for the point at `point_index` on the unit at `unit_index`.
    pub(super) fn send_point_order(
        &self,
        ctx: &mut TacticContext<'_>,
        unit_index: usize,
        point_index: usize,
        beacon: Vec3,
    ) {
        let point = self.points[point_index];
        let agent = ctx.roster.unit_at(unit_index).agent();
        let signal = if point.shoot_spot {
            Outbound::AttackShootSpot
        } else {
            Outbound::AttackSwitchPosition
        };
        let data = SignalData {
            point: point.position,
            point2: beacon,
            i_value: point_index as i32,
            f_value: self.nominal_distance(ctx, agent),
            ..SignalData::default()
        };
        ctx.roster.push_action_at(unit_index, UnitAction::signal(signal.name(), data, false));
        ctx.roster.execute_task_at(unit_index, ctx.sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tactics::testing::{anonymous, ground, hostile, Fixture};
    use crate::tactics::LeaderActionParams;
    use crate::unit::UnitProperties;

    fn started(units: u32, enemy: Vec3) -> (Fixture, SwitchPositionsTactic) {
        let mut fx = Fixture::new(&ground(units));
        fx.all_see(anonymous(enemy));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);
        tactic.update(&mut fx.next_frame());
        (fx, tactic)
    }

    #[test]
    fn test_danger_point_pruned_after_ceil_t_over_d_updates() {
        let mut tactic = SwitchPositionsTactic::new(
            &LeaderActionParams::switch_positions("attack_ring"),
            &Default::default(),
        );
        tactic.danger_points.push(DangerPoint::new(Vec3::zeros(), 3.0, 1.0));

        // t = 1.0, d = 0.25: gone after exactly 4 updates.
        for _ in 0..3 {
            tactic.prune_danger_points(0.25);
            assert_eq!(tactic.danger_points().len(), 1);
            assert!(tactic.danger_points()[0].time > 0.0);
        }
        tactic.prune_danger_points(0.25);
        assert!(tactic.danger_points().is_empty());
    }

    #[test]
    fn test_danger_pruning_with_uneven_delta() {
        let mut tactic = SwitchPositionsTactic::new(
            &LeaderActionParams::switch_positions("attack_ring"),
            &Default::default(),
        );
        tactic.danger_points.push(DangerPoint::new(Vec3::zeros(), 3.0, 1.0));

        // ceil(1.0 / 0.4) = 3
        tactic.prune_danger_points(0.4);
        tactic.prune_danger_points(0.4);
        assert_eq!(tactic.danger_points().len(), 1);
        tactic.prune_danger_points(0.4);
        assert!(tactic.danger_points().is_empty());
    }

    #[test]
    fn test_danger_insertion_clears_flags_within_radius() {
        let mut fx = Fixture::new(&ground(4));
        // Units at x = 0, 2, 4, 6; spread them further apart.
        fx.world.move_agent(AgentId(1), Vec3::new(-20.0, 0.0, 0.0));
        fx.world.move_agent(AgentId(2), Vec3::new(0.0, 0.0, 0.0));
        fx.world.move_agent(AgentId(3), Vec3::new(5.5, 0.0, 0.0));
        fx.world.move_agent(AgentId(4), Vec3::new(0.0, 12.0, 0.0));
        for unit in fx.roster.units_mut() {
            unit.set_following();
            unit.set_moving();
        }
        let mut tactic = SwitchPositionsTactic::new(
            &LeaderActionParams::switch_positions("attack_ring"),
            &fx.config,
        );

        tactic.add_danger_point(&mut fx.ctx(), Vec3::new(0.0, 0.0, 0.0), 5.0, 2.0);

        let unit2 = fx.roster.get(AgentId(2)).unwrap();
        assert!(!unit2.is_following());
        assert!(!unit2.is_moving());
        for id in [1, 3, 4] {
            let unit = fx.roster.get(AgentId(id)).unwrap();
            assert!(unit.is_following(), "unit {} lost following", id);
            assert!(unit.is_moving(), "unit {} lost moving", id);
        }
        assert_eq!(fx.sink.sent_to(AgentId(2), "OnAvoidDanger").len(), 1);
        assert_eq!(fx.sink.count("OnAvoidDanger"), 1);
        assert!(!tactic.points_assigned());
    }

    #[test]
    fn test_add_danger_point_signal_uses_config_duration() {
        let mut fx = Fixture::new(&ground(1));
        let mut tactic = SwitchPositionsTactic::new(
            &LeaderActionParams::switch_positions("attack_ring"),
            &fx.config,
        );
        let data = SignalData { point: Vec3::new(40.0, 0.0, 0.0), f_value: 3.0, ..Default::default() };
        let event = crate::signals::SignalEvent::with_data("AddDangerPoint", AgentId(1), data);

        assert!(tactic.process_signal(&mut fx.ctx(), &event));

        assert_eq!(tactic.danger_points().len(), 1);
        assert_eq!(tactic.danger_points()[0].time, fx.config.switch_positions.danger_point_duration);
    }

    #[test]
    fn test_points_too_close_to_target_never_selected() {
        let (mut fx, mut tactic) = started(1, Vec3::new(0.0, 30.0, 0.0));
        let beacon = fx.beacon.position().unwrap();
        // Ring radius is 15: everything is too close with a 16 m stand-off.
        tactic.min_distance_to_target = 16.0;
        tactic.release_unit_point(&mut fx.ctx(), AgentId(1));

        assert_eq!(tactic.formation_point_with_target(&fx.ctx(), 0, beacon), None);
    }

    #[test]
    fn test_forbidden_point_never_selected() {
        let (mut fx, mut tactic) = started(1, Vec3::new(0.0, 30.0, 0.0));
        let beacon = fx.beacon.position().unwrap();
        let first = fx.roster.unit_at(0).formation_index.unwrap();

        let event = crate::signals::SignalEvent::new("OnRequestUpdateAlternative", AgentId(1));
        assert!(tactic.process_signal(&mut fx.ctx(), &event));
        assert_eq!(tactic.forbidden_spots(AgentId(1)).len(), 1);

        let chosen = tactic.formation_point_with_target(&fx.ctx(), 0, beacon).unwrap();
        assert_ne!(chosen, first);

        let event = crate::signals::SignalEvent::new("OnClearSpotList", AgentId(1));
        assert!(tactic.process_signal(&mut fx.ctx(), &event));
        assert!(tactic.forbidden_spots(AgentId(1)).is_empty());
    }

    #[test]
    fn test_point_owned_by_other_unit_never_selected() {
        let (mut fx, mut tactic) = started(2, Vec3::new(0.0, 30.0, 0.0));
        let beacon = fx.beacon.position().unwrap();
        let taken = fx.roster.unit_at(0).formation_index.unwrap();

        // Only the first unit's point is left admissible for the second.
        for (i, point) in tactic.points.iter_mut().enumerate() {
            if i != taken {
                point.owner = Some(AgentId(99));
            }
        }

        let chosen = tactic.formation_point_with_target(&fx.ctx(), 1, beacon);
        assert_eq!(chosen, None);
    }

    #[test]
    fn test_points_inside_danger_zone_skipped() {
        let (mut fx, mut tactic) = started(1, Vec3::new(0.0, 30.0, 0.0));
        let beacon = fx.beacon.position().unwrap();
        let first = fx.roster.unit_at(0).formation_index.unwrap();
        let position = tactic.points()[first].position;

        tactic.add_danger_point(&mut fx.ctx(), position, 2.0, 5.0);
        let chosen = tactic.formation_point_with_target(&fx.ctx(), 0, beacon).unwrap();

        assert_ne!(chosen, first);
        assert!(dist_2d_sq(&tactic.points()[chosen].position, &position) > 4.0);
    }

    #[test]
    fn test_blocked_line_of_sight_rejects_point() {
        let (mut fx, mut tactic) = started(1, Vec3::new(0.0, 30.0, 0.0));
        let beacon = fx.beacon.position().unwrap();
        // A wall around the target hides it from every point.
        fx.world.add_blocker(beacon, 6.0);
        tactic.release_unit_point(&mut fx.ctx(), AgentId(1));
        for point in tactic.points.iter_mut() {
            point.visibility_checked = false;
        }

        assert_eq!(tactic.formation_point_with_target(&fx.ctx(), 0, beacon), None);
        assert!(tactic.points().iter().all(|p| p.visibility_checked && !p.target_visible));
    }

    #[test]
    fn test_keeps_current_point_when_nothing_qualifies() {
        let (mut fx, mut tactic) = started(1, Vec3::new(0.0, 30.0, 0.0));
        let beacon = fx.beacon.position().unwrap();
        let current = fx.roster.unit_at(0).formation_index.unwrap();

        fx.world.add_blocker(beacon, 6.0);
        for point in tactic.points.iter_mut() {
            point.visibility_checked = false;
        }

        assert_eq!(tactic.formation_point_with_target(&fx.ctx(), 0, beacon), Some(current));
    }

    #[test]
    fn test_nearest_to_nominal_distance_wins() {
        let mut fx = Fixture::new(&[(1, UnitProperties::COMBAT_GROUND)]);
        let enemy = Vec3::new(0.0, 30.0, 0.0);
        fx.all_see(anonymous(enemy));
        fx.world.shoot_spots.push(Vec3::new(0.0, 21.0, 0.0));
        fx.roster.unit_at_mut(0).distance = 9.0;
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);

        tactic.update(&mut fx.next_frame());

        let index = fx.roster.unit_at(0).formation_index.unwrap();
        assert!(tactic.points()[index].shoot_spot);
        assert_eq!(fx.sink.count("OnAttackShootSpot"), 1);
    }

    #[test]
    fn test_beacon_shift_forces_reapproach() {
        let (mut fx, mut tactic) = started(2, Vec3::new(0.0, 30.0, 0.0));
        assert_eq!(fx.sink.count("OnAttackSwitchPosition"), 2);

        fx.all_see(anonymous(Vec3::new(0.0, 40.0, 0.0)));
        tactic.update(&mut fx.next_frame());

        assert_eq!(fx.sink.count("OnAttackSwitchPosition"), 4);
        assert_eq!(tactic.formation().unwrap().pivot(), Vec3::new(0.0, 40.0, 0.0));
    }

    #[test]
    fn test_spread_enemies_enlarge_formation() {
        let mut fx = Fixture::new(&ground(2));
        fx.world.set_target(AgentId(1), hostile(100, Vec3::new(-10.0, 30.0, 0.0)));
        fx.world.set_target(AgentId(2), hostile(101, Vec3::new(10.0, 30.0, 0.0)));
        let params = LeaderActionParams::switch_positions("attack_ring");
        let mut tactic = SwitchPositionsTactic::new(&params, &fx.config);

        tactic.update(&mut fx.next_frame());

        // (15 + 10) / 15
        let scale = tactic.formation().unwrap().scale();
        assert!((scale - 25.0 / 15.0).abs() < 1e-4);
    }
}
