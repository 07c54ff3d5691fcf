//! Search tactic: spread the squad over candidate points around the last
//! known enemy position, diverting a share of the squad to cover fire.

use serde::{Deserialize, Serialize};

use super::common::{available_agent, is_unit_available};
use super::{ActionStatus, LeaderActionParams, TacticBase, TacticContext};
use crate::config::TacticsConfig;
use crate::debug_flags::tactics_debug_enabled;
use crate::services::TargetKind;
use crate::signals::{InboundKind, Order, SignalData, SignalEvent};
use crate::types::{is_zero, safe_normalize, vec3_zero, AgentId, Vec3};
use crate::unit::{ActionId, UnitAction, UnitProperties, UnitState};

/// A candidate investigation or hide location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchPoint {
    pub position: Vec3,
    pub direction: Vec3,
    pub reserved: bool,
    pub hide_spot: bool,
}

impl SearchPoint {
    pub fn new(position: Vec3, direction: Vec3, hide_spot: bool) -> Self {
        Self { position, direction, reserved: false, hide_spot }
    }
}

/// Multimap of search points keyed by squared distance to the enemy,
/// nearest first. Equal keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPointMap {
    entries: Vec<(f32, SearchPoint)>,
}

impl SearchPointMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn insert(&mut self, key: f32, point: SearchPoint) {
        let at = self.entries.partition_point(|(k, _)| *k <= key);
        self.entries.insert(at, (key, point));
    }

    pub fn contains_position(&self, position: &Vec3) -> bool {
        self.entries.iter().any(|(_, p)| p.position == *position)
    }

    /// Removes every point at `position`. Returns whether any was removed.
    pub fn remove_position(&mut self, position: &Vec3) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(_, p)| p.position != *position);
        self.entries.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchPoint> {
        self.entries.iter().map(|(_, p)| p)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SearchPoint> {
        self.entries.iter_mut().map(|(_, p)| p)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTactic {
    base: TacticBase,
    enemy_pos: Vec3,
    search_distance: f32,
    object_type: i32,
    use_hide_spots: bool,
    initialized: bool,
    points: SearchPointMap,
    /// Units currently holding a cover order.
    cover_units: Vec<AgentId>,
    time_running: f32,
}

impl SearchTactic {
    pub fn new(params: &LeaderActionParams, config: &TacticsConfig) -> Self {
        let cfg = &config.search;
        Self {
            base: TacticBase::from_params(params),
            enemy_pos: params.point,
            search_distance: if params.size > 0.0 { params.size } else { cfg.search_distance },
            object_type: if params.i_value > 0 { params.i_value } else { cfg.object_type },
            use_hide_spots: cfg.use_hide_spots,
            initialized: false,
            points: SearchPointMap::new(),
            cover_units: Vec::new(),
            time_running: 0.0,
        }
    }

    pub fn base(&self) -> &TacticBase {
        &self.base
    }

    pub fn points(&self) -> &SearchPointMap {
        &self.points
    }

    pub fn enemy_pos(&self) -> Vec3 {
        self.enemy_pos
    }

    pub fn cover_units(&self) -> &[AgentId] {
        &self.cover_units
    }

    /// Forgets a unit that already left the roster. The point it was sent
    /// to becomes available to the rest of the squad again.
    pub fn unit_removed(&mut self, unit: &UnitState) {
        let agent = unit.agent();
        self.cover_units.retain(|a| *a != agent);
        if is_zero(&unit.tag_point) {
            return;
        }
        for point in self.points.iter_mut().filter(|p| p.position == unit.tag_point) {
            point.reserved = false;
        }
    }

    pub fn update(&mut self, ctx: &mut TacticContext<'_>) -> ActionStatus {
        if !self.initialized {
            let center = self.enemy_pos;
            self.populate(ctx, center);
            self.initialized = true;
            log::info!("search started with {} candidate points", self.points.len());
        }
        self.time_running += ctx.dt;

        let mask = self.base.unit_properties;

        // A unit that finished its plan has visited the point it was sent to.
        for unit in ctx.roster.units() {
            if unit.is_plan_finished() && !is_zero(&unit.tag_point) {
                self.points.remove_position(&unit.tag_point);
            }
        }
        let roster = &*ctx.roster;
        self.cover_units
            .retain(|agent| roster.get(*agent).map(|u| !u.is_plan_finished()).unwrap_or(false));

        let eligible_cover = ctx
            .roster
            .units()
            .iter()
            .filter(|u| u.properties.contains(UnitProperties::COVER_FIRE))
            .filter(|u| is_unit_available(ctx, u, mask))
            .count();
        let max_cover = ctx.config.search.max_cover_units(eligible_cover);

        let mut cover_action: Option<ActionId> = None;

        for index in 0..ctx.roster.len() {
            let unit = ctx.roster.unit_at(index);
            if !unit.is_plan_finished() || !is_unit_available(ctx, unit, mask) {
                continue;
            }
            let agent = unit.agent();

            if unit.properties.contains(UnitProperties::COVER_FIRE)
                && self.cover_units.len() < max_cover
                && !self.points.is_empty()
            {
                let action = UnitAction::signal(
                    Order::CoverSearch.name(),
                    SignalData::with_point(self.enemy_pos),
                    true,
                );
                let id = ctx.roster.push_action_at(index, action);
                self.cover_units.push(agent);
                cover_action = Some(id);
                ctx.roster.execute_task_at(index, ctx.sink);
                if tactics_debug_enabled() {
                    log::debug!("{} covers the search", agent);
                }
                continue;
            }

            let tag_point = unit.tag_point;
            let Some(point) = self
                .points
                .iter_mut()
                .find(|p| !p.reserved && p.position != tag_point)
            else {
                continue;
            };
            point.reserved = true;
            let point = *point;

            let unit = ctx.roster.unit_at_mut(index);
            unit.tag_point = point.position;
            let id = ctx.roster.push_action_at(
                index,
                UnitAction::search(point.position, point.direction, point.hide_spot),
            );

            if point.hide_spot {
                if let Some(cover) = cover_action {
                    if let Err(e) = ctx.roster.block(id, cover) {
                        log::warn!("search order of {} not tied to cover: {}", agent, e);
                    }
                }
            }

            ctx.roster.execute_task_at(index, ctx.sink);
            if tactics_debug_enabled() {
                log::debug!(
                    "{} searches ({:.1}, {:.1}, {:.1}) hide={}",
                    agent,
                    point.position.x,
                    point.position.y,
                    point.position.z,
                    point.hide_spot
                );
            }
        }

        if self.points.is_empty() && ctx.roster.all_plans_finished() {
            log::info!("search finished after {:.1}s", self.time_running);
            return ActionStatus::Done;
        }
        ActionStatus::Running
    }

    pub fn process_signal(&mut self, ctx: &mut TacticContext<'_>, event: &SignalEvent) -> bool {
        let Some(kind) = event.kind() else {
            return false;
        };

        match kind {
            InboundKind::UnitMoving => {
                if let Some(unit) = ctx.roster.get(event.sender) {
                    let tag_point = unit.tag_point;
                    self.points.remove_position(&tag_point);
                }
                true
            }
            InboundKind::UnitStop | InboundKind::UnitDamaged | InboundKind::SearchOrder => {
                let Some(index) = ctx.roster.index_of(event.sender) else {
                    log::debug!("{} from unknown unit {}", event.name, event.sender);
                    return true;
                };
                // Assume the point is unreachable.
                let tag_point = ctx.roster.unit_at(index).tag_point;
                self.points.remove_position(&tag_point);
                ctx.roster.clear_planning_at(index, None);
                self.cover_units.retain(|a| *a != event.sender);

                if !is_zero(&event.data.point) {
                    self.enemy_pos = event.data.point;
                    self.points.clear();
                    self.populate(ctx, event.data.point);
                    log::debug!(
                        "search repopulated around new position: {} points",
                        self.points.len()
                    );
                }
                true
            }
            _ => false,
        }
    }

    fn add_point(&mut self, position: Vec3, direction: Vec3, hide_spot: bool) {
        if self.points.contains_position(&position) {
            return;
        }
        let key = (position - self.enemy_pos).norm_squared();
        self.points.insert(key, SearchPoint::new(position, direction, hide_spot));
    }

    /// Collects candidate points around `center`.
    fn populate(&mut self, ctx: &TacticContext<'_>, center: Vec3) {
        let radius = self.search_distance;

        for position in ctx.services.nearby_objects(&center, radius, self.object_type) {
            self.add_point(position, safe_normalize(&(position - center)), false);
        }

        let mask = self.base.unit_properties;
        for unit in ctx.roster.units() {
            let Some(info) = available_agent(ctx, unit, mask) else {
                continue;
            };
            if let Some(target) = info.attention_target {
                if matches!(target.kind, TargetKind::Memory | TargetKind::Sound) {
                    let dir = safe_normalize(&(target.position - info.position));
                    self.add_point(target.position, dir, false);
                }
            }
        }

        if self.use_hide_spots {
            for spot in ctx.services.hide_spots(&center, radius) {
                self.add_point(spot.position, spot.direction, true);
            }
        }

        if self.points.is_empty() && !is_zero(&center) {
            self.add_point(center, vec3_zero(), false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{HideSpot, RecordingSink};
    use crate::tactics::testing::{ground, Fixture};

    #[test]
    fn test_fallback_point_at_enemy_position() {
        let mut fx = Fixture::new(&ground(2));
        let enemy = Vec3::new(30.0, 10.0, 0.0);
        let params = LeaderActionParams::search(enemy, 15.0);
        let mut tactic = SearchTactic::new(&params, &fx.config);

        tactic.populate(&fx.ctx(), enemy);

        assert_eq!(tactic.points().len(), 1);
        assert_eq!(tactic.points().iter().next().unwrap().position, enemy);
    }

    #[test]
    fn test_no_fallback_without_enemy_position() {
        let mut fx = Fixture::new(&ground(1));
        let params = LeaderActionParams::search(vec3_zero(), 15.0);
        let mut tactic = SearchTactic::new(&params, &fx.config);

        let status = tactic.update(&mut fx.ctx());

        assert!(tactic.points().is_empty());
        assert_eq!(status, ActionStatus::Done);
    }

    #[test]
    fn test_points_sorted_nearest_first() {
        let mut fx = Fixture::new(&ground(1));
        let enemy = Vec3::new(0.0, 20.0, 0.0);
        fx.world.add_object(Vec3::new(0.0, 30.0, 0.0), 0);
        fx.world.add_object(Vec3::new(0.0, 22.0, 0.0), 0);
        fx.world.hide_spots.push(HideSpot {
            position: Vec3::new(0.0, 25.0, 0.0),
            direction: Vec3::y(),
        });
        let mut tactic = SearchTactic::new(&LeaderActionParams::search(enemy, 20.0), &fx.config);

        tactic.populate(&fx.ctx(), enemy);

        let ys: Vec<f32> = tactic.points().iter().map(|p| p.position.y).collect();
        assert_eq!(ys, vec![22.0, 25.0, 30.0]);
        assert!(tactic.points().iter().nth(1).unwrap().hide_spot);
    }

    #[test]
    fn test_units_reserve_distinct_points() {
        let mut fx = Fixture::new(&ground(4));
        let enemy = Vec3::new(0.0, 20.0, 0.0);
        for i in 0..4 {
            fx.world.add_object(Vec3::new(i as f32 * 3.0, 22.0, 0.0), 0);
        }
        let mut tactic = SearchTactic::new(&LeaderActionParams::search(enemy, 20.0), &fx.config);

        assert_eq!(tactic.update(&mut fx.ctx()), ActionStatus::Running);

        let reserved: Vec<Vec3> =
            tactic.points().iter().filter(|p| p.reserved).map(|p| p.position).collect();
        assert_eq!(reserved.len(), 4);
        let mut tags: Vec<Vec3> = fx.roster.units().iter().map(|u| u.tag_point).collect();
        tags.dedup();
        assert_eq!(tags.len(), 4);
        for tag in &tags {
            assert!(reserved.contains(tag));
        }
        assert_eq!(fx.sink.count("ORDER_SEARCH"), 4);
    }

    #[test]
    fn test_done_only_when_points_empty_and_plans_finished() {
        let mut fx = Fixture::new(&ground(1));
        let enemy = Vec3::new(5.0, 5.0, 0.0);
        let mut tactic = SearchTactic::new(&LeaderActionParams::search(enemy, 20.0), &fx.config);

        // Fallback point assigned, search order running.
        assert_eq!(tactic.update(&mut fx.ctx()), ActionStatus::Running);
        assert!(!fx.roster.unit_at(0).idle());

        // The agent started moving: point claimed, plan still running.
        let moving = SignalEvent::new("OnUnitMoving", AgentId(1));
        assert!(tactic.process_signal(&mut fx.ctx(), &moving));
        assert!(tactic.points().is_empty());
        assert_eq!(tactic.update(&mut fx.ctx()), ActionStatus::Running);

        fx.roster.task_executed(AgentId(1)).unwrap();
        assert_eq!(tactic.update(&mut fx.ctx()), ActionStatus::Done);
    }

    #[test]
    fn test_cover_units_allocation() {
        let units: Vec<_> = (1..=5)
            .map(|id| (id, UnitProperties::COMBAT_GROUND | UnitProperties::COVER_FIRE))
            .collect();
        let mut fx = Fixture::new(&units);
        let enemy = Vec3::new(0.0, 20.0, 0.0);
        for i in 0..5 {
            fx.world.add_object(Vec3::new(i as f32, 25.0, 0.0), 0);
        }
        let mut tactic = SearchTactic::new(&LeaderActionParams::search(enemy, 20.0), &fx.config);

        tactic.update(&mut fx.ctx());

        // floor(5 * 2 / 5) = 2
        assert_eq!(tactic.cover_units().len(), 2);
        assert_eq!(fx.sink.count("ORDER_COVER_SEARCH"), 2);
        assert_eq!(fx.sink.count("ORDER_SEARCH"), 3);
    }

    #[test]
    fn test_single_cover_unit_minimum() {
        let mut fx = Fixture::new(&[
            (1, UnitProperties::COMBAT_GROUND | UnitProperties::COVER_FIRE),
            (2, UnitProperties::COMBAT_GROUND),
        ]);
        let enemy = Vec3::new(0.0, 20.0, 0.0);
        fx.world.add_object(Vec3::new(0.0, 25.0, 0.0), 0);
        let mut tactic = SearchTactic::new(&LeaderActionParams::search(enemy, 20.0), &fx.config);

        tactic.update(&mut fx.ctx());

        assert_eq!(tactic.cover_units(), &[AgentId(1)]);
        assert_eq!(fx.sink.sent_to(AgentId(2), "ORDER_SEARCH").len(), 1);
    }

    #[test]
    fn test_hide_spot_search_waits_for_cover() {
        let mut fx = Fixture::new(&[
            (1, UnitProperties::COMBAT_GROUND | UnitProperties::COVER_FIRE),
            (2, UnitProperties::COMBAT_GROUND),
        ]);
        let enemy = Vec3::new(0.0, 20.0, 0.0);
        fx.world.hide_spots.push(HideSpot { position: Vec3::new(0.0, 24.0, 0.0), direction: Vec3::y() });
        let mut tactic = SearchTactic::new(&LeaderActionParams::search(enemy, 20.0), &fx.config);

        tactic.update(&mut fx.ctx());

        assert!(fx.roster.is_blocked_at(1));
        assert!(fx.sink.sent_to(AgentId(2), "ORDER_SEARCH").is_empty());

        // Cover established: the searcher is released.
        fx.roster.task_executed(AgentId(1)).unwrap();
        let mut sink = RecordingSink::new();
        fx.roster.execute_all(&mut sink);
        assert_eq!(sink.sent_to(AgentId(2), "ORDER_SEARCH").len(), 1);
    }

    #[test]
    fn test_unit_stop_drops_point_and_replans() {
        let mut fx = Fixture::new(&ground(1));
        let enemy = Vec3::new(0.0, 20.0, 0.0);
        fx.world.add_object(Vec3::new(0.0, 22.0, 0.0), 0);
        fx.world.add_object(Vec3::new(0.0, 28.0, 0.0), 0);
        let mut tactic = SearchTactic::new(&LeaderActionParams::search(enemy, 20.0), &fx.config);
        tactic.update(&mut fx.ctx());
        assert_eq!(fx.roster.unit_at(0).tag_point, Vec3::new(0.0, 22.0, 0.0));

        let stop = SignalEvent::new("OnUnitStop", AgentId(1));
        assert!(tactic.process_signal(&mut fx.ctx(), &stop));

        assert!(fx.roster.unit_at(0).is_plan_finished());
        assert_eq!(tactic.points().len(), 1);

        tactic.update(&mut fx.ctx());
        assert_eq!(fx.roster.unit_at(0).tag_point, Vec3::new(0.0, 28.0, 0.0));
    }

    #[test]
    fn test_search_order_repopulates_around_new_position() {
        let mut fx = Fixture::new(&ground(1));
        let enemy = Vec3::new(0.0, 20.0, 0.0);
        let mut tactic = SearchTactic::new(&LeaderActionParams::search(enemy, 20.0), &fx.config);
        tactic.update(&mut fx.ctx());

        let new_pos = Vec3::new(50.0, 50.0, 0.0);
        let event =
            SignalEvent::with_data("ORDER_SEARCH", AgentId(1), SignalData::with_point(new_pos));
        assert!(tactic.process_signal(&mut fx.ctx(), &event));

        assert_eq!(tactic.enemy_pos(), new_pos);
        assert_eq!(tactic.points().len(), 1);
        assert_eq!(tactic.points().iter().next().unwrap().position, new_pos);
    }

    #[test]
    fn test_memory_targets_become_points() {
        let mut fx = Fixture::new(&ground(2));
        let memory = Vec3::new(12.0, 12.0, 0.0);
        fx.world.set_target(
            AgentId(2),
            crate::services::TargetInfo {
                id: Some(AgentId(100)),
                position: memory,
                direction: vec3_zero(),
                kind: TargetKind::Memory,
                hostile: true,
                alive: true,
                vehicle: false,
            },
        );
        let enemy = Vec3::new(10.0, 10.0, 0.0);
        let mut tactic = SearchTactic::new(&LeaderActionParams::search(enemy, 20.0), &fx.config);

        tactic.populate(&fx.ctx(), enemy);

        assert_eq!(tactic.points().len(), 1);
        assert_eq!(tactic.points().iter().next().unwrap().position, memory);
    }

    #[test]
    fn test_unknown_signal_not_handled() {
        let mut fx = Fixture::new(&ground(1));
        let mut tactic =
            SearchTactic::new(&LeaderActionParams::search(Vec3::x(), 20.0), &fx.config);
        let event = SignalEvent::new("OnRequestUpdate", AgentId(1));
        assert!(!tactic.process_signal(&mut fx.ctx(), &event));
        let event = SignalEvent::new("OnBogus", AgentId(1));
        assert!(!tactic.process_signal(&mut fx.ctx(), &event));
    }
}
