//! Records kept by the switch-positions tactic.

use serde::{Deserialize, Serialize};

use crate::types::{dist_2d_sq, segment_point_dist_sq, AgentId, NavType, Vec3};

/// One candidate firing position: a formation point or a shoot spot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointProperties {
    pub position: Vec3,
    /// Cached line-of-sight result, valid while `visibility_checked` is set.
    pub target_visible: bool,
    pub visibility_checked: bool,
    pub owner: Option<AgentId>,
    pub shoot_spot: bool,
}

impl PointProperties {
    pub fn new(position: Vec3, shoot_spot: bool) -> Self {
        Self {
            position,
            target_visible: false,
            visibility_checked: false,
            owner: None,
            shoot_spot,
        }
    }

    pub fn is_owned_by_other(&self, agent: AgentId) -> bool {
        matches!(self.owner, Some(owner) if owner != agent)
    }
}

/// A temporary area units must stay out of.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DangerPoint {
    pub point: Vec3,
    pub radius: f32,
    /// Seconds left before the point expires.
    pub time: f32,
}

impl DangerPoint {
    pub fn new(point: Vec3, radius: f32, time: f32) -> Self {
        Self { point, radius, time }
    }

    pub fn contains(&self, position: &Vec3) -> bool {
        dist_2d_sq(&self.point, position) <= self.radius * self.radius
    }

    /// The straight path `from..to` passes through the zone.
    pub fn crosses(&self, from: &Vec3, to: &Vec3) -> bool {
        let flat = |v: &Vec3| Vec3::new(v.x, v.y, 0.0);
        let center = flat(&self.point);
        segment_point_dist_sq(&flat(from), &flat(to), &center) <= self.radius * self.radius
    }

    pub fn expired(&self) -> bool {
        self.time <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpecialActionStatus {
    #[default]
    Off,
    /// Requested from a unit, not yet confirmed.
    WaitingConfirm,
    On,
}

/// An exclusive per-target action (a finisher, a grenade run) granted to one unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpecialAction {
    pub target: AgentId,
    pub vehicle: bool,
    pub status: SpecialActionStatus,
    pub owner: Option<AgentId>,
    /// Unit that held the action last, favored when it is reassigned.
    pub previous_owner: Option<AgentId>,
    /// Time of the last status change.
    pub last_time: f32,
    pub position: Vec3,
}

impl SpecialAction {
    pub fn new(target: AgentId, vehicle: bool, position: Vec3) -> Self {
        Self {
            target,
            vehicle,
            status: SpecialActionStatus::Off,
            owner: None,
            previous_owner: None,
            last_time: 0.0,
            position,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status != SpecialActionStatus::Off
    }

    pub fn switch_off(&mut self, now: f32) {
        self.status = SpecialActionStatus::Off;
        if self.owner.is_some() {
            self.previous_owner = self.owner.take();
        }
        self.last_time = now;
    }
}

/// Per-unit tracking between updates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetData {
    /// Attention target seen on the last update.
    pub target: Option<AgentId>,
    pub nav_type: NavType,
    pub target_nav_type: NavType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_danger_zone_is_flat() {
        let danger = DangerPoint::new(Vec3::new(0.0, 0.0, 0.0), 5.0, 1.0);
        assert!(danger.contains(&Vec3::new(3.0, 4.0, 10.0)));
        assert!(!danger.contains(&Vec3::new(3.0, 4.1, 0.0)));
    }

    #[test]
    fn test_danger_crossing() {
        let danger = DangerPoint::new(Vec3::new(0.0, 0.0, 0.0), 2.0, 1.0);
        assert!(danger.crosses(&Vec3::new(-10.0, 1.0, 0.0), &Vec3::new(10.0, 1.0, 0.0)));
        assert!(!danger.crosses(&Vec3::new(-10.0, 3.0, 0.0), &Vec3::new(10.0, 3.0, 0.0)));
    }

    #[test]
    fn test_switch_off_remembers_owner() {
        let mut action = SpecialAction::new(AgentId(9), false, Vec3::zeros());
        action.status = SpecialActionStatus::On;
        action.owner = Some(AgentId(1));

        action.switch_off(4.0);

        assert!(!action.is_active());
        assert_eq!(action.owner, None);
        assert_eq!(action.previous_owner, Some(AgentId(1)));
        assert_eq!(action.last_time, 4.0);
    }
}
