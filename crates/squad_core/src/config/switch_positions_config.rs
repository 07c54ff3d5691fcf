//! Attack/SwitchPositions tactic configuration

use serde::{Deserialize, Serialize};

/// SwitchPositions 전술 파라미터
///
/// The scoring constants are calibrated against recorded squad behavior;
/// change them only together with the recordings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchPositionsConfig {
    // === Point selection ===
    /// Points closer than this to the target are never picked (default: 5.0)
    pub min_distance_to_target: f32,
    /// Nominal distance for units without a per-unit override (default: 15.0)
    pub default_distance_to_target: f32,
    /// Weight of the distance to the unit's previous point (default: 0.3)
    pub continuity_weight: f32,
    /// Bonus for points on the unit's side of the target when backing off (default: 5.0)
    pub back_off_bonus: f32,
    /// Raycast origin height above a candidate point (default: 1.6)
    pub eye_height: f32,
    /// Radius of the shoot-spot query around the beacon (default: 25.0)
    pub shoot_spot_radius: f32,

    // === Formation ===
    /// Formation template used when the tactic is issued without a name (default: "attack_ring")
    pub formation_descriptor: String,
    /// Seconds between formation scale checks (default: 2.0)
    pub scale_update_interval: f32,
    /// Beacon shift (squared, 2D) that re-triggers point computation (default: 4.0)
    pub beacon_shift_threshold_sq: f32,
    /// Scale change that re-triggers point computation (default: 0.1)
    pub scale_change_threshold: f32,
    pub min_scale: f32,
    pub max_scale: f32,

    // === Special actions ===
    /// Seconds a special action may wait for confirmation (default: 3.0)
    pub special_action_timeout: f32,
    /// Score bonus for the unit that owned the special action before (default: 49.0)
    pub incumbent_bonus: f32,

    // === Timing ===
    /// Seconds without a live group target before failing, when not given by the director (default: 10.0)
    pub target_lost_time_limit: f32,
    /// Lifetime of a danger point added without an explicit duration (default: 5.0)
    pub danger_point_duration: f32,
    /// Distance to the leader agent beyond which a unit counts as far (default: 30.0)
    pub leader_too_far_distance: f32,
}

impl Default for SwitchPositionsConfig {
    fn default() -> Self {
        Self {
            min_distance_to_target: 5.0,
            default_distance_to_target: 15.0,
            continuity_weight: 0.3,
            back_off_bonus: 5.0,
            eye_height: 1.6,
            shoot_spot_radius: 25.0,

            formation_descriptor: "attack_ring".to_string(),
            scale_update_interval: 2.0,
            beacon_shift_threshold_sq: 4.0,
            scale_change_threshold: 0.1,
            min_scale: 0.5,
            max_scale: 3.0,

            special_action_timeout: 3.0,
            incumbent_bonus: 49.0,

            target_lost_time_limit: 10.0,
            danger_point_duration: 5.0,
            leader_too_far_distance: 30.0,
        }
    }
}
