//! Shared primitive types: positions, agent handles, navigation classes.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// World-space position or direction (meters).
pub type Vec3 = Vector3<f32>;

/// Zero vector, used as the "unset" marker for optional points in signal payloads.
#[inline]
pub fn vec3_zero() -> Vec3 {
    Vec3::zeros()
}

#[inline]
pub fn is_zero(v: &Vec3) -> bool {
    v.x == 0.0 && v.y == 0.0 && v.z == 0.0
}

/// Squared distance on the ground plane (x/y), ignoring height.
#[inline]
pub fn dist_2d_sq(a: &Vec3, b: &Vec3) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

/// Normalized copy of `v`, or zero when `v` is degenerate.
#[inline]
pub fn safe_normalize(v: &Vec3) -> Vec3 {
    let len = v.norm();
    if len > 1e-6 {
        v / len
    } else {
        Vec3::zeros()
    }
}

/// Squared distance from `p` to the segment `a..b`.
pub fn segment_point_dist_sq(a: &Vec3, b: &Vec3, p: &Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= 1e-12 {
        return (p - a).norm_squared();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).norm_squared()
}

/// Weak handle to an agent owned by the surrounding AI framework.
///
/// The core never owns agents. A handle is resolved through
/// [`AgentDirectory`](crate::services::AgentDirectory) every time it is used;
/// a failed lookup means the agent is gone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct AgentId(pub u32);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Coarse classification of the navigation graph a position lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NavType {
    #[default]
    Unset,
    Triangular,
    WaypointHuman,
    Waypoint3dSurface,
    Volume,
    Flight,
    Road,
    SmartObject,
    FreeTwoD,
}

impl NavType {
    /// Stable integer code carried in outbound signal payloads.
    pub fn code(self) -> i32 {
        match self {
            NavType::Unset => 0,
            NavType::Triangular => 1 << 0,
            NavType::WaypointHuman => 1 << 1,
            NavType::Waypoint3dSurface => 1 << 2,
            NavType::Volume => 1 << 3,
            NavType::Flight => 1 << 4,
            NavType::Road => 1 << 5,
            NavType::SmartObject => 1 << 6,
            NavType::FreeTwoD => 1 << 7,
        }
    }
}

/// Result of a navigation-type query at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavInfo {
    pub nav_type: NavType,
    /// Building id for waypoint graphs, -1 outside buildings.
    pub building_id: i32,
}
