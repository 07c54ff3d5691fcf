//! Formation templates anchored around a pivot
//!
//! Provides pre-defined anchor point layouts for the attack tactics.
//! Offsets are in meters relative to the pivot (the beacon) at scale 1.0.

use serde::{Deserialize, Serialize};

use crate::types::{AgentId, Vec3};

/// Offsets for a named formation, `None` for unknown descriptors.
pub fn get_formation_offsets(descriptor: &str) -> Option<Vec<Vec3>> {
    match descriptor {
        "attack_ring" => Some(ring(8, 15.0, 0.0)),
        "attack_wide" => Some(ring(12, 20.0, 0.0)),
        "attack_double_ring" => {
            let mut offsets = ring(6, 12.0, 0.0);
            offsets.extend(ring(6, 20.0, std::f32::consts::PI / 6.0));
            Some(offsets)
        }
        "attack_arc" => Some(arc(7, 15.0, std::f32::consts::PI)),
        _ => None,
    }
}

/// `count` points evenly spaced on a circle, starting at `phase` radians.
fn ring(count: usize, radius: f32, phase: f32) -> Vec<Vec3> {
    (0..count)
        .map(|i| {
            let angle = phase + i as f32 * std::f32::consts::TAU / count as f32;
            Vec3::new(angle.cos() * radius, angle.sin() * radius, 0.0)
        })
        .collect()
}

/// `count` points spread over `span` radians, centered on -Y.
fn arc(count: usize, radius: f32, span: f32) -> Vec<Vec3> {
    let start = -std::f32::consts::FRAC_PI_2 - span / 2.0;
    let step = if count > 1 { span / (count - 1) as f32 } else { 0.0 };
    (0..count)
        .map(|i| {
            let angle = start + i as f32 * step;
            Vec3::new(angle.cos() * radius, angle.sin() * radius, 0.0)
        })
        .collect()
}

/// Indexed anchor points around a pivot with per-point ownership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formation {
    descriptor: String,
    pivot: Vec3,
    offsets: Vec<Vec3>,
    owners: Vec<Option<AgentId>>,
    scale: f32,
    /// Largest offset length at scale 1.0.
    base_size: f32,
}

impl Formation {
    /// `None` when the descriptor is unknown or has no points.
    pub fn create(descriptor: &str, pivot: Vec3) -> Option<Self> {
        let offsets = get_formation_offsets(descriptor)?;
        if offsets.is_empty() {
            return None;
        }
        let base_size = offsets.iter().map(|o| o.norm()).fold(0.0f32, f32::max);
        let owners = vec![None; offsets.len()];
        Some(Self {
            descriptor: descriptor.to_string(),
            pivot,
            offsets,
            owners,
            scale: 1.0,
            base_size,
        })
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn pivot(&self) -> Vec3 {
        self.pivot
    }

    pub fn set_pivot(&mut self, pivot: Vec3) {
        self.pivot = pivot;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    /// Radius of the formation at scale 1.0.
    pub fn base_size(&self) -> f32 {
        self.base_size
    }

    /// Radius at the current scale.
    pub fn size(&self) -> f32 {
        self.base_size * self.scale
    }

    pub fn offset(&self, index: usize) -> Option<Vec3> {
        self.offsets.get(index).map(|o| o * self.scale)
    }

    pub fn point(&self, index: usize) -> Option<Vec3> {
        self.offset(index).map(|o| self.pivot + o)
    }

    pub fn owner(&self, index: usize) -> Option<AgentId> {
        self.owners.get(index).copied().flatten()
    }

    /// Claims a point. Fails when another agent owns it.
    pub fn set_owner(&mut self, index: usize, agent: AgentId) -> bool {
        match self.owners.get_mut(index) {
            Some(slot) if slot.is_none() || *slot == Some(agent) => {
                *slot = Some(agent);
                true
            }
            _ => false,
        }
    }

    pub fn free_point(&mut self, index: usize) {
        if let Some(slot) = self.owners.get_mut(index) {
            *slot = None;
        }
    }

    /// Frees every point owned by `agent`.
    pub fn free_points_of(&mut self, agent: AgentId) {
        for slot in self.owners.iter_mut().filter(|s| **s == Some(agent)) {
            *slot = None;
        }
    }

    pub fn release_all(&mut self) {
        self.owners.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn point_of(&self, agent: AgentId) -> Option<usize> {
        self.owners.iter().position(|o| *o == Some(agent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_descriptor_fails() {
        assert!(Formation::create("phalanx", Vec3::zeros()).is_none());
    }

    #[test]
    fn test_ring_points_scale_around_pivot() {
        let pivot = Vec3::new(100.0, 50.0, 0.0);
        let mut formation = Formation::create("attack_ring", pivot).unwrap();
        assert_eq!(formation.len(), 8);
        assert!((formation.base_size() - 15.0).abs() < 1e-4);

        let p0 = formation.point(0).unwrap();
        assert!(((p0 - pivot).norm() - 15.0).abs() < 1e-4);

        formation.set_scale(2.0);
        let p0 = formation.point(0).unwrap();
        assert!(((p0 - pivot).norm() - 30.0).abs() < 1e-3);
        assert!((formation.size() - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_ownership_is_exclusive() {
        let mut formation = Formation::create("attack_arc", Vec3::zeros()).unwrap();
        assert!(formation.set_owner(2, AgentId(1)));
        assert!(formation.set_owner(2, AgentId(1)));
        assert!(!formation.set_owner(2, AgentId(7)));
        assert_eq!(formation.point_of(AgentId(1)), Some(2));

        formation.free_points_of(AgentId(1));
        assert_eq!(formation.owner(2), None);
        assert!(formation.set_owner(2, AgentId(7)));

        formation.release_all();
        assert_eq!(formation.point_of(AgentId(7)), None);
    }
}
