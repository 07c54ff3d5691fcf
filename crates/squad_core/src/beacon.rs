//! Shared estimate of the enemy position for one squad.

use serde::{Deserialize, Serialize};

use crate::types::Vec3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Beacon {
    position: Option<Vec3>,
    /// Facing of the estimated enemy, zero when unknown.
    direction: Option<Vec3>,
    updated_at: f32,
}

impl Beacon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Option<Vec3> {
        self.position
    }

    pub fn direction(&self) -> Option<Vec3> {
        self.direction
    }

    pub fn updated_at(&self) -> f32 {
        self.updated_at
    }

    pub fn set(&mut self, position: Vec3, direction: Option<Vec3>, now: f32) {
        self.position = Some(position);
        self.direction = direction;
        self.updated_at = now;
    }

    /// Moves the beacon to the average of `positions`. Returns `false` and
    /// keeps the old estimate when `positions` is empty.
    pub fn update_from(&mut self, positions: &[Vec3], direction: Option<Vec3>, now: f32) -> bool {
        if positions.is_empty() {
            return false;
        }
        let sum = positions.iter().fold(Vec3::zeros(), |acc, p| acc + p);
        self.set(sum / positions.len() as f32, direction, now);
        true
    }

    pub fn clear(&mut self) {
        self.position = None;
        self.direction = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_averages_positions() {
        let mut beacon = Beacon::new();
        assert!(beacon.position().is_none());

        let moved = beacon.update_from(
            &[Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 4.0, 0.0)],
            None,
            1.5,
        );

        assert!(moved);
        assert_eq!(beacon.position(), Some(Vec3::new(5.0, 2.0, 0.0)));
        assert_eq!(beacon.updated_at(), 1.5);
    }

    #[test]
    fn test_empty_update_keeps_estimate() {
        let mut beacon = Beacon::new();
        beacon.set(Vec3::new(1.0, 1.0, 0.0), None, 0.0);
        assert!(!beacon.update_from(&[], None, 3.0));
        assert_eq!(beacon.position(), Some(Vec3::new(1.0, 1.0, 0.0)));
    }
}
