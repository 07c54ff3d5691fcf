//! Search tactic configuration

use serde::{Deserialize, Serialize};

/// Search 전술 파라미터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Radius of the candidate query around the search center (default: 20.0)
    pub search_distance: f32,
    /// Object type passed to the nearby-object query (default: 0)
    pub object_type: i32,
    /// Include hide spots in the candidates (default: true)
    pub use_hide_spots: bool,
    /// Share of cover-eligible units diverted to cover fire, as numerator/denominator (default: 2/5)
    pub cover_ratio_num: usize,
    pub cover_ratio_den: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_distance: 20.0,
            object_type: 0,
            use_hide_spots: true,
            cover_ratio_num: 2,
            cover_ratio_den: 5,
        }
    }
}

impl SearchConfig {
    /// Maximum simultaneous cover units for `eligible` cover-capable units.
    pub fn max_cover_units(&self, eligible: usize) -> usize {
        if eligible == 0 || self.cover_ratio_den == 0 {
            return 0;
        }
        (eligible * self.cover_ratio_num / self.cover_ratio_den).max(1)
    }
}
