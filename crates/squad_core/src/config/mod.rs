//! # Tactics Configuration
//!
//! 모든 튜닝 상수를 중앙에서 관리하는 설정 시스템.
//!
//! ## 사용법
//! ```rust
//! use squad_core::config::TacticsConfig;
//!
//! let config = TacticsConfig::default();
//! let aggressive = TacticsConfig::aggressive();
//! assert!(aggressive.switch_positions.min_distance_to_target
//!     < config.switch_positions.min_distance_to_target);
//! ```

mod search_config;
mod switch_positions_config;

pub use search_config::SearchConfig;
pub use switch_positions_config::SwitchPositionsConfig;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SquadError};

/// 전체 전술 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TacticsConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub switch_positions: SwitchPositionsConfig,
}

impl TacticsConfig {
    /// Closer stand-off, quicker special actions.
    pub fn aggressive() -> Self {
        let mut cfg = Self::default();
        cfg.switch_positions.min_distance_to_target = 3.0;
        cfg.switch_positions.default_distance_to_target = 10.0;
        cfg.switch_positions.special_action_timeout = 2.0;
        cfg.search.cover_ratio_num = 1;
        cfg
    }

    /// Wider stand-off, longer patience without a target.
    pub fn cautious() -> Self {
        let mut cfg = Self::default();
        cfg.switch_positions.min_distance_to_target = 8.0;
        cfg.switch_positions.default_distance_to_target = 20.0;
        cfg.switch_positions.target_lost_time_limit = 20.0;
        cfg.search.cover_ratio_num = 3;
        cfg
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(text)
            .map_err(|e| SquadError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| SquadError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let sp = &self.switch_positions;
        if sp.min_distance_to_target < 0.0 {
            return Err(SquadError::InvalidConfig(
                "min_distance_to_target must not be negative".to_string(),
            ));
        }
        if sp.min_scale <= 0.0 || sp.min_scale > sp.max_scale {
            return Err(SquadError::InvalidConfig(format!(
                "invalid scale range {}..{}",
                sp.min_scale, sp.max_scale
            )));
        }
        if sp.scale_update_interval <= 0.0 {
            return Err(SquadError::InvalidConfig(
                "scale_update_interval must be positive".to_string(),
            ));
        }
        if self.search.cover_ratio_den == 0 {
            return Err(SquadError::InvalidConfig("cover_ratio_den must be positive".to_string()));
        }
        Ok(())
    }
}

// ========== Tests ==========
