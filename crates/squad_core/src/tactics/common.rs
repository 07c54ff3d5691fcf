//! Helpers shared by all tactics: availability and group target lookup.

use super::TacticContext;
use crate::services::{AgentInfo, TargetInfo};
use crate::unit::{UnitProperties, UnitState};

/// Agent snapshot when the unit may be commanded by a tactic with `mask`.
pub fn available_agent(
    ctx: &TacticContext<'_>,
    unit: &UnitState,
    mask: UnitProperties,
) -> Option<AgentInfo> {
    if !unit.properties.intersects(mask) {
        return None;
    }
    ctx.services
        .agent(unit.agent())
        .filter(|info| info.alive && info.enabled)
}

pub fn is_unit_available(ctx: &TacticContext<'_>, unit: &UnitState, mask: UnitProperties) -> bool {
    available_agent(ctx, unit, mask).is_some()
}

/// Number of roster units that are alive, enabled and match `mask`.
pub fn live_enabled_count(ctx: &TacticContext<'_>, mask: UnitProperties) -> usize {
    ctx.roster
        .units()
        .iter()
        .filter(|u| is_unit_available(ctx, u, mask))
        .count()
}

/// Live hostile targets reported by available units, in roster order,
/// one entry per target entity.
pub fn live_group_targets(ctx: &TacticContext<'_>, mask: UnitProperties) -> Vec<TargetInfo> {
    let mut targets: Vec<TargetInfo> = Vec::new();

    for unit in ctx.roster.units() {
        let Some(info) = available_agent(ctx, unit, mask) else {
            continue;
        };
        let Some(target) = info.attention_target else {
            continue;
        };
        if !target.is_live_hostile() {
            continue;
        }
        let duplicate = match target.id {
            Some(id) => targets.iter().any(|t| t.id == Some(id)),
            None => targets.iter().any(|t| t.id.is_none() && t.position == target.position),
        };
        if !duplicate {
            targets.push(target);
        }
    }

    targets
}
