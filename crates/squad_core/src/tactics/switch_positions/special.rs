//! Special-action arbitration.
//!
//! At most `max(1, live_enabled / 2)` special actions are active at once.
//! A non-vehicle target has a single slot; vehicles get a new slot each time
//! all of theirs are taken. Off -> WaitingConfirm when granted,
//! WaitingConfirm -> On when the unit confirms, back to Off when the unit is
//! done, is lost, or does not confirm within the timeout.

use super::{SpecialAction, SpecialActionStatus, SwitchPositionsTactic};
use crate::services::TargetInfo;
use crate::signals::{Outbound, SignalData};
use crate::tactics::common::{available_agent, is_unit_available, live_enabled_count};
use crate::tactics::TacticContext;
use crate::types::{AgentId, Vec3};

impl SwitchPositionsTactic {
    pub fn max_special_actions(&self, ctx: &TacticContext<'_>) -> usize {
        (live_enabled_count(ctx, self.base.unit_properties) / 2).max(1)
    }

    pub fn active_special_actions(&self) -> usize {
        self.special_actions.iter().filter(|a| a.is_active()).count()
    }

    pub(super) fn update_special_actions(&mut self, ctx: &mut TacticContext<'_>, targets: &[TargetInfo]) {
        let timeout = ctx.config.switch_positions.special_action_timeout;
        let mask = self.base.unit_properties;
        let now = ctx.now;

        // Lost owners and unconfirmed requests.
        for action in self.special_actions.iter_mut().filter(|a| a.is_active()) {
            let owner = action.owner.and_then(|o| ctx.roster.get(o));
            let owner_ok = owner.is_some_and(|u| is_unit_available(ctx, u, mask));
            let timed_out = action.status == SpecialActionStatus::WaitingConfirm
                && now - action.last_time > timeout;
            if owner_ok && !timed_out {
                continue;
            }
            if timed_out {
                log::debug!("special action on {} not confirmed in time", action.target);
            }
            if let Some(unit) = action.owner.and_then(|o| ctx.roster.get_mut(o)) {
                unit.set_special(false);
            }
            action.switch_off(now);
        }

        self.special_actions
            .retain(|a| a.is_active() || targets.iter().any(|t| t.id == Some(a.target)));

        let cap = self.max_special_actions(ctx);
        self.revoke_excess(ctx, cap);

        for target in targets {
            let Some(id) = target.id else {
                continue;
            };
            let has_any = self.special_actions.iter().any(|a| a.target == id);
            let has_free_slot =
                self.special_actions.iter().any(|a| a.target == id && !a.is_active());
            if !has_any || (target.vehicle && !has_free_slot) {
                self.special_actions.push(SpecialAction::new(id, target.vehicle, target.position));
            }
        }

        while self.active_special_actions() < cap {
            let Some((slot, target)) = self.next_grantable(targets) else {
                break;
            };
            let Some(agent) = self.best_special_unit(ctx, &self.special_actions[slot], target.position)
            else {
                break;
            };
            self.grant(ctx, slot, agent, target.position);
        }
    }

    /// Revokes the most recently granted actions until at most `cap` remain active.
    fn revoke_excess(&mut self, ctx: &mut TacticContext<'_>, cap: usize) {
        while self.active_special_actions() > cap {
            let newest = self
                .special_actions
                .iter()
                .enumerate()
                .filter(|(_, a)| a.is_active())
                .max_by(|(ia, a), (ib, b)| a.last_time.total_cmp(&b.last_time).then(ia.cmp(ib)))
                .map(|(i, _)| i);
            let Some(index) = newest else {
                break;
            };
            let action = &mut self.special_actions[index];
            if let Some(unit) = action.owner.and_then(|o| ctx.roster.get_mut(o)) {
                unit.set_special(false);
            }
            log::debug!("special action on {} revoked", action.target);
            action.switch_off(ctx.now);
        }
    }

    /// First inactive slot whose target may take another claimant.
    fn next_grantable(&self, targets: &[TargetInfo]) -> Option<(usize, TargetInfo)> {
        self.special_actions.iter().enumerate().find_map(|(i, action)| {
            if action.is_active() {
                return None;
            }
            let target = targets.iter().find(|t| t.id == Some(action.target))?;
            let claimed = self
                .special_actions
                .iter()
                .any(|other| other.target == action.target && other.is_active());
            if claimed && !action.vehicle {
                return None;
            }
            Some((i, *target))
        })
    }

    /// Highest scoring free unit: closest to the target, with a bonus for the
    /// unit that held this action before. First in roster order on ties.
    fn best_special_unit(
        &self,
        ctx: &TacticContext<'_>,
        action: &SpecialAction,
        target_position: Vec3,
    ) -> Option<AgentId> {
        let bonus = ctx.config.switch_positions.incumbent_bonus;
        let mask = self.base.unit_properties;
        let mut best: Option<(AgentId, f32)> = None;

        for unit in ctx.roster.units() {
            if unit.is_special() {
                continue;
            }
            let Some(info) = available_agent(ctx, unit, mask) else {
                continue;
            };
            let mut score = -(info.position - target_position).norm();
            if action.previous_owner == Some(info.id) {
                score += bonus;
            }
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((info.id, score));
            }
        }

        best.map(|(agent, _)| agent)
    }

    fn grant(&mut self, ctx: &mut TacticContext<'_>, slot: usize, agent: AgentId, position: Vec3) {
        let action = &mut self.special_actions[slot];
        action.status = SpecialActionStatus::WaitingConfirm;
        action.owner = Some(agent);
        action.last_time = ctx.now;
        action.position = position;

        if let Some(unit) = ctx.roster.get_mut(agent) {
            unit.set_special(true);
        }
        let data = SignalData { point: position, n_id: action.target.0, ..SignalData::default() };
        ctx.sink.send_to(agent, Outbound::SpecialAction, data);
        log::debug!("special action on {} granted to {}", action.target, agent);
    }

    pub(super) fn confirm_special_action(&mut self, ctx: &mut TacticContext<'_>, agent: AgentId) {
        let now = ctx.now;
        if let Some(action) = self
            .special_actions
            .iter_mut()
            .find(|a| a.owner == Some(agent) && a.status == SpecialActionStatus::WaitingConfirm)
        {
            action.status = SpecialActionStatus::On;
            action.last_time = now;
        }
    }

    pub(super) fn finish_special_action(&mut self, ctx: &mut TacticContext<'_>, agent: AgentId) {
        let now = ctx.now;
        if let Some(action) =
            self.special_actions.iter_mut().find(|a| a.owner == Some(agent) && a.is_active())
        {
            action.switch_off(now);
        }
        if let Some(unit) = ctx.roster.get_mut(agent) {
            unit.set_special(false);
        }
        self.points_assigned = false;
    }
}
