//! Squad roster: unit records plus the shared action arena.

use serde::{Deserialize, Serialize};

use super::action::{ActionArena, ActionId, ActionPriority, UnitAction};
use super::state::{UnitProperties, UnitState};
use crate::error::{Result, SquadError};
use crate::services::SignalSink;
use crate::types::AgentId;

/// Units in insertion order. Iteration order is stable; tactics rely on it
/// for deterministic tie-breaks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    units: Vec<UnitState>,
    actions: ActionArena,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn add_unit(&mut self, agent: AgentId, properties: UnitProperties) -> Result<&mut UnitState> {
        if self.index_of(agent).is_some() {
            return Err(SquadError::DuplicateUnit(agent));
        }
        self.units.push(UnitState::new(agent, properties));
        let last = self.units.len() - 1;
        Ok(&mut self.units[last])
    }

    /// Removes a unit, destroying its whole plan first.
    pub fn remove_unit(&mut self, agent: AgentId) -> Result<UnitState> {
        let index = self.index_of(agent).ok_or(SquadError::UnknownUnit(agent))?;
        let mut unit = self.units.remove(index);
        unit.clear_planning(&mut self.actions, None);
        Ok(unit)
    }

    pub fn index_of(&self, agent: AgentId) -> Option<usize> {
        self.units.iter().position(|u| u.agent() == agent)
    }

    pub fn contains(&self, agent: AgentId) -> bool {
        self.index_of(agent).is_some()
    }

    pub fn get(&self, agent: AgentId) -> Option<&UnitState> {
        self.units.iter().find(|u| u.agent() == agent)
    }

    pub fn get_mut(&mut self, agent: AgentId) -> Option<&mut UnitState> {
        self.units.iter_mut().find(|u| u.agent() == agent)
    }

    pub fn units(&self) -> &[UnitState] {
        &self.units
    }

    pub fn units_mut(&mut self) -> &mut [UnitState] {
        &mut self.units
    }

    pub fn unit_at(&self, index: usize) -> &UnitState {
        &self.units[index]
    }

    pub fn unit_at_mut(&mut self, index: usize) -> &mut UnitState {
        &mut self.units[index]
    }

    pub fn agents(&self) -> Vec<AgentId> {
        self.units.iter().map(UnitState::agent).collect()
    }

    pub fn actions(&self) -> &ActionArena {
        &self.actions
    }

    pub fn actions_mut(&mut self) -> &mut ActionArena {
        &mut self.actions
    }

    /// Inserts `action` and appends it to the plan of the unit at `index`.
    pub fn push_action_at(&mut self, index: usize, action: UnitAction) -> ActionId {
        let id = self.actions.insert(action);
        self.units[index].push_action(id);
        id
    }

    pub fn push_action(&mut self, agent: AgentId, action: UnitAction) -> Result<ActionId> {
        let index = self.index_of(agent).ok_or(SquadError::UnknownUnit(agent))?;
        Ok(self.push_action_at(index, action))
    }

    /// `action` may not run before `blocker` is destroyed.
    pub fn block(&mut self, action: ActionId, blocker: ActionId) -> Result<()> {
        self.actions.block(action, blocker)
    }

    pub fn execute_task_at(&mut self, index: usize, sink: &mut dyn SignalSink) {
        let Roster { units, actions } = self;
        units[index].execute_task(actions, sink);
    }

    pub fn execute_task(&mut self, agent: AgentId, sink: &mut dyn SignalSink) -> Result<()> {
        let index = self.index_of(agent).ok_or(SquadError::UnknownUnit(agent))?;
        self.execute_task_at(index, sink);
        Ok(())
    }

    /// Lets every unit advance its plan, in roster order.
    pub fn execute_all(&mut self, sink: &mut dyn SignalSink) {
        let Roster { units, actions } = self;
        for unit in units.iter_mut() {
            unit.execute_task(actions, sink);
        }
    }

    pub fn task_executed(&mut self, agent: AgentId) -> Result<()> {
        let Roster { units, actions } = self;
        let unit = units
            .iter_mut()
            .find(|u| u.agent() == agent)
            .ok_or(SquadError::UnknownUnit(agent))?;
        unit.task_executed(actions);
        Ok(())
    }

    pub fn clear_planning_at(&mut self, index: usize, max_priority: Option<ActionPriority>) {
        let Roster { units, actions } = self;
        units[index].clear_planning(actions, max_priority);
    }

    pub fn clear_planning(
        &mut self,
        agent: AgentId,
        max_priority: Option<ActionPriority>,
    ) -> Result<()> {
        let index = self.index_of(agent).ok_or(SquadError::UnknownUnit(agent))?;
        self.clear_planning_at(index, max_priority);
        Ok(())
    }

    pub fn is_blocked_at(&self, index: usize) -> bool {
        self.units[index].is_blocked(&self.actions)
    }

    pub fn all_plans_finished(&self) -> bool {
        self.units.iter().all(UnitState::is_plan_finished)
    }
}
