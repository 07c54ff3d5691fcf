//! # Squad leader
//!
//! Owns the roster, the beacon and the active tactic, and drives them one
//! frame at a time. The surrounding engine supplies the services and the
//! signal sink on every call; the leader keeps no reference to either.
//!
//! ## Frame order
//! 1. Advance the clock
//! 2. Update the active tactic
//! 3. Exit and discard the tactic when it reported Done or Failed
//! 4. Let every unit advance its plan, in roster order

use serde::{Deserialize, Serialize};

use crate::beacon::Beacon;
use crate::config::TacticsConfig;
use crate::error::{Result, SquadError};
use crate::services::{SignalSink, TacticalServices};
use crate::signals::SignalEvent;
use crate::tactics::{ActionStatus, LeaderActionParams, Tactic, TacticContext};
use crate::types::AgentId;
use crate::unit::{Roster, UnitProperties, UnitState};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SquadLeader {
    roster: Roster,
    beacon: Beacon,
    tactic: Option<Tactic>,
    config: TacticsConfig,
    /// Agent leading the squad in the world, if any.
    leader_agent: Option<AgentId>,
    /// Accumulated simulation time in seconds.
    clock: f32,
}

impl SquadLeader {
    pub fn new(config: TacticsConfig) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn with_leader_agent(mut self, agent: AgentId) -> Self {
        self.leader_agent = Some(agent);
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    pub fn beacon(&self) -> &Beacon {
        &self.beacon
    }

    pub fn beacon_mut(&mut self) -> &mut Beacon {
        &mut self.beacon
    }

    pub fn tactic(&self) -> Option<&Tactic> {
        self.tactic.as_ref()
    }

    pub fn config(&self) -> &TacticsConfig {
        &self.config
    }

    pub fn leader_agent(&self) -> Option<AgentId> {
        self.leader_agent
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn add_unit(&mut self, agent: AgentId, properties: UnitProperties) -> Result<&mut UnitState> {
        log::debug!("{} joins the squad", agent);
        self.roster.add_unit(agent, properties)
    }

    /// Removes a unit and destroys its plan. The active tactic keeps running
    /// and gives up whatever it had reserved for the unit.
    pub fn remove_unit(&mut self, agent: AgentId) -> Result<UnitState> {
        log::debug!("{} leaves the squad", agent);
        let unit = self.roster.remove_unit(agent)?;
        if let Some(tactic) = self.tactic.as_mut() {
            tactic.unit_removed(&unit);
        }
        Ok(unit)
    }

    /// Replaces the active tactic. The previous one gets its exit call first.
    pub fn start_tactic(
        &mut self,
        services: &dyn TacticalServices,
        sink: &mut dyn SignalSink,
        params: &LeaderActionParams,
    ) -> &Tactic {
        self.stop_tactic(services, sink);
        log::info!("starting {:?} tactic", params.action_type);
        self.tactic.insert(Tactic::create(params, &self.config))
    }

    /// Exits and drops the active tactic, if any.
    pub fn stop_tactic(&mut self, services: &dyn TacticalServices, sink: &mut dyn SignalSink) {
        let SquadLeader { roster, beacon, tactic, config, leader_agent, clock } = self;
        if let Some(mut previous) = tactic.take() {
            let mut ctx = TacticContext {
                roster,
                beacon,
                services,
                sink,
                config,
                leader_agent: *leader_agent,
                now: *clock,
                dt: 0.0,
            };
            previous.on_exit(&mut ctx);
        }
    }

    /// Runs one frame. Returns the tactic status, `None` without a tactic.
    pub fn update(
        &mut self,
        services: &dyn TacticalServices,
        sink: &mut dyn SignalSink,
        dt: f32,
    ) -> Option<ActionStatus> {
        self.clock += dt;
        let SquadLeader { roster, beacon, tactic, config, leader_agent, clock } = self;

        let status = match tactic.as_mut() {
            Some(active) => {
                let mut ctx = TacticContext {
                    roster: &mut *roster,
                    beacon,
                    services,
                    sink: &mut *sink,
                    config,
                    leader_agent: *leader_agent,
                    now: *clock,
                    dt,
                };
                let status = active.update(&mut ctx);
                if status.is_finished() {
                    log::info!("{:?} tactic finished: {:?}", active.action_type(), status);
                    active.on_exit(&mut ctx);
                }
                Some(status)
            }
            None => None,
        };

        if status.as_ref().is_some_and(ActionStatus::is_finished) {
            *tactic = None;
        }

        roster.execute_all(sink);
        status
    }

    /// Delivers an inbound signal to the active tactic. Returns whether it was handled.
    pub fn process_signal(
        &mut self,
        services: &dyn TacticalServices,
        sink: &mut dyn SignalSink,
        event: &SignalEvent,
    ) -> bool {
        let SquadLeader { roster, beacon, tactic, config, leader_agent, clock } = self;
        let Some(active) = tactic.as_mut() else {
            return false;
        };
        let mut ctx = TacticContext {
            roster,
            beacon,
            services,
            sink,
            config,
            leader_agent: *leader_agent,
            now: *clock,
            dt: 0.0,
        };
        let handled = active.process_signal(&mut ctx, event);
        if !handled {
            log::debug!("{} from {} not handled", event.name, event.sender);
        }
        handled
    }

    /// The agent finished its current blocking action.
    pub fn task_executed(&mut self, agent: AgentId) -> Result<()> {
        self.roster.task_executed(agent)
    }

    pub fn suspend_unit(&mut self, agent: AgentId) -> Result<()> {
        self.unit_mut(agent)?.suspend_task();
        Ok(())
    }

    pub fn resume_unit(&mut self, agent: AgentId) -> Result<()> {
        self.unit_mut(agent)?.resume_task();
        Ok(())
    }

    fn unit_mut(&mut self, agent: AgentId) -> Result<&mut UnitState> {
        self.roster
            .get_mut(agent)
            .ok_or(SquadError::UnknownUnit(agent))
    }
}
