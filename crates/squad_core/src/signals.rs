//! Signal vocabulary exchanged with agents.
//!
//! Agents talk to the coordinator with named signals and an optional payload.
//! Names are the external contract; inside the core they are closed enums
//! resolved once through [`InboundKind::from_name`].

use serde::{Deserialize, Serialize};

use crate::types::{vec3_zero, AgentId, Vec3};

/// Structured payload attached to a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalData {
    pub point: Vec3,
    pub point2: Vec3,
    pub i_value: i32,
    pub i_value2: i32,
    pub f_value: f32,
    /// Entity id of a referenced agent, 0 when unused.
    pub n_id: u32,
    pub string: String,
}

impl Default for SignalData {
    fn default() -> Self {
        Self {
            point: vec3_zero(),
            point2: vec3_zero(),
            i_value: 0,
            i_value2: 0,
            f_value: 0.0,
            n_id: 0,
            string: String::new(),
        }
    }
}

impl SignalData {
    pub fn with_point(point: Vec3) -> Self {
        Self { point, ..Self::default() }
    }

    pub fn with_points(point: Vec3, point2: Vec3) -> Self {
        Self { point, point2, ..Self::default() }
    }

    pub fn with_int(i_value: i32) -> Self {
        Self { i_value, ..Self::default() }
    }

    pub fn with_float(f_value: f32) -> Self {
        Self { f_value, ..Self::default() }
    }
}

/// Signals the coordinator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InboundKind {
    // Search
    UnitMoving,
    UnitStop,
    UnitDamaged,
    SearchOrder,
    // Switch positions
    FormationPointReached,
    AttackOrder,
    RequestUpdate,
    RequestUpdateAlternative,
    ClearSpotList,
    RequestUpdateTowards,
    CheckDeadTarget,
    AddDangerPoint,
    SetDistanceToTarget,
    ExecutingSpecialAction,
    SpecialActionDone,
    SetMinDistanceToTarget,
}

const INBOUND_NAMES: &[(InboundKind, &str)] = &[
    (InboundKind::UnitMoving, "OnUnitMoving"),
    (InboundKind::UnitStop, "OnUnitStop"),
    (InboundKind::UnitDamaged, "OnUnitDamaged"),
    (InboundKind::SearchOrder, "ORDER_SEARCH"),
    (InboundKind::FormationPointReached, "OnFormationPointReached"),
    (InboundKind::AttackOrder, "ORDER_ATTACK"),
    (InboundKind::RequestUpdate, "OnRequestUpdate"),
    (InboundKind::RequestUpdateAlternative, "OnRequestUpdateAlternative"),
    (InboundKind::ClearSpotList, "OnClearSpotList"),
    (InboundKind::RequestUpdateTowards, "OnRequestUpdateTowards"),
    (InboundKind::CheckDeadTarget, "OnCheckDeadTarget"),
    (InboundKind::AddDangerPoint, "AddDangerPoint"),
    (InboundKind::SetDistanceToTarget, "SetDistanceToTarget"),
    (InboundKind::ExecutingSpecialAction, "OnExecutingSpecialAction"),
    (InboundKind::SpecialActionDone, "OnSpecialActionDone"),
    (InboundKind::SetMinDistanceToTarget, "SetMinDistanceToTarget"),
];

impl InboundKind {
    pub fn from_name(name: &str) -> Option<Self> {
        INBOUND_NAMES.iter().find(|(_, n)| *n == name).map(|(kind, _)| *kind)
    }

    pub fn name(self) -> &'static str {
        INBOUND_NAMES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, n)| *n)
            .unwrap_or("")
    }
}

/// A signal delivered to the coordinator by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub name: String,
    pub sender: AgentId,
    #[serde(default)]
    pub data: SignalData,
}

impl SignalEvent {
    pub fn new(name: impl Into<String>, sender: AgentId) -> Self {
        Self { name: name.into(), sender, data: SignalData::default() }
    }

    pub fn with_data(name: impl Into<String>, sender: AgentId, data: SignalData) -> Self {
        Self { name: name.into(), sender, data }
    }

    pub fn from_kind(kind: InboundKind, sender: AgentId, data: SignalData) -> Self {
        Self { name: kind.name().to_string(), sender, data }
    }

    pub fn kind(&self) -> Option<InboundKind> {
        InboundKind::from_name(&self.name)
    }
}

/// Fixed orders dispatched by plan execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    Search,
    AcquireTarget,
    CoverSearch,
}

impl Order {
    pub fn name(self) -> &'static str {
        match self {
            Order::Search => "ORDER_SEARCH",
            Order::AcquireTarget => "ORDER_ACQUIRE_TARGET",
            Order::CoverSearch => "ORDER_COVER_SEARCH",
        }
    }
}

/// Signals the coordinator emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outbound {
    NavTypeChanged,
    TargetNavTypeChanged,
    NotBehind,
    Behind,
    AttackSwitchPosition,
    AttackShootSpot,
    AvoidDanger,
    SpecialAction,
    LeaderTooFar,
    NoGroupTarget,
    CheckDeadBody,
    FireDisabled,
    Order(Order),
    /// Free-form signal text carried by a plan action.
    Plan(String),
}

impl Outbound {
    pub fn name(&self) -> &str {
        match self {
            Outbound::NavTypeChanged => "OnNavTypeChanged",
            Outbound::TargetNavTypeChanged => "OnTargetNavTypeChanged",
            Outbound::NotBehind => "OnNotBehind",
            Outbound::Behind => "OnBehind",
            Outbound::AttackSwitchPosition => "OnAttackSwitchPosition",
            Outbound::AttackShootSpot => "OnAttackShootSpot",
            Outbound::AvoidDanger => "OnAvoidDanger",
            Outbound::SpecialAction => "OnSpecialAction",
            Outbound::LeaderTooFar => "OnLeaderTooFar",
            Outbound::NoGroupTarget => "OnNoGroupTarget",
            Outbound::CheckDeadBody => "OnCheckDeadBody",
            Outbound::FireDisabled => "OnFireDisabled",
            Outbound::Order(order) => order.name(),
            Outbound::Plan(text) => text.as_str(),
        }
    }

    /// Resolves plan signal text: known names map to their variant, anything
    /// else stays free-form.
    pub fn from_name(text: &str) -> Self {
        const FIXED: &[Outbound] = &[
            Outbound::NavTypeChanged,
            Outbound::TargetNavTypeChanged,
            Outbound::NotBehind,
            Outbound::Behind,
            Outbound::AttackSwitchPosition,
            Outbound::AttackShootSpot,
            Outbound::AvoidDanger,
            Outbound::SpecialAction,
            Outbound::LeaderTooFar,
            Outbound::NoGroupTarget,
            Outbound::CheckDeadBody,
            Outbound::FireDisabled,
            Outbound::Order(Order::Search),
            Outbound::Order(Order::AcquireTarget),
            Outbound::Order(Order::CoverSearch),
        ];
        FIXED
            .iter()
            .find(|s| s.name() == text)
            .cloned()
            .unwrap_or_else(|| Outbound::Plan(text.to_string()))
    }
}

/// A signal sent from the coordinator to one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSignal {
    pub to: AgentId,
    pub signal: Outbound,
    pub data: SignalData,
}

impl AgentSignal {
    pub fn name(&self) -> &str {
        self.signal.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_names_round_trip() {
        for (kind, name) in INBOUND_NAMES {
            assert_eq!(InboundKind::from_name(name), Some(*kind));
            assert_eq!(kind.name(), *name);
        }
    }

    #[test]
    fn test_unknown_name_is_none() {
        assert_eq!(InboundKind::from_name("OnSomethingElse"), None);
        assert_eq!(InboundKind::from_name("onunitmoving"), None);
    }

    #[test]
    fn test_plan_signal_uses_text() {
        let s = Outbound::Plan("OnHoldPosition".to_string());
        assert_eq!(s.name(), "OnHoldPosition");
        assert_eq!(Outbound::Order(Order::AcquireTarget).name(), "ORDER_ACQUIRE_TARGET");
    }

    #[test]
    fn test_plan_text_resolves_known_names() {
        assert_eq!(Outbound::from_name("OnAttackShootSpot"), Outbound::AttackShootSpot);
        assert_eq!(Outbound::from_name("ORDER_COVER_SEARCH"), Outbound::Order(Order::CoverSearch));
        assert_eq!(
            Outbound::from_name("OnHoldPosition"),
            Outbound::Plan("OnHoldPosition".to_string())
        );
    }
}
