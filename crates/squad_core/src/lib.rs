//! # squad_core - Squad tactical coordinator
//!
//! A squad leader turns high-level tactic requests ("search this area",
//! "rotate around the enemy in formation") into per-unit action plans and
//! coordinates them frame by frame.
//!
//! ## Layers
//! - [`unit`]: action arena with blocking links, per-unit plans, the roster
//! - [`tactics`]: the Search and SwitchPositions tactics
//! - [`leader`]: owns the roster and the active tactic, runs frames
//! - [`services`]: traits the host engine implements (agents, navigation, raycasts, spatial queries)
//! - [`scenario`]: a scripted in-memory world implementing every service
//! - [`persist`]: compressed, checksummed snapshots
//!
//! Everything runs on the caller's thread; nothing is shared or locked.

// Doc formatting lints - purely cosmetic, fix incrementally
#![allow(clippy::doc_lazy_continuation)]
// Struct initialization pattern used intentionally
#![allow(clippy::field_reassign_with_default)]
// Tactic helpers take the frame context plus several scoring inputs
#![allow(clippy::too_many_arguments)]
// Tactic enum carries the full tactic state by value
#![allow(clippy::large_enum_variant)]

pub mod beacon;
pub mod config;
pub mod debug_flags;
pub mod error;
pub mod formation;
pub mod leader;
pub mod persist;
pub mod scenario;
pub mod services;
pub mod signals;
pub mod tactics;
pub mod types;
pub mod unit;

pub use beacon::Beacon;
pub use config::TacticsConfig;
pub use error::{PersistError, Result, ScenarioError, SquadError, TacticFailure};
pub use formation::Formation;
pub use leader::SquadLeader;
pub use persist::{SquadSnapshot, SNAPSHOT_VERSION};
pub use scenario::{run_scenario, ScenarioReport, ScenarioSpec, ScenarioWorld};
pub use services::{RecordingSink, SignalSink, TacticalServices};
pub use signals::{AgentSignal, InboundKind, Outbound, SignalData, SignalEvent};
pub use tactics::{ActionStatus, LeaderActionParams, LeaderActionType, Tactic};
pub use types::{AgentId, NavInfo, NavType, Vec3};
pub use unit::{ActionArena, ActionId, Roster, UnitAction, UnitProperties, UnitState};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
