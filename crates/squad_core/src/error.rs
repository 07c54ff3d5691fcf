use thiserror::Error;

use crate::types::AgentId;
use crate::unit::ActionId;

#[derive(Error, Debug)]
pub enum SquadError {
    #[error("Stale action handle: {0:?}")]
    StaleAction(ActionId),

    #[error("Unknown unit: {0}")]
    UnknownUnit(AgentId),

    #[error("Unit already in roster: {0}")]
    DuplicateUnit(AgentId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

/// Reason a tactic stopped with a failed status.
///
/// Failures are final for the tactic instance; the leader discards it.
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TacticFailure {
    #[error("no live group target for longer than the time limit")]
    TargetLostTimeout,

    #[error("beacon has no position")]
    BeaconUnavailable,

    #[error("formation '{0}' could not be created")]
    FormationUnavailable(String),
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decompression error")]
    Decompression,

    #[error("Corrupted data")]
    Corrupted,

    #[error("Checksum mismatch")]
    ChecksumMismatch,

    #[error("Version mismatch: found {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },
}

impl PersistError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            PersistError::Io(_) => true,
            PersistError::Corrupted => false,
            PersistError::ChecksumMismatch => false,
            // Older snapshots are not migrated.
            PersistError::VersionMismatch { .. } => false,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, SquadError>;
