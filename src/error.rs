use std::path::PathBuf;

use thiserror::Error;

use crate::types::AgentId;

/// Errors raised at the telemetry-source and configuration boundary.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Telemetry source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Failed to read replay file {path}: {source}")]
    ReplayIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse replay file {path}: {source}")]
    ReplayParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Replay file {0} contains no frames")]
    EmptyReplay(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load car class table {path}: {reason}")]
    ClassTable { path: PathBuf, reason: String },
}

/// Failure of a single agent's estimate. Never fatal to the tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
    #[error("Agent {agent}: non-finite input {field} = {value}")]
    NonFiniteInput {
        agent: AgentId,
        field: &'static str,
        value: f64,
    },

    #[error("Agent {agent}: non-finite {quantity} computed from sample")]
    NonFiniteCandidate {
        agent: AgentId,
        quantity: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
