//! Error types for the simulation engine

use thiserror::Error;

use crate::policies::PolicyKind;
use crate::types::Trace;

/// Engine result type
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that can occur while preparing or running a simulation
#[derive(Error, Debug)]
pub enum SimError {
    /// Policy selector not in the supported set
    #[error("Unknown scheduling policy: {0}")]
    UnknownPolicy(String),

    /// Policy is declared but has no implementation
    #[error("Scheduling policy {0} is not implemented")]
    NotImplemented(PolicyKind),

    /// Empty process list
    #[error("No processes to simulate")]
    NoProcesses,

    /// Round Robin needs a quantum greater than zero
    #[error("Round Robin requires a quantum > 0, got {0:?}")]
    InvalidQuantum(Option<u32>),

    /// Process record rejected before the simulation loop
    #[error("Malformed process {id}: {reason}")]
    MalformedProcess { id: String, reason: String },

    /// Clock ran past the safety ceiling; carries the partial trace
    #[error("Simulation exceeded {limit} ticks without terminating every process")]
    TickLimitExceeded { limit: u32, partial: Box<Trace> },

    /// Input layer could not make sense of user-provided data
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SimError {
    /// Create a malformed-process error
    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedProcess {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Partial trace of an aborted run, if this error carries one
    pub fn partial_trace(&self) -> Option<&Trace> {
        match self {
            Self::TickLimitExceeded { partial, .. } => Some(partial),
            _ => None,
        }
    }
}
