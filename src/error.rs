//! Error types for simulation, planning, and configuration.

use thiserror::Error;

use crate::models::{MachineId, MachineType, OperationId};
use crate::sim::ProcessId;
use crate::validation::ValidationError;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A plan places two operations on the same machine or work order
    /// at overlapping times.
    #[error("plan overlap on {resource}: {first} overlaps {second}")]
    PlanOverlap {
        resource: String,
        first: OperationId,
        second: OperationId,
    },

    /// A completion was reported for an operation that is not active.
    #[error("completed operation {operation} is not among the operations to simulate")]
    UnknownCompletion { operation: OperationId },

    /// A distribution was constructed with invalid parameters.
    #[error("invalid distribution {name}: {reason}")]
    InvalidDistribution { name: String, reason: String },

    /// An operation requires a machine type no machine provides.
    #[error("no machine of type {machine_type} for operation {operation}")]
    NoMachineForType {
        machine_type: MachineType,
        operation: OperationId,
    },

    /// Structural validation of the input model failed.
    #[error("invalid input: {}", summarize(.0))]
    InvalidInput(Vec<ValidationError>),

    #[error("unknown machine {0}")]
    UnknownMachine(MachineId),

    #[error("unknown operation {0}")]
    UnknownOperation(OperationId),

    /// A simulation process was resumed in a state it cannot handle.
    #[error("process {process} faulted: {reason}")]
    ProcessFault { process: ProcessId, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
