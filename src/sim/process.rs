//! Process identities, execution context, and domain events.

use rand::rngs::StdRng;
use std::fmt;

use super::EventScheduler;
use crate::models::{InfluenceFactors, MachineId, OperationId, Workshop};

/// Maps an influence-factor snapshot to a processing-time multiplier.
pub type DurationFactorFn = dyn Fn(&InfluenceFactors) -> f64 + Send + Sync;

/// Identifies a simulation process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcessId {
    /// The process driving one machine.
    Machine(MachineId),
    /// The periodic replanning timer.
    Replanning,
    /// The interrupt generator at this index of the configuration.
    Interrupts(usize),
    /// The order arrival generator.
    OrderGeneration,
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Machine(id) => write!(f, "{id}"),
            Self::Replanning => write!(f, "replanning"),
            Self::Interrupts(i) => write!(f, "interrupts[{i}]"),
            Self::OrderGeneration => write!(f, "order-generation"),
        }
    }
}

/// Shared state a process may touch while it runs.
pub struct ProcessContext<'a> {
    pub clock: &'a mut EventScheduler,
    pub workshop: &'a mut Workshop,
    pub rng: &'a mut StdRng,
    pub duration_factor: Option<&'a DurationFactorFn>,
    /// Fallback processing-time variation coefficient.
    pub variation_coefficient: f64,
}

/// Domain events raised by processes and handled by the controller.
///
/// The raising process stays blocked until the controller calls
/// [`Simulator::continue_run`](super::Simulator::continue_run).
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEvent {
    /// A machine finished an operation.
    OperationCompleted {
        at_ms: i64,
        operation: OperationId,
        machine: MachineId,
        influence_factors: InfluenceFactors,
    },
    /// The periodic replanning timer fired.
    Replanning { at_ms: i64 },
    /// Machines broke down.
    Interruption { at_ms: i64, machines: Vec<MachineId> },
    /// A machine was repaired.
    InterruptionHandled { at_ms: i64, machine: MachineId },
    /// A new production order should be generated.
    OrderGeneration { at_ms: i64 },
}

impl SimulationEvent {
    /// Time the event was raised (ms).
    pub fn at_ms(&self) -> i64 {
        match self {
            Self::OperationCompleted { at_ms, .. }
            | Self::Replanning { at_ms }
            | Self::Interruption { at_ms, .. }
            | Self::InterruptionHandled { at_ms, .. }
            | Self::OrderGeneration { at_ms } => *at_ms,
        }
    }

    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OperationCompleted { .. } => "OperationCompleted",
            Self::Replanning { .. } => "Replanning",
            Self::Interruption { .. } => "Interruption",
            Self::InterruptionHandled { .. } => "InterruptionHandled",
            Self::OrderGeneration { .. } => "OrderGeneration",
        }
    }
}
