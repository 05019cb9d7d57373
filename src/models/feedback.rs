//! Production feedback and influencing factors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{MachineId, MachineType, OperationId, WorkOrderId};

/// Named factor values observed when an operation starts, e.g.
/// `"NeededChangeover" -> 1.0`.
pub type InfluenceFactors = BTreeMap<String, f64>;

/// Factor set to 1.0 when a tool changeover preceded the operation.
pub const FACTOR_NEEDED_CHANGEOVER: &str = "NeededChangeover";
/// Factor holding the simulation time (ms) at which processing started.
pub const FACTOR_CURRENT_TIME: &str = "CurrentTime";

/// Completion record emitted once per finished operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionFeedback {
    /// Sequence number, unique within one controller.
    pub id: u64,
    pub operation: OperationId,
    pub work_order: WorkOrderId,
    pub machine: MachineId,
    pub machine_type: MachineType,
    /// Simulation time of completion (ms).
    pub created_at_ms: i64,
    pub is_finished: bool,
    pub done_total: u32,
    pub done_in_percent: f64,
    /// Planned earliest start at completion time (ms).
    pub planned_start_ms: i64,
    pub actual_start_ms: Option<i64>,
    pub influence_factors: InfluenceFactors,
}

impl ProductionFeedback {
    /// Completion time minus planned earliest start (ms).
    #[inline]
    pub fn lead_time_ms(&self) -> i64 {
        self.created_at_ms - self.planned_start_ms
    }

    /// Actual processing time, when the start was recorded (ms).
    pub fn processing_time_ms(&self) -> Option<i64> {
        self.actual_start_ms.map(|s| self.created_at_ms - s)
    }
}
