//! Work operations: the unit that is planned and simulated.
//!
//! An operation is one position of a work plan instantiated for one work
//! order. It carries four planned timestamps, its routing neighbours, and
//! the machine it is currently assigned to.
//!
//! # State Lifecycle
//!
//! ```text
//! Created ──plan──▶ Scheduled ──enqueue──▶ Pending ──start──▶ InProgress ──▶ Completed
//!                       ▲                    │  ▲                 │
//!                       └──dropped by plan───┘  └───interrupted───┘
//! ```

use serde::{Deserialize, Serialize};

use super::{
    InfluenceFactors, MachineId, MachineType, OperationId, ProductionFeedback, ToolId,
    WorkOrderId, WorkPlanPosition,
};

/// Lifecycle state of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OperationState {
    /// Never planned.
    #[default]
    Created,
    /// Has planned timings; not queued on a machine.
    Scheduled,
    /// Queued on a machine, not started.
    Pending,
    /// Being processed.
    InProgress,
    /// Finished.
    Completed,
}

impl OperationState {
    /// Whether the planner may (re)plan an operation in this state.
    #[inline]
    pub fn is_plannable(self) -> bool {
        !matches!(self, Self::InProgress | Self::Completed)
    }
}

/// One processing step of one work order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOperation {
    pub id: OperationId,
    pub work_order: WorkOrderId,
    /// The routing step this operation instantiates.
    pub position: WorkPlanPosition,
    pub state: OperationState,
    /// Assigned machine, if currently planned.
    pub machine: Option<MachineId>,
    pub earliest_start_ms: i64,
    pub earliest_finish_ms: i64,
    pub latest_start_ms: i64,
    pub latest_finish_ms: i64,
    pub predecessor: Option<OperationId>,
    pub successor: Option<OperationId>,
    pub actual_start_ms: Option<i64>,
    pub actual_finish_ms: Option<i64>,
    /// Factors observed when processing started.
    pub influence_factors: InfluenceFactors,
    /// Feedback records reported for this operation.
    pub feedbacks: Vec<ProductionFeedback>,
}

impl WorkOperation {
    /// Creates an unplanned operation.
    pub fn new(id: OperationId, work_order: WorkOrderId, position: WorkPlanPosition) -> Self {
        Self {
            id,
            work_order,
            position,
            state: OperationState::Created,
            machine: None,
            earliest_start_ms: 0,
            earliest_finish_ms: 0,
            latest_start_ms: 0,
            latest_finish_ms: 0,
            predecessor: None,
            successor: None,
            actual_start_ms: None,
            actual_finish_ms: None,
            influence_factors: InfluenceFactors::new(),
            feedbacks: Vec::new(),
        }
    }

    /// Nominal duration (ms).
    #[inline]
    pub fn duration_ms(&self) -> i64 {
        self.position.duration_ms
    }

    #[inline]
    pub fn machine_type(&self) -> MachineType {
        self.position.machine_type
    }

    #[inline]
    pub fn tool(&self) -> ToolId {
        self.position.tool
    }

    /// Planned start; machines wait until this time before processing.
    #[inline]
    pub fn planned_start_ms(&self) -> i64 {
        self.earliest_start_ms
    }

    /// Sets all four planned timestamps from a start time and the nominal duration.
    pub fn set_planned_start(&mut self, start_ms: i64) {
        let finish = start_ms + self.duration_ms();
        self.earliest_start_ms = start_ms;
        self.latest_start_ms = start_ms;
        self.earliest_finish_ms = finish;
        self.latest_finish_ms = finish;
    }

    /// Adds `delay_ms` to all four planned timestamps.
    pub fn shift(&mut self, delay_ms: i64) {
        self.earliest_start_ms += delay_ms;
        self.earliest_finish_ms += delay_ms;
        self.latest_start_ms += delay_ms;
        self.latest_finish_ms += delay_ms;
    }

    /// Short label for logs: `"<position> (<work order>)"`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.position.name, self.work_order)
    }
}
