//! Scheduling context for dispatching rule evaluation.

use std::collections::HashMap;

use crate::models::WorkOrderId;

/// Planning state passed to dispatching rules.
///
/// All times are in milliseconds relative to the simulation epoch.
#[derive(Debug, Clone, Default)]
pub struct SchedulingContext {
    /// Time the plan is computed for (ms).
    pub current_time_ms: i64,
    /// Unplanned processing work per work order (ms).
    pub remaining_work: HashMap<WorkOrderId, i64>,
}

impl SchedulingContext {
    /// Creates a context at the given time.
    pub fn at_time(current_time_ms: i64) -> Self {
        Self {
            current_time_ms,
            ..Default::default()
        }
    }

    /// Sets remaining work for a work order.
    pub fn with_remaining_work(mut self, work_order: WorkOrderId, ms: i64) -> Self {
        self.remaining_work.insert(work_order, ms);
        self
    }

    /// Subtracts planned work from a work order's remainder.
    pub fn consume_work(&mut self, work_order: WorkOrderId, ms: i64) {
        if let Some(rest) = self.remaining_work.get_mut(&work_order) {
            *rest = (*rest - ms).max(0);
        }
    }
}
