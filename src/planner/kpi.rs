//! Plan and production performance indicators.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan (C_max) | Latest planned finish |
//! | Utilization | Planned busy time / plan horizon, per machine |
//! | Lead time | Feedback time minus planned earliest start |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::HashMap;

use crate::models::{MachineId, MachineType, Plan, ProductionFeedback, Workshop};

/// Plan performance indicators. All time values are in milliseconds.
#[derive(Debug, Clone)]
pub struct PlanKpi {
    /// Latest planned finish (ms).
    pub makespan_ms: i64,
    /// Number of planned operations.
    pub scheduled: usize,
    /// Number of operations left unplanned.
    pub unscheduled: usize,
    /// Average utilization over machines that received work (0.0..1.0).
    pub avg_utilization: f64,
    /// Per-machine utilization over `[created_at, makespan)`.
    pub utilization_by_machine: HashMap<MachineId, f64>,
}

impl PlanKpi {
    /// Computes KPIs from a plan.
    pub fn calculate(plan: &Plan) -> Self {
        let makespan = plan.makespan_ms();
        let horizon = (makespan - plan.created_at_ms).max(0);

        let utilization_by_machine: HashMap<MachineId, f64> = plan
            .busy_time_by_machine()
            .into_iter()
            .map(|(machine, busy)| {
                let load = if horizon == 0 {
                    0.0
                } else {
                    busy as f64 / horizon as f64
                };
                (machine, load)
            })
            .collect();

        let avg_utilization = if utilization_by_machine.is_empty() {
            0.0
        } else {
            utilization_by_machine.values().sum::<f64>() / utilization_by_machine.len() as f64
        };

        Self {
            makespan_ms: makespan,
            scheduled: plan.assignment_count(),
            unscheduled: plan.unscheduled.len(),
            avg_utilization,
            utilization_by_machine,
        }
    }
}

/// Statistics over production feedback records.
#[derive(Debug, Clone, Copy)]
pub struct ProductionStats<'a> {
    feedbacks: &'a [ProductionFeedback],
}

impl<'a> ProductionStats<'a> {
    pub fn new(feedbacks: &'a [ProductionFeedback]) -> Self {
        Self { feedbacks }
    }

    /// Mean lead time over all records (ms), `None` without records.
    pub fn mean_lead_time_ms(&self) -> Option<f64> {
        mean(self.feedbacks.iter().map(|f| f.lead_time_ms() as f64))
    }

    /// Mean lead time of records produced on machines of one type (ms).
    pub fn mean_lead_time_for_type_ms(&self, machine_type: MachineType) -> Option<f64> {
        mean(
            self.feedbacks
                .iter()
                .filter(|f| f.machine_type == machine_type)
                .map(|f| f.lead_time_ms() as f64),
        )
    }

    /// Population variance of lead time (ms²).
    pub fn lead_time_variance(&self) -> Option<f64> {
        let mu = self.mean_lead_time_ms()?;
        mean(
            self.feedbacks
                .iter()
                .map(|f| (f.lead_time_ms() as f64 - mu).powi(2)),
        )
    }

    /// Standard deviation of lead time (ms).
    pub fn lead_time_std_dev(&self) -> Option<f64> {
        self.lead_time_variance().map(f64::sqrt)
    }

    /// Mean work-order lead time (completion minus first start) for one
    /// work plan, over completed work orders (ms).
    pub fn mean_lead_time_for_work_plan_ms(workshop: &Workshop, work_plan: &str) -> Option<f64> {
        mean(
            workshop
                .production_orders()
                .iter()
                .filter(|po| po.work_plan == work_plan)
                .flat_map(|po| po.work_orders.iter())
                .filter_map(|wo| workshop.work_order(*wo))
                .filter_map(|wo| Some((wo.completed_at_ms? - wo.started_at_ms?) as f64)),
        )
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}
