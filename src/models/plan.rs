//! Plan (planner output) model.
//!
//! A plan assigns each planned operation a machine and four timestamps.
//! Operations that could not be planned, because no machine of their type
//! was available, are listed separately and make the plan incomplete.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::{MachineId, OperationId, OperationState, WorkOrderId, Workshop};
use crate::error::Result;
use crate::time::format_hms;

/// An operation-machine-time assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub operation: OperationId,
    /// Owning work order (denormalized for overlap checks).
    pub work_order: WorkOrderId,
    pub machine: MachineId,
    pub earliest_start_ms: i64,
    pub earliest_finish_ms: i64,
    pub latest_start_ms: i64,
    pub latest_finish_ms: i64,
}

impl Assignment {
    /// Creates an assignment with earliest and latest times equal.
    pub fn new(
        operation: OperationId,
        work_order: WorkOrderId,
        machine: MachineId,
        start_ms: i64,
        finish_ms: i64,
    ) -> Self {
        Self {
            operation,
            work_order,
            machine,
            earliest_start_ms: start_ms,
            earliest_finish_ms: finish_ms,
            latest_start_ms: start_ms,
            latest_finish_ms: finish_ms,
        }
    }

    /// Planned start (ms).
    #[inline]
    pub fn start_ms(&self) -> i64 {
        self.earliest_start_ms
    }

    /// Planned finish (ms).
    #[inline]
    pub fn finish_ms(&self) -> i64 {
        self.earliest_finish_ms
    }

    #[inline]
    pub fn duration_ms(&self) -> i64 {
        self.earliest_finish_ms - self.earliest_start_ms
    }
}

/// Output of a planner run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Time the plan was computed for (ms).
    pub created_at_ms: i64,
    /// Assignments in the order the planner made them.
    pub assignments: Vec<Assignment>,
    /// Operations that could not be planned, in input order.
    pub unscheduled: Vec<OperationId>,
}

impl Plan {
    /// Creates an empty plan.
    pub fn new(created_at_ms: i64) -> Self {
        Self {
            created_at_ms,
            ..Default::default()
        }
    }

    pub fn add_assignment(&mut self, assignment: Assignment) {
        self.assignments.push(assignment);
    }

    /// Whether every input operation received a machine and timings.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.unscheduled.is_empty()
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    /// Looks up the assignment of an operation.
    pub fn assignment_for(&self, operation: OperationId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.operation == operation)
    }

    pub fn contains(&self, operation: OperationId) -> bool {
        self.assignment_for(operation).is_some()
    }

    /// Assignments on one machine, ordered by start (stable).
    pub fn assignments_for_machine(&self, machine: MachineId) -> Vec<&Assignment> {
        let mut list: Vec<&Assignment> = self
            .assignments
            .iter()
            .filter(|a| a.machine == machine)
            .collect();
        list.sort_by_key(|a| a.start_ms());
        list
    }

    /// Assignments grouped by machine, each group ordered by start.
    pub fn by_machine(&self) -> BTreeMap<MachineId, Vec<&Assignment>> {
        let mut groups: BTreeMap<MachineId, Vec<&Assignment>> = BTreeMap::new();
        for a in &self.assignments {
            groups.entry(a.machine).or_default().push(a);
        }
        for group in groups.values_mut() {
            group.sort_by_key(|a| a.start_ms());
        }
        groups
    }

    /// Assignments grouped by work order, each group ordered by start.
    pub fn by_work_order(&self) -> BTreeMap<WorkOrderId, Vec<&Assignment>> {
        let mut groups: BTreeMap<WorkOrderId, Vec<&Assignment>> = BTreeMap::new();
        for a in &self.assignments {
            groups.entry(a.work_order).or_default().push(a);
        }
        for group in groups.values_mut() {
            group.sort_by_key(|a| a.start_ms());
        }
        groups
    }

    /// Latest planned finish, or `created_at_ms` for an empty plan.
    pub fn makespan_ms(&self) -> i64 {
        self.assignments
            .iter()
            .map(|a| a.finish_ms())
            .max()
            .unwrap_or(self.created_at_ms)
    }

    /// Planned busy time per machine (ms).
    pub fn busy_time_by_machine(&self) -> HashMap<MachineId, i64> {
        let mut busy = HashMap::new();
        for a in &self.assignments {
            *busy.entry(a.machine).or_insert(0) += a.duration_ms();
        }
        busy
    }

    /// Writes planned machines and timings onto the operations in `workshop`.
    ///
    /// Planned operations in state `Created` become `Scheduled`; queued
    /// (`Pending`) operations keep their state so the simulator can reconcile
    /// their queue placement. Unplanned operations lose their machine.
    pub fn apply(&self, workshop: &mut Workshop) -> Result<()> {
        for a in &self.assignments {
            let op = workshop.operation_mut(a.operation)?;
            op.machine = Some(a.machine);
            op.earliest_start_ms = a.earliest_start_ms;
            op.earliest_finish_ms = a.earliest_finish_ms;
            op.latest_start_ms = a.latest_start_ms;
            op.latest_finish_ms = a.latest_finish_ms;
            if op.state == OperationState::Created {
                op.state = OperationState::Scheduled;
            }
        }
        for &id in &self.unscheduled {
            let op = workshop.operation_mut(id)?;
            if op.state != OperationState::Pending {
                op.machine = None;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Plan @ {} ({} planned, {} unscheduled)",
            format_hms(self.created_at_ms),
            self.assignments.len(),
            self.unscheduled.len()
        )?;
        for (machine, group) in self.by_machine() {
            writeln!(f, "  {machine}:")?;
            for a in group {
                writeln!(
                    f,
                    "    {} {} [{} - {}]",
                    a.operation,
                    a.work_order,
                    format_hms(a.start_ms()),
                    format_hms(a.finish_ms())
                )?;
            }
        }
        if !self.unscheduled.is_empty() {
            let ids: Vec<String> = self.unscheduled.iter().map(|id| id.to_string()).collect();
            writeln!(f, "  unscheduled: {}", ids.join(", "))?;
        }
        Ok(())
    }
}
