//! Giffler-Thompson active schedule generation.
//!
//! # Algorithm
//!
//! 1. Ready set S: operations without predecessor, or whose predecessor is
//!    in progress or completed. Each starts no earlier than `now`, its
//!    predecessor's planned finish, and its machine type's next free time.
//! 2. Let `f*` be the minimum earliest finish over S; the conflict map holds
//!    one representative per machine type among operations finishing at `f*`.
//! 3. While the conflict map is not empty: pick a machine type by policy,
//!    take every S operation of that type starting before the
//!    representative's finish, and let the rule engine choose one.
//! 4. Place the choice on the type's machine that frees up first; push later
//!    operations of the type forward; release its routing successor.
//! 5. Repeat from 2 until S is empty.
//!
//! Operations whose machine type has no machine in the input, and their
//! routing successors, are reported as unscheduled.
//!
//! # Complexity
//! O(n² · r) for n operations and r rules.
//!
//! # Reference
//! Giffler & Thompson (1960), "Algorithms for Solving Production-Scheduling
//! Problems", Operations Research 8(4)

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use super::{MachineTypePolicy, Planner};
use crate::dispatching::{Candidate, RuleEngine, SchedulingContext};
use crate::error::Result;
use crate::models::{
    Assignment, MachineId, MachineType, OperationId, OperationState, Plan, Workshop,
};

/// Giffler-Thompson planner with a pluggable conflict rule.
///
/// # Example
///
/// ```
/// use jobshop_sim::models::{Machine, MachineType, ToolId, WorkPlan, WorkPlanPosition, Workshop};
/// use jobshop_sim::planner::{GifflerThompsonPlanner, Planner};
///
/// let mut workshop = Workshop::new();
/// let m = workshop.add_machine(Machine::new("M1", MachineType(1)));
/// let plan = WorkPlan::new("Part")
///     .with_position(WorkPlanPosition::new("Cut", 1000, MachineType(1), ToolId(1)));
/// let po = workshop.add_production_order("PO", &plan, 2).unwrap();
/// let ops = workshop.operations_of(po);
///
/// let mut planner = GifflerThompsonPlanner::new();
/// let result = planner.schedule(&workshop, &ops, &[m], 0).unwrap();
/// assert_eq!(result.assignment_count(), 2);
/// assert_eq!(result.makespan_ms(), 2000);
/// ```
#[derive(Debug, Clone)]
pub struct GifflerThompsonPlanner {
    rule_engine: RuleEngine,
    policy: MachineTypePolicy,
    type_rng: Option<StdRng>,
}

impl GifflerThompsonPlanner {
    /// SPT conflict rule, lowest-type-id tie-break.
    pub fn new() -> Self {
        Self {
            rule_engine: RuleEngine::spt(),
            policy: MachineTypePolicy::LowestTypeId,
            type_rng: None,
        }
    }

    /// Replaces the conflict rule engine.
    pub fn with_rule_engine(mut self, engine: RuleEngine) -> Self {
        self.rule_engine = engine;
        self
    }

    /// Sets the machine-type tie-break policy.
    pub fn with_policy(mut self, policy: MachineTypePolicy) -> Self {
        self.type_rng = match policy {
            MachineTypePolicy::LowestTypeId => None,
            MachineTypePolicy::Seeded(seed) => Some(StdRng::seed_from_u64(seed)),
        };
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MachineTypePolicy {
        self.policy
    }

    fn pick_type(&mut self, conflicts: &BTreeMap<MachineType, OperationId>) -> Option<MachineType> {
        match self.type_rng.as_mut() {
            None => conflicts.keys().next().copied(),
            Some(rng) => {
                if conflicts.is_empty() {
                    return None;
                }
                let i = rng.random_range(0..conflicts.len());
                conflicts.keys().nth(i).copied()
            }
        }
    }
}

impl Default for GifflerThompsonPlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable bookkeeping of one planning run.
struct PlanningState {
    candidates: HashMap<OperationId, Candidate>,
    successors: HashMap<OperationId, OperationId>,
    /// Ready set, in release order.
    ready: Vec<OperationId>,
    machines_by_type: BTreeMap<MachineType, Vec<MachineId>>,
    machine_free: HashMap<MachineId, i64>,
    type_free: BTreeMap<MachineType, i64>,
    context: SchedulingContext,
}

impl PlanningState {
    /// Adds an operation to the ready set, starting no earlier than
    /// `earliest_ms`. Operations of a type without machines stay out.
    fn release(&mut self, id: OperationId, earliest_ms: i64) {
        let Some(candidate) = self.candidates.get_mut(&id) else {
            return;
        };
        let Some(&type_free) = self.type_free.get(&candidate.machine_type) else {
            return;
        };
        candidate.start_ms = earliest_ms.max(type_free);
        self.ready.push(id);
    }

    fn min_finish(&self) -> Option<i64> {
        self.ready
            .iter()
            .filter_map(|id| self.candidates.get(id))
            .map(Candidate::finish_ms)
            .min()
    }

    /// One representative per machine type among ready operations finishing at `finish_ms`.
    fn conflicts_at(&self, finish_ms: i64) -> BTreeMap<MachineType, OperationId> {
        let mut conflicts = BTreeMap::new();
        for id in &self.ready {
            if let Some(c) = self.candidates.get(id) {
                if c.finish_ms() == finish_ms {
                    conflicts.entry(c.machine_type).or_insert(*id);
                }
            }
        }
        conflicts
    }

    /// Ready operations of `machine_type` that start before `before_ms`, plus `always`.
    fn contenders(
        &self,
        machine_type: MachineType,
        before_ms: i64,
        always: OperationId,
    ) -> Vec<&Candidate> {
        self.ready
            .iter()
            .filter_map(|id| self.candidates.get(id))
            .filter(|c| {
                c.machine_type == machine_type && (c.start_ms < before_ms || c.operation == always)
            })
            .collect()
    }

    /// Places `id` on the earliest-free machine of its type.
    fn commit(&mut self, id: OperationId) -> Option<Assignment> {
        let candidate = self.candidates.get(&id)?.clone();
        let machine_type = candidate.machine_type;

        let machine = self
            .machines_by_type
            .get(&machine_type)?
            .iter()
            .copied()
            .min_by_key(|m| self.machine_free.get(m).copied().unwrap_or(i64::MAX))?;
        let machine_free = self.machine_free.get(&machine).copied().unwrap_or(0);

        let start = candidate.start_ms.max(machine_free);
        let finish = start + candidate.duration_ms;
        self.machine_free.insert(machine, finish);

        let type_free = self
            .machines_by_type
            .get(&machine_type)
            .into_iter()
            .flatten()
            .filter_map(|m| self.machine_free.get(m).copied())
            .min()
            .unwrap_or(finish);
        self.type_free.insert(machine_type, type_free);

        self.ready.retain(|r| *r != id);
        self.context
            .consume_work(candidate.work_order, candidate.duration_ms);

        for other in &self.ready {
            if let Some(c) = self.candidates.get_mut(other) {
                if c.machine_type == machine_type && c.start_ms < type_free {
                    c.start_ms = type_free;
                }
            }
        }

        if let Some(&successor) = self.successors.get(&id) {
            self.release(successor, finish);
        }

        Some(Assignment::new(
            id,
            candidate.work_order,
            machine,
            start,
            finish,
        ))
    }
}

impl Planner for GifflerThompsonPlanner {
    fn name(&self) -> &'static str {
        "Giffler-Thompson"
    }

    fn schedule_internal(
        &mut self,
        workshop: &Workshop,
        operations: &[OperationId],
        machines: &[MachineId],
        now_ms: i64,
    ) -> Result<Plan> {
        let mut plan = Plan::new(now_ms);

        let mut machines_by_type: BTreeMap<MachineType, Vec<MachineId>> = BTreeMap::new();
        let mut machine_free = HashMap::new();
        for &id in machines {
            let machine = workshop.machine(id)?;
            machines_by_type
                .entry(machine.machine_type)
                .or_default()
                .push(id);
            machine_free.insert(id, now_ms);
        }
        let type_free = machines_by_type.keys().map(|t| (*t, now_ms)).collect();

        let input: HashSet<OperationId> = operations.iter().copied().collect();
        let mut candidates = HashMap::with_capacity(operations.len());
        let mut successors = HashMap::new();
        let mut context = SchedulingContext::at_time(now_ms);
        for (sequence, &id) in operations.iter().enumerate() {
            let op = workshop.operation(id)?;
            *context.remaining_work.entry(op.work_order).or_insert(0) += op.duration_ms();
            if let Some(successor) = op.successor.filter(|s| input.contains(s)) {
                successors.insert(id, successor);
            }
            candidates.insert(
                id,
                Candidate {
                    operation: id,
                    work_order: op.work_order,
                    machine_type: op.machine_type(),
                    duration_ms: op.duration_ms(),
                    start_ms: now_ms,
                    sequence,
                },
            );
        }

        let mut state = PlanningState {
            candidates,
            successors,
            ready: Vec::new(),
            machines_by_type,
            machine_free,
            type_free,
            context,
        };

        for &id in operations {
            let op = workshop.operation(id)?;
            let earliest = match op.predecessor {
                None => Some(now_ms),
                Some(pred_id) => {
                    let pred = workshop.operation(pred_id)?;
                    match pred.state {
                        OperationState::InProgress => Some(now_ms.max(pred.latest_finish_ms)),
                        OperationState::Completed => Some(now_ms),
                        _ => None,
                    }
                }
            };
            if let Some(earliest) = earliest {
                state.release(id, earliest);
            }
        }

        while let Some(min_finish) = state.min_finish() {
            let mut conflicts = state.conflicts_at(min_finish);
            while let Some(machine_type) = self.pick_type(&conflicts) {
                let Some(representative) = conflicts.remove(&machine_type) else {
                    break;
                };
                let Some(rep_finish) = state
                    .candidates
                    .get(&representative)
                    .map(Candidate::finish_ms)
                else {
                    continue;
                };

                let contenders = state.contenders(machine_type, rep_finish, representative);
                let chosen = self
                    .rule_engine
                    .select_best(&contenders, &state.context)
                    .and_then(|i| contenders.get(i))
                    .map(|c| c.operation)
                    .unwrap_or(representative);

                if let Some(assignment) = state.commit(chosen) {
                    debug!(
                        operation = %assignment.operation,
                        machine = %assignment.machine,
                        start_ms = assignment.start_ms(),
                        finish_ms = assignment.finish_ms(),
                        "planned"
                    );
                    plan.add_assignment(assignment);
                }
            }
        }

        plan.unscheduled = operations
            .iter()
            .copied()
            .filter(|id| !plan.contains(*id))
            .collect();
        if !plan.is_complete() {
            warn!(
                unscheduled = plan.unscheduled.len(),
                at_ms = now_ms,
                "plan is incomplete: no available machine for some operations"
            );
        }

        Ok(plan)
    }
}
