//! The replanning control loop.
//!
//! [`SimulationController`] owns a [`Simulator`] and a [`Planner`]. It
//! builds the initial plan, runs the clock, and reacts to every
//! [`SimulationEvent`] before the raising process may continue:
//!
//! | Event | Reaction |
//! |-------|----------|
//! | `OperationCompleted` | right-shift if late, bookkeeping, feedback |
//! | `Replanning` | replan if plannable work remains |
//! | `Interruption` | replan without the broken machines |
//! | `InterruptionHandled` | replan with the repaired machine |
//! | `OrderGeneration` | add a generated order, replan |
//!
//! Every replan schedules all plannable operations onto all available
//! machines, writes the plan onto the operations, and reconciles machine
//! queues with it.

mod right_shift;

pub use right_shift::propagate;

use std::fmt;

use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::error::{Error, Result};
use crate::generator::OrderGenerator;
use crate::models::{
    InfluenceFactors, MachineId, OperationId, Plan, ProductionFeedback, Workshop,
};
use crate::planner::{GifflerThompsonPlanner, PlanKpi, Planner, ProductionStats};
use crate::sim::{SimulationEvent, Simulator, Step};
use crate::validation::validate_input;

type EventObserver = Box<dyn FnMut(&SimulationEvent, &Plan)>;

/// Drives a simulation run and keeps its plan current.
///
/// # Example
///
/// ```
/// use jobshop_sim::config::SimulationConfig;
/// use jobshop_sim::controller::SimulationController;
/// use jobshop_sim::models::{Machine, MachineType, ToolId, WorkPlan, WorkPlanPosition, Workshop};
/// use jobshop_sim::time::{hours, minutes};
///
/// let mut workshop = Workshop::new();
/// workshop.add_machine(Machine::new("Lathe", MachineType(1)));
/// let plan = WorkPlan::new("Shaft")
///     .with_position(WorkPlanPosition::new("Turn", minutes(10), MachineType(1), ToolId(1)));
/// workshop.add_production_order("PO-1", &plan, 2).unwrap();
///
/// let config = SimulationConfig::default().with_variation_coefficient(0.0);
/// let mut controller = SimulationController::new(workshop, &config).unwrap();
/// controller.execute(hours(1)).unwrap();
/// assert_eq!(controller.feedbacks().len(), 2);
/// ```
pub struct SimulationController<P: Planner = GifflerThompsonPlanner> {
    simulator: Simulator,
    planner: P,
    operations_to_simulate: Vec<OperationId>,
    finished: Vec<OperationId>,
    current_plan: Plan,
    feedbacks: Vec<ProductionFeedback>,
    order_generator: Option<OrderGenerator>,
    observer: Option<EventObserver>,
    right_shifts: usize,
    replans: usize,
}

impl SimulationController<GifflerThompsonPlanner> {
    /// Creates a controller with a Giffler-Thompson planner using the
    /// configured machine-type policy.
    pub fn new(workshop: Workshop, config: &SimulationConfig) -> Result<Self> {
        let planner = GifflerThompsonPlanner::new().with_policy(config.machine_type_policy);
        Self::with_planner(workshop, config, planner)
    }
}

impl<P: Planner> SimulationController<P> {
    /// Creates a controller, computes the initial plan, and queues the
    /// operations that are ready.
    ///
    /// # Errors
    /// - [`Error::NoMachineForType`] if an operation needs a machine type no
    ///   machine has
    /// - configuration errors from [`SimulationConfig::validate`]
    pub fn with_planner(workshop: Workshop, config: &SimulationConfig, planner: P) -> Result<Self> {
        let operations_to_simulate: Vec<OperationId> = workshop
            .operations()
            .iter()
            .filter(|op| op.state.is_plannable())
            .map(|op| op.id)
            .collect();
        check_machine_types(&workshop, &operations_to_simulate)?;

        let simulator = Simulator::new(workshop, config)?;
        let mut controller = Self {
            current_plan: Plan::new(simulator.now_ms()),
            simulator,
            planner,
            operations_to_simulate,
            finished: Vec::new(),
            feedbacks: Vec::new(),
            order_generator: None,
            observer: None,
            right_shifts: 0,
            replans: 0,
        };
        controller.replan()?;
        Ok(controller)
    }

    /// Supplies the generator consulted on `OrderGeneration` events.
    ///
    /// # Errors
    /// [`Error::InvalidInput`] when a work plan the generator may draw is
    /// empty or cannot run on the workshop's machines.
    pub fn with_order_generator(mut self, generator: OrderGenerator) -> Result<Self> {
        validate_input(self.simulator.workshop().machines(), generator.work_plans())
            .map_err(Error::InvalidInput)?;
        self.order_generator = Some(generator);
        Ok(self)
    }

    /// Installs the processing-time multiplier hook.
    pub fn with_duration_factor<F>(mut self, factor: F) -> Self
    where
        F: Fn(&InfluenceFactors) -> f64 + Send + Sync + 'static,
    {
        self.simulator.set_duration_factor(Box::new(factor));
        self
    }

    /// Registers a callback invoked after each event has been handled, with
    /// the plan current at that point.
    pub fn on_event<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&SimulationEvent, &Plan) + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Replans at the current time and runs for `duration_ms`.
    pub fn execute(&mut self, duration_ms: i64) -> Result<()> {
        let horizon = self.simulator.now_ms() + duration_ms;
        self.execute_until(horizon)
    }

    /// Replans at the current time and runs until `horizon_ms`.
    ///
    /// # Errors
    /// Plan overlaps, bookkeeping violations, and process faults end the
    /// run; disruptions never do.
    pub fn execute_until(&mut self, horizon_ms: i64) -> Result<()> {
        self.replan()?;
        loop {
            match self.simulator.step(horizon_ms)? {
                Step::Event(event) => {
                    self.handle_event(&event)?;
                    if let Some(observer) = self.observer.as_mut() {
                        observer(&event, &self.current_plan);
                    }
                    self.simulator.continue_run()?;
                }
                Step::Advanced => {}
                Step::Finished => break,
            }
        }
        info!(
            at_ms = self.simulator.now_ms(),
            finished = self.finished.len(),
            remaining = self.operations_to_simulate.len(),
            replans = self.replans,
            right_shifts = self.right_shifts,
            "simulation paused"
        );
        Ok(())
    }

    fn handle_event(&mut self, event: &SimulationEvent) -> Result<()> {
        match event {
            SimulationEvent::OperationCompleted {
                at_ms,
                operation,
                machine,
                influence_factors,
            } => self.on_completed(*at_ms, *operation, *machine, influence_factors),
            SimulationEvent::Replanning { .. } => {
                let workshop = self.simulator.workshop();
                let mut plannable = self
                    .operations_to_simulate
                    .iter()
                    .filter_map(|id| workshop.operation(*id).ok());
                if plannable.any(|op| op.state.is_plannable()) {
                    self.replan()?;
                }
                Ok(())
            }
            SimulationEvent::Interruption { .. } | SimulationEvent::InterruptionHandled { .. } => {
                self.replan()
            }
            SimulationEvent::OrderGeneration { at_ms } => self.on_order_generation(*at_ms),
        }
    }

    fn on_completed(
        &mut self,
        at_ms: i64,
        operation: OperationId,
        machine: MachineId,
        influence_factors: &InfluenceFactors,
    ) -> Result<()> {
        let position = self
            .operations_to_simulate
            .iter()
            .position(|id| *id == operation)
            .ok_or(Error::UnknownCompletion { operation })?;

        let workshop = self.simulator.workshop_mut();
        let op = workshop.operation_mut(operation)?;
        if at_ms > op.latest_finish_ms {
            op.latest_finish_ms = at_ms;
            propagate(workshop, &self.operations_to_simulate, operation)?;
            self.right_shifts += 1;
        }
        self.operations_to_simulate.remove(position);
        self.finished.push(operation);

        let machine_type = workshop.machine(machine)?.machine_type;
        let op = workshop.operation_mut(operation)?;
        let feedback = ProductionFeedback {
            id: self.feedbacks.len() as u64,
            operation,
            work_order: op.work_order,
            machine,
            machine_type,
            created_at_ms: at_ms,
            is_finished: true,
            done_total: 1,
            done_in_percent: 100.0,
            planned_start_ms: op.earliest_start_ms,
            actual_start_ms: op.actual_start_ms,
            influence_factors: influence_factors.clone(),
        };
        op.feedbacks.push(feedback.clone());
        self.feedbacks.push(feedback);

        self.simulator.refresh_machines()
    }

    fn on_order_generation(&mut self, at_ms: i64) -> Result<()> {
        let Some(generator) = self.order_generator.as_mut() else {
            warn!(at_ms, "order generation fired without a generator");
            return Ok(());
        };
        let order = generator.generate(self.simulator.rng_mut())?;
        let workshop = self.simulator.workshop_mut();
        let po = workshop.add_production_order(order.name.as_str(), &order.work_plan, order.quantity)?;
        let operations = workshop.operations_of(po);
        check_machine_types(workshop, &operations)?;
        info!(
            order = %order.name,
            work_plan = %order.work_plan.name,
            quantity = order.quantity,
            at_ms,
            "production order generated"
        );
        self.operations_to_simulate.extend(operations);
        self.replan()
    }

    /// Plans every plannable operation onto every available machine at the
    /// current time and installs the result.
    fn replan(&mut self) -> Result<()> {
        let now = self.simulator.now_ms();
        let workshop = self.simulator.workshop();
        let mut operations = Vec::new();
        for &id in &self.operations_to_simulate {
            if workshop.operation(id)?.state.is_plannable() {
                operations.push(id);
            }
        }
        let machines = workshop.available_machine_ids();

        let plan = self.planner.schedule(workshop, &operations, &machines, now)?;
        plan.apply(self.simulator.workshop_mut())?;
        self.simulator.reconcile(&plan)?;
        self.replans += 1;
        info!(
            at_ms = now,
            planner = self.planner.name(),
            scheduled = plan.assignment_count(),
            makespan_ms = plan.makespan_ms(),
            "replanned"
        );
        self.current_plan = plan;
        Ok(())
    }

    pub fn now_ms(&self) -> i64 {
        self.simulator.now_ms()
    }

    pub fn workshop(&self) -> &Workshop {
        self.simulator.workshop()
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn current_plan(&self) -> &Plan {
        &self.current_plan
    }

    /// Operations not yet completed.
    pub fn operations_to_simulate(&self) -> &[OperationId] {
        &self.operations_to_simulate
    }

    /// Completed operations in completion order.
    pub fn finished_operations(&self) -> &[OperationId] {
        &self.finished
    }

    /// One record per completed operation.
    pub fn feedbacks(&self) -> &[ProductionFeedback] {
        &self.feedbacks
    }

    /// Number of late completions that triggered right-shift propagation.
    pub fn right_shift_count(&self) -> usize {
        self.right_shifts
    }

    pub fn replan_count(&self) -> usize {
        self.replans
    }

    pub fn stats(&self) -> ProductionStats<'_> {
        ProductionStats::new(&self.feedbacks)
    }

    /// KPIs of the current plan.
    pub fn plan_kpi(&self) -> PlanKpi {
        PlanKpi::calculate(&self.current_plan)
    }
}

impl<P: Planner> fmt::Debug for SimulationController<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationController")
            .field("planner", &self.planner.name())
            .field("simulator", &self.simulator)
            .field("operations_to_simulate", &self.operations_to_simulate.len())
            .field("finished", &self.finished.len())
            .field("replans", &self.replans)
            .field("right_shifts", &self.right_shifts)
            .finish()
    }
}

fn check_machine_types(workshop: &Workshop, operations: &[OperationId]) -> Result<()> {
    for &id in operations {
        let machine_type = workshop.operation(id)?.machine_type();
        if !workshop.has_machine_type(machine_type) {
            return Err(Error::NoMachineForType {
                machine_type,
                operation: id,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterruptConfig;
    use crate::models::{
        DiscreteDistribution, Machine, MachineType, OrderState, TimeDistribution, ToolId,
        WorkPlan, WorkPlanPosition,
    };
    use crate::time::{hours, minutes};
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::rc::Rc;

    fn quiet() -> SimulationConfig {
        SimulationConfig::default().with_variation_coefficient(0.0)
    }

    fn single_step(name: &str, duration_ms: i64, machine_type: u32) -> WorkPlan {
        WorkPlan::new(name).with_position(WorkPlanPosition::new(
            "X",
            duration_ms,
            MachineType(machine_type),
            ToolId(1),
        ))
    }

    /// One work order A(10) → B(20) → C(15) minutes on types 1, 2, 3.
    fn chain_workshop() -> Workshop {
        let mut ws = Workshop::new();
        for t in 1..=3 {
            ws.add_machine(Machine::new(format!("M{t}"), MachineType(t)));
        }
        let plan = WorkPlan::new("Chain")
            .with_position(WorkPlanPosition::new("A", minutes(10), MachineType(1), ToolId(1)))
            .with_position(WorkPlanPosition::new("B", minutes(20), MachineType(2), ToolId(1)))
            .with_position(WorkPlanPosition::new("C", minutes(15), MachineType(3), ToolId(1)));
        ws.add_production_order("PO-1", &plan, 1).unwrap();
        ws
    }

    #[test]
    fn test_end_to_end_chain() {
        let completions = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&completions);
        let mut controller = SimulationController::new(chain_workshop(), &quiet())
            .unwrap()
            .on_event(move |event, _| {
                if matches!(event, SimulationEvent::OperationCompleted { .. }) {
                    *counter.borrow_mut() += 1;
                }
            });

        controller.execute(hours(1)).unwrap();

        assert_eq!(*completions.borrow(), 3);
        assert_eq!(controller.right_shift_count(), 0);
        assert!(controller.operations_to_simulate().is_empty());
        assert_eq!(controller.finished_operations().len(), 3);
        let po = &controller.workshop().production_orders()[0];
        assert_eq!(po.state, OrderState::Completed);
        assert_eq!(po.completed_at_ms, Some(minutes(45)));
        let last = controller.feedbacks().last().unwrap();
        assert_eq!(last.created_at_ms, minutes(45));
        assert_eq!(last.machine, MachineId(2));
        assert_eq!(controller.now_ms(), hours(1));
    }

    #[test]
    fn test_conservation_across_partial_runs() {
        let mut controller = SimulationController::new(chain_workshop(), &quiet()).unwrap();
        let total = controller.operations_to_simulate().len();

        controller.execute(minutes(20)).unwrap();
        assert_eq!(controller.finished_operations().len(), 1);
        assert_eq!(
            controller.operations_to_simulate().len() + controller.finished_operations().len(),
            total
        );

        controller.execute(minutes(40)).unwrap();
        assert_eq!(controller.finished_operations().len(), total);
        assert!(controller.operations_to_simulate().is_empty());
    }

    #[test]
    fn test_interruption_restarts_operation() {
        let mut ws = Workshop::new();
        ws.add_machine(Machine::new("M", MachineType(1)));
        ws.add_production_order("PO", &single_step("P", minutes(10), 1), 1)
            .unwrap();
        let config = quiet().with_interrupt(
            InterruptConfig::new(
                TimeDistribution::Constant(minutes(2)),
                TimeDistribution::Constant(minutes(5)),
            )
            .with_max_occurrences(1),
        );
        let mut controller = SimulationController::new(ws, &config).unwrap();

        controller.execute(hours(1)).unwrap();

        let feedback = &controller.feedbacks()[0];
        assert_eq!(feedback.actual_start_ms, Some(minutes(7)));
        assert_eq!(feedback.created_at_ms, minutes(17));
        assert_eq!(controller.replan_count(), 4); // initial, execute, down, up
    }

    #[test]
    fn test_interrupted_machines_receive_no_work() {
        crate::logging::init_test();
        let mut ws = Workshop::new();
        ws.add_machine(Machine::new("M0", MachineType(1)));
        ws.add_machine(Machine::new("M1", MachineType(1)));
        let plan = WorkPlan::new("Two")
            .with_position(WorkPlanPosition::new("A", minutes(7), MachineType(1), ToolId(1)))
            .with_position(WorkPlanPosition::new("B", minutes(4), MachineType(1), ToolId(1)));
        ws.add_production_order("PO", &plan, 6).unwrap();
        let config = SimulationConfig::default()
            .with_seed(11)
            .with_replanning_interval(Some(minutes(30)))
            .with_interrupt(
                InterruptConfig::new(
                    TimeDistribution::Exponential {
                        mean_ms: minutes(15) as f64,
                    },
                    TimeDistribution::Uniform {
                        min_ms: minutes(2),
                        max_ms: minutes(6),
                    },
                )
                .with_machines(vec![MachineId(0)]),
            );

        let violations = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&violations);
        let mut down = BTreeSet::new();
        let mut controller = SimulationController::new(ws, &config)
            .unwrap()
            .on_event(move |event, plan| {
                match event {
                    SimulationEvent::Interruption { machines, .. } => down.extend(machines.iter().copied()),
                    SimulationEvent::InterruptionHandled { machine, .. } => {
                        down.remove(machine);
                    }
                    _ => {}
                }
                for a in &plan.assignments {
                    if down.contains(&a.machine) {
                        log.borrow_mut().push((event.at_ms(), a.operation, a.machine));
                    }
                }
            });

        controller.execute(hours(6)).unwrap();

        assert!(violations.borrow().is_empty(), "{:?}", violations.borrow());
        assert_eq!(
            controller.operations_to_simulate().len() + controller.finished_operations().len(),
            12
        );
        assert_eq!(controller.feedbacks().len(), controller.finished_operations().len());

        // Actual executions never overlap on a machine.
        let mut by_machine: std::collections::BTreeMap<MachineId, Vec<(i64, i64)>> =
            Default::default();
        for f in controller.feedbacks() {
            by_machine
                .entry(f.machine)
                .or_default()
                .push((f.actual_start_ms.unwrap(), f.created_at_ms));
        }
        for runs in by_machine.values_mut() {
            runs.sort();
            for pair in runs.windows(2) {
                assert!(pair[0].1 <= pair[1].0, "overlap {pair:?}");
            }
        }
    }

    #[test]
    fn test_late_completion_right_shifts_queue() {
        let mut ws = Workshop::new();
        ws.add_machine(Machine::new("M", MachineType(1)));
        ws.add_production_order("PO", &single_step("P", minutes(10), 1), 2)
            .unwrap();
        let mut controller = SimulationController::new(ws, &quiet())
            .unwrap()
            .with_duration_factor(|_| 1.5);
        let ops: Vec<OperationId> = controller.operations_to_simulate().to_vec();

        controller.execute(minutes(16)).unwrap();
        assert_eq!(controller.right_shift_count(), 1);
        let second = controller.workshop().operation(ops[1]).unwrap();
        assert_eq!(second.earliest_start_ms, minutes(15));
        assert_eq!(second.latest_finish_ms, minutes(25));
        assert_eq!(second.actual_start_ms, Some(minutes(15)));

        controller.execute(minutes(30)).unwrap();
        assert_eq!(controller.feedbacks()[1].created_at_ms, minutes(30));
        assert_eq!(controller.right_shift_count(), 2);
    }

    #[test]
    fn test_spt_orders_queue() {
        let mut ws = Workshop::new();
        ws.add_machine(Machine::new("M", MachineType(1)));
        ws.add_production_order("Long", &single_step("L", minutes(10), 1), 1)
            .unwrap();
        ws.add_production_order("Short", &single_step("S", minutes(5), 1), 1)
            .unwrap();
        let mut controller = SimulationController::new(ws, &quiet()).unwrap();
        controller.execute(hours(1)).unwrap();

        let order: Vec<i64> = controller
            .feedbacks()
            .iter()
            .map(|f| f.created_at_ms)
            .collect();
        assert_eq!(order, vec![minutes(5), minutes(15)]);
        assert_eq!(controller.finished_operations()[0], OperationId(1));
    }

    #[test]
    fn test_order_generation_adds_work() {
        let mut ws = Workshop::new();
        ws.add_machine(Machine::new("M", MachineType(1)));
        let config = quiet().with_order_generation(TimeDistribution::Constant(hours(1)));
        let generator = OrderGenerator::new(
            DiscreteDistribution::constant(single_step("Gen", minutes(10), 1)),
            DiscreteDistribution::constant(2),
        );
        let mut controller = SimulationController::new(ws, &config)
            .unwrap()
            .with_order_generator(generator)
            .unwrap();

        controller.execute(hours(3) + minutes(30)).unwrap();

        assert_eq!(controller.workshop().production_orders().len(), 3);
        assert_eq!(controller.finished_operations().len(), 6);
        assert!(controller.operations_to_simulate().is_empty());
        let last = controller.workshop().production_orders().last().unwrap();
        assert_eq!(last.name, "GEN-3");
        assert_eq!(last.completed_at_ms, Some(hours(3) + minutes(20)));
    }

    #[test]
    fn test_generator_plans_are_validated() {
        let mut ws = Workshop::new();
        ws.add_machine(Machine::new("M", MachineType(1)));
        let generator = OrderGenerator::new(
            DiscreteDistribution::constant(single_step("Elsewhere", minutes(10), 4)),
            DiscreteDistribution::constant(1),
        );
        let controller = SimulationController::new(ws, &quiet()).unwrap();
        assert!(matches!(
            controller.with_order_generator(generator),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_order_generation_without_generator_is_ignored() {
        let mut ws = Workshop::new();
        ws.add_machine(Machine::new("M", MachineType(1)));
        let config = quiet().with_order_generation(TimeDistribution::Constant(hours(1)));
        let mut controller = SimulationController::new(ws, &config).unwrap();
        controller.execute(hours(3)).unwrap();
        assert!(controller.workshop().production_orders().is_empty());
    }

    #[test]
    fn test_missing_machine_type_fails_setup() {
        let mut ws = Workshop::new();
        ws.add_machine(Machine::new("M", MachineType(1)));
        ws.add_production_order("PO", &single_step("P", minutes(10), 9), 1)
            .unwrap();
        assert!(matches!(
            SimulationController::new(ws, &quiet()),
            Err(Error::NoMachineForType {
                machine_type: MachineType(9),
                ..
            })
        ));
    }

    #[test]
    fn test_double_completion_is_fatal() {
        let mut controller = SimulationController::new(chain_workshop(), &quiet()).unwrap();
        controller.execute(hours(1)).unwrap();
        let first = controller.feedbacks()[0].clone();

        let replay = SimulationEvent::OperationCompleted {
            at_ms: first.created_at_ms,
            operation: first.operation,
            machine: first.machine,
            influence_factors: first.influence_factors,
        };
        assert!(matches!(
            controller.handle_event(&replay),
            Err(Error::UnknownCompletion { .. })
        ));
    }

    #[test]
    fn test_unknown_completion_leaves_timings_untouched() {
        let mut controller = SimulationController::new(chain_workshop(), &quiet()).unwrap();
        controller.execute(minutes(15)).unwrap();
        let first = controller.feedbacks()[0].clone();
        let timings = |c: &SimulationController| -> Vec<(i64, i64)> {
            c.workshop()
                .operations()
                .iter()
                .map(|op| (op.earliest_start_ms, op.latest_finish_ms))
                .collect()
        };
        let before = timings(&controller);

        let late_replay = SimulationEvent::OperationCompleted {
            at_ms: minutes(40),
            operation: first.operation,
            machine: first.machine,
            influence_factors: first.influence_factors,
        };
        assert!(matches!(
            controller.handle_event(&late_replay),
            Err(Error::UnknownCompletion { .. })
        ));
        assert_eq!(timings(&controller), before);
        assert_eq!(controller.right_shift_count(), 0);
    }

    #[test]
    fn test_zero_interrupt_inter_arrival_is_rejected() {
        let mut ws = Workshop::new();
        ws.add_machine(Machine::new("M", MachineType(1)));
        ws.add_production_order("PO", &single_step("P", minutes(10), 1), 1)
            .unwrap();
        let config = quiet().with_interrupt(InterruptConfig::new(
            TimeDistribution::Constant(0),
            TimeDistribution::Constant(minutes(5)),
        ));
        assert!(matches!(
            SimulationController::new(ws, &config),
            Err(Error::InvalidDistribution { .. })
        ));
    }

    #[test]
    fn test_feedback_stats() {
        let mut controller = SimulationController::new(chain_workshop(), &quiet()).unwrap();
        controller.execute(hours(1)).unwrap();

        // Every operation finished exactly as planned.
        let stats = controller.stats();
        let mean = stats.mean_lead_time_ms().unwrap();
        assert!((mean - (minutes(10) + minutes(20) + minutes(15)) as f64 / 3.0).abs() < 1e-10);
        assert!(
            (ProductionStats::mean_lead_time_for_work_plan_ms(controller.workshop(), "Chain").unwrap()
                - minutes(45) as f64)
                .abs()
                < 1e-10
        );
        let kpi = controller.plan_kpi();
        assert_eq!(kpi.unscheduled, 0);
    }
}
