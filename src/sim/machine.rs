//! The machine process.
//!
//! Each machine runs an explicit state machine over its queue of pending
//! operations:
//!
//! ```text
//!          enqueue            planned start            changeover done
//! Idle ──────────▶ Selecting ───────▶ Waiting ───────▶ Changeover ───────▶ Processing
//!                      ▲                                                      │
//!                      │ continue                                   finished  │
//!                      └──────────────── AwaitingContinue ◀──────────────────┘
//!
//! any phase ──interrupt──▶ Repairing ──repaired──▶ AwaitingContinue
//! ```
//!
//! Every suspension schedules a wakeup tagged with a fresh token; a wakeup
//! whose token is stale was cancelled and is skipped by the simulator.

use tracing::debug;

use super::{ProcessContext, ProcessId, SimulationEvent};
use crate::error::{Error, Result};
use crate::models::{
    sample_positive_normal, InfluenceFactors, Machine, MachineId, MachineState, OperationId,
    OperationState, ToolId, FACTOR_CURRENT_TIME, FACTOR_NEEDED_CHANGEOVER,
};

/// Relative spread of sampled changeover times.
const CHANGEOVER_VARIATION: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    /// Nothing queued, no wakeup pending.
    Idle,
    /// Wakeup pending to pick the queue head.
    Selecting,
    /// Waiting for the head's planned start minus its changeover.
    Waiting {
        operation: OperationId,
        changeover_ms: i64,
    },
    /// Mounting `tool` for `operation`.
    Changeover {
        operation: OperationId,
        tool: ToolId,
    },
    Processing {
        operation: OperationId,
        started_ms: i64,
    },
    Repairing,
    /// Raised an event; blocked until the controller continues it.
    AwaitingContinue,
}

/// Simulation process driving one machine.
#[derive(Debug, Clone)]
pub struct MachineProcess {
    machine: MachineId,
    /// Pending operations, ordered by planned start (stable).
    queue: Vec<OperationId>,
    phase: Phase,
    token: u64,
    current_tool: Option<ToolId>,
    needed_changeover: bool,
    busy_ms: i64,
    completed: usize,
}

impl MachineProcess {
    /// Creates an idle process with the machine's initial tool mounted.
    pub fn new(machine: &Machine) -> Self {
        Self {
            machine: machine.id,
            queue: Vec::new(),
            phase: Phase::Idle,
            token: 0,
            current_tool: machine.initial_tool(),
            needed_changeover: false,
            busy_ms: 0,
            completed: 0,
        }
    }

    pub fn machine(&self) -> MachineId {
        self.machine
    }

    /// Pending operations in processing order.
    pub fn queue(&self) -> &[OperationId] {
        &self.queue
    }

    /// Token of the most recently scheduled wakeup.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Operation currently being processed.
    pub fn current_operation(&self) -> Option<OperationId> {
        match self.phase {
            Phase::Processing { operation, .. } => Some(operation),
            _ => None,
        }
    }

    pub fn current_tool(&self) -> Option<ToolId> {
        self.current_tool
    }

    pub fn is_awaiting_continue(&self) -> bool {
        self.phase == Phase::AwaitingContinue
    }

    /// Total time spent processing operations that completed (ms).
    pub fn busy_ms(&self) -> i64 {
        self.busy_ms
    }

    pub fn completed_count(&self) -> usize {
        self.completed
    }

    fn process_id(&self) -> ProcessId {
        ProcessId::Machine(self.machine)
    }

    fn fault(&self, reason: impl Into<String>) -> Error {
        Error::ProcessFault {
            process: self.process_id(),
            reason: reason.into(),
        }
    }

    fn sleep(&mut self, ctx: &mut ProcessContext<'_>, delay_ms: i64) {
        self.token += 1;
        ctx.clock.schedule(self.process_id(), delay_ms, self.token);
    }

    fn set_machine_state(&self, ctx: &mut ProcessContext<'_>, state: MachineState) -> Result<()> {
        ctx.workshop.machine_mut(self.machine)?.state = state;
        Ok(())
    }

    fn sort_queue(&mut self, ctx: &ProcessContext<'_>) {
        let workshop = &*ctx.workshop;
        self.queue.sort_by_key(|id| {
            workshop
                .operation(*id)
                .map(|o| o.planned_start_ms())
                .unwrap_or(i64::MAX)
        });
    }

    /// Queues an operation (state → `Pending`) and wakes the machine if idle.
    pub fn enqueue(&mut self, operation: OperationId, ctx: &mut ProcessContext<'_>) -> Result<()> {
        let op = ctx.workshop.operation_mut(operation)?;
        op.state = OperationState::Pending;
        op.machine = Some(self.machine);
        if !self.queue.contains(&operation) {
            self.queue.push(operation);
        }
        debug!(machine = %self.machine, operation = %operation, "enqueued");
        self.sort_queue(ctx);
        self.refresh(ctx)
    }

    /// Removes a not-yet-started operation from the queue.
    ///
    /// Returns `false` when the operation was not queued here (for example
    /// because it already started). The caller decides its new state.
    pub fn remove(&mut self, operation: OperationId, ctx: &mut ProcessContext<'_>) -> Result<bool> {
        let Some(pos) = self.queue.iter().position(|q| *q == operation) else {
            return Ok(false);
        };
        self.queue.remove(pos);
        debug!(machine = %self.machine, operation = %operation, "dequeued");
        self.refresh(ctx)?;
        Ok(true)
    }

    /// Re-sorts the queue after planned starts changed and re-evaluates waits.
    pub fn resort(&mut self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        self.sort_queue(ctx);
        self.refresh(ctx)
    }

    /// Reacts to a queue change without advancing time.
    fn refresh(&mut self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        match self.phase.clone() {
            Phase::Idle => {
                if !self.queue.is_empty() {
                    self.phase = Phase::Selecting;
                    self.sleep(ctx, 0);
                }
            }
            Phase::Waiting { .. } => {
                self.phase = Phase::Selecting;
                self.sleep(ctx, 0);
            }
            Phase::Changeover { operation, tool } => match self.queue.first().copied() {
                Some(head) if head == operation => {}
                Some(head) if ctx.workshop.operation(head)?.tool() == tool => {
                    self.phase = Phase::Changeover {
                        operation: head,
                        tool,
                    };
                }
                _ => {
                    debug!(machine = %self.machine, "changeover abandoned");
                    self.phase = Phase::Selecting;
                    self.sleep(ctx, 0);
                }
            },
            Phase::Selecting
            | Phase::Processing { .. }
            | Phase::Repairing
            | Phase::AwaitingContinue => {}
        }
        Ok(())
    }

    /// Runs the process until its next suspension point.
    ///
    /// Returns the event raised at this point, if any; the process then
    /// blocks until [`continue_run`](Self::continue_run).
    pub fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<SimulationEvent>> {
        match self.phase.clone() {
            Phase::Idle | Phase::Selecting => {
                self.select_next(ctx)?;
                Ok(None)
            }
            Phase::Waiting {
                operation,
                changeover_ms,
            } => {
                if self.queue.first() == Some(&operation) {
                    self.proceed(operation, changeover_ms, ctx)?;
                } else {
                    self.select_next(ctx)?;
                }
                Ok(None)
            }
            Phase::Changeover { operation, tool } => {
                self.current_tool = Some(tool);
                self.needed_changeover = true;
                debug!(machine = %self.machine, tool = %tool, at_ms = ctx.clock.now_ms(), "changeover finished");
                if self.queue.first() == Some(&operation) {
                    self.proceed(operation, 0, ctx)?;
                } else {
                    self.select_next(ctx)?;
                }
                Ok(None)
            }
            Phase::Processing {
                operation,
                started_ms,
            } => self.complete(operation, started_ms, ctx).map(Some),
            Phase::Repairing => {
                self.set_machine_state(ctx, MachineState::Idle)?;
                self.phase = Phase::AwaitingContinue;
                let at_ms = ctx.clock.now_ms();
                debug!(machine = %self.machine, at_ms, "repaired");
                Ok(Some(SimulationEvent::InterruptionHandled {
                    at_ms,
                    machine: self.machine,
                }))
            }
            Phase::AwaitingContinue => Err(self.fault("resumed while awaiting continue")),
        }
    }

    /// Unblocks the process after the controller handled its event.
    pub fn continue_run(&mut self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        if self.phase != Phase::AwaitingContinue {
            return Err(self.fault("continue without a pending event"));
        }
        self.needed_changeover = false;
        self.set_machine_state(ctx, MachineState::Idle)?;
        self.select_next(ctx)
    }

    /// Breaks the machine down for `repair_ms`.
    ///
    /// An operation in progress loses its progress and returns to the queue
    /// as `Pending`; a changeover in progress is abandoned.
    pub fn interrupt(&mut self, repair_ms: i64, ctx: &mut ProcessContext<'_>) -> Result<()> {
        match self.phase.clone() {
            Phase::AwaitingContinue => {
                return Err(self.fault("interrupted while awaiting continue"));
            }
            Phase::Repairing => return Ok(()),
            Phase::Processing { operation, .. } => {
                let op = ctx.workshop.operation_mut(operation)?;
                op.state = OperationState::Pending;
                op.actual_start_ms = None;
                self.queue.insert(0, operation);
                self.sort_queue(ctx);
                debug!(machine = %self.machine, operation = %operation, "processing discarded");
            }
            Phase::Idle | Phase::Selecting | Phase::Waiting { .. } | Phase::Changeover { .. } => {}
        }
        self.set_machine_state(ctx, MachineState::Interrupted)?;
        self.phase = Phase::Repairing;
        self.sleep(ctx, repair_ms);
        debug!(machine = %self.machine, at_ms = ctx.clock.now_ms(), repair_ms, "interrupted");
        Ok(())
    }

    fn select_next(&mut self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        let Some(&head) = self.queue.first() else {
            self.phase = Phase::Idle;
            return Ok(());
        };
        let changeover_ms = self.sample_changeover(head, ctx)?;
        self.proceed(head, changeover_ms, ctx)
    }

    /// Waits, changes tools, or starts `operation`, whichever is due.
    fn proceed(
        &mut self,
        operation: OperationId,
        changeover_ms: i64,
        ctx: &mut ProcessContext<'_>,
    ) -> Result<()> {
        let op = ctx.workshop.operation(operation)?;
        let tool = op.tool();
        let wait_ms = op.planned_start_ms() - changeover_ms - ctx.clock.now_ms();

        if wait_ms > 0 {
            self.phase = Phase::Waiting {
                operation,
                changeover_ms,
            };
            self.sleep(ctx, wait_ms);
        } else if changeover_ms > 0 {
            debug!(
                machine = %self.machine,
                tool = %tool,
                changeover_ms,
                at_ms = ctx.clock.now_ms(),
                "changeover started"
            );
            self.phase = Phase::Changeover { operation, tool };
            self.sleep(ctx, changeover_ms);
        } else {
            if self.current_tool.is_some_and(|t| t != tool) {
                self.needed_changeover = true;
            }
            self.start_processing(operation, ctx)?;
        }
        Ok(())
    }

    fn sample_changeover(&self, operation: OperationId, ctx: &mut ProcessContext<'_>) -> Result<i64> {
        let tool = ctx.workshop.operation(operation)?.tool();
        let from = match self.current_tool {
            Some(t) if t != tool => t,
            _ => return Ok(0),
        };
        let mean = ctx.workshop.machine(self.machine)?.changeover.get(from, tool) as f64;
        let sampled = sample_positive_normal(ctx.rng, mean, CHANGEOVER_VARIATION * mean)?;
        Ok(sampled.round() as i64)
    }

    fn start_processing(&mut self, operation: OperationId, ctx: &mut ProcessContext<'_>) -> Result<()> {
        let now = ctx.clock.now_ms();
        self.queue.retain(|q| *q != operation);

        let mut factors = InfluenceFactors::new();
        factors.insert(
            FACTOR_NEEDED_CHANGEOVER.to_string(),
            if self.needed_changeover { 1.0 } else { 0.0 },
        );
        factors.insert(FACTOR_CURRENT_TIME.to_string(), now as f64);
        let factor = ctx
            .duration_factor
            .map(|f| f(&factors))
            .filter(|x| x.is_finite() && *x >= 0.0)
            .unwrap_or(1.0);

        let op = ctx.workshop.operation_mut(operation)?;
        op.state = OperationState::InProgress;
        op.actual_start_ms = Some(now);
        op.actual_finish_ms = None;
        op.influence_factors = factors;
        let tool = op.tool();
        let mean = op.duration_ms() as f64 * factor;
        let variation = op
            .position
            .variation_coefficient
            .unwrap_or(ctx.variation_coefficient);

        let duration_ms = sample_positive_normal(ctx.rng, mean, variation * mean)?.round() as i64;

        ctx.workshop.mark_started(operation, now)?;
        self.set_machine_state(ctx, MachineState::Working)?;
        self.current_tool = Some(tool);
        self.phase = Phase::Processing {
            operation,
            started_ms: now,
        };
        self.sleep(ctx, duration_ms);
        debug!(machine = %self.machine, operation = %operation, at_ms = now, duration_ms, "processing started");
        Ok(())
    }

    fn complete(
        &mut self,
        operation: OperationId,
        started_ms: i64,
        ctx: &mut ProcessContext<'_>,
    ) -> Result<SimulationEvent> {
        let now = ctx.clock.now_ms();
        let op = ctx.workshop.operation_mut(operation)?;
        op.state = OperationState::Completed;
        op.actual_finish_ms = Some(now);
        let influence_factors = op.influence_factors.clone();

        self.busy_ms += now - started_ms;
        self.completed += 1;
        self.phase = Phase::AwaitingContinue;
        debug!(machine = %self.machine, operation = %operation, at_ms = now, "processing finished");

        Ok(SimulationEvent::OperationCompleted {
            at_ms: now,
            operation,
            machine: self.machine,
            influence_factors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ChangeoverMatrix, MachineType, WorkPlan, WorkPlanPosition, Workshop,
    };
    use crate::sim::EventScheduler;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        clock: EventScheduler,
        workshop: Workshop,
        rng: StdRng,
    }

    impl Fixture {
        fn ctx(&mut self) -> ProcessContext<'_> {
            ProcessContext {
                clock: &mut self.clock,
                workshop: &mut self.workshop,
                rng: &mut self.rng,
                duration_factor: None,
                variation_coefficient: 0.0,
            }
        }

        /// Pops the next wakeup for `process` and resumes it.
        fn step(&mut self, process: &mut MachineProcess) -> Option<SimulationEvent> {
            loop {
                let wakeup = self.clock.pop_until(i64::MAX)?;
                if wakeup.token != process.token() {
                    continue;
                }
                return process.resume(&mut self.ctx()).unwrap();
            }
        }
    }

    /// One machine with tools 1 and 2 (changeover 1→2 = 300) and `n`
    /// single-step orders alternating between the two tools.
    fn fixture(durations: &[i64]) -> (Fixture, MachineProcess, Vec<OperationId>) {
        let mut workshop = Workshop::new();
        let m = workshop.add_machine(
            Machine::new("M1", MachineType(1))
                .with_tools(vec![ToolId(1), ToolId(2)])
                .with_changeover(ChangeoverMatrix::new().with(ToolId(1), ToolId(2), 300)),
        );
        let mut ops = Vec::new();
        for (i, d) in durations.iter().enumerate() {
            let tool = ToolId(1 + (i as u32 % 2));
            let plan = WorkPlan::new(format!("P{i}"))
                .with_position(WorkPlanPosition::new("X", *d, MachineType(1), tool));
            let po = workshop.add_production_order(format!("PO{i}"), &plan, 1).unwrap();
            ops.extend(workshop.operations_of(po));
        }
        let process = MachineProcess::new(workshop.machine(m).unwrap());
        let fx = Fixture {
            clock: EventScheduler::new(0),
            workshop,
            rng: StdRng::seed_from_u64(42),
        };
        (fx, process, ops)
    }

    #[test]
    fn test_processes_queue_in_planned_order() {
        let (mut fx, mut mp, ops) = fixture(&[1000, 500]);
        fx.workshop.operation_mut(ops[0]).unwrap().set_planned_start(0);
        fx.workshop.operation_mut(ops[1]).unwrap().set_planned_start(0);
        mp.enqueue(ops[0], &mut fx.ctx()).unwrap();

        let event = fx.step(&mut mp);
        assert!(event.is_none());
        assert_eq!(mp.current_operation(), Some(ops[0]));
        assert_eq!(fx.workshop.operation(ops[0]).unwrap().state, OperationState::InProgress);
        assert_eq!(fx.workshop.machine(mp.machine()).unwrap().state, MachineState::Working);

        // Enqueue while busy: stays queued.
        mp.enqueue(ops[1], &mut fx.ctx()).unwrap();
        assert_eq!(mp.queue(), &[ops[1]]);

        match fx.step(&mut mp) {
            Some(SimulationEvent::OperationCompleted { at_ms, operation, .. }) => {
                assert_eq!(at_ms, 1000);
                assert_eq!(operation, ops[0]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(mp.is_awaiting_continue());
        assert_eq!(fx.workshop.operation(ops[0]).unwrap().state, OperationState::Completed);

        // Tool 1 → 2 costs a 300 ms changeover (±5%) before the second op.
        mp.continue_run(&mut fx.ctx()).unwrap();
        assert!(fx.step(&mut mp).is_none());
        assert_eq!(mp.current_tool(), Some(ToolId(2)));
        assert_eq!(mp.current_operation(), Some(ops[1]));
        let started = fx.workshop.operation(ops[1]).unwrap().actual_start_ms.unwrap();
        assert!((1240..=1360).contains(&started), "started at {started}");
        let factors = &fx.workshop.operation(ops[1]).unwrap().influence_factors;
        assert_eq!(factors[FACTOR_NEEDED_CHANGEOVER], 1.0);
        assert_eq!(mp.busy_ms(), 1000);
    }

    #[test]
    fn test_waits_for_planned_start() {
        let (mut fx, mut mp, ops) = fixture(&[1000]);
        fx.workshop.operation_mut(ops[0]).unwrap().set_planned_start(5000);
        mp.enqueue(ops[0], &mut fx.ctx()).unwrap();

        assert!(fx.step(&mut mp).is_none()); // selects, starts waiting
        assert_eq!(mp.current_operation(), None);
        assert!(fx.step(&mut mp).is_none()); // wait over, starts
        assert_eq!(fx.clock.now_ms(), 5000);
        assert_eq!(mp.current_operation(), Some(ops[0]));
        assert_eq!(
            fx.workshop.operation(ops[0]).unwrap().influence_factors[FACTOR_CURRENT_TIME],
            5000.0
        );
    }

    #[test]
    fn test_remove_while_waiting_goes_idle() {
        let (mut fx, mut mp, ops) = fixture(&[1000]);
        fx.workshop.operation_mut(ops[0]).unwrap().set_planned_start(5000);
        mp.enqueue(ops[0], &mut fx.ctx()).unwrap();
        assert!(fx.step(&mut mp).is_none());

        assert!(mp.remove(ops[0], &mut fx.ctx()).unwrap());
        assert!(!mp.remove(ops[0], &mut fx.ctx()).unwrap());
        assert!(fx.step(&mut mp).is_none());
        assert!(mp.queue().is_empty());
        // The cancelled wait is stale and skipped.
        assert!(fx.step(&mut mp).is_none());
        assert_eq!(mp.current_operation(), None);
        assert_eq!(
            fx.workshop.operation(ops[0]).unwrap().actual_start_ms,
            None
        );
    }

    #[test]
    fn test_interrupt_discards_progress() {
        let (mut fx, mut mp, ops) = fixture(&[10_000]);
        fx.workshop.operation_mut(ops[0]).unwrap().set_planned_start(0);
        mp.enqueue(ops[0], &mut fx.ctx()).unwrap();
        fx.step(&mut mp);
        assert_eq!(mp.current_operation(), Some(ops[0]));

        fx.clock.advance_to(2000);
        mp.interrupt(5000, &mut fx.ctx()).unwrap();
        let op = fx.workshop.operation(ops[0]).unwrap();
        assert_eq!(op.state, OperationState::Pending);
        assert_eq!(op.actual_start_ms, None);
        assert_eq!(mp.queue(), &[ops[0]]);
        assert_eq!(fx.workshop.machine(mp.machine()).unwrap().state, MachineState::Interrupted);

        match fx.step(&mut mp) {
            Some(SimulationEvent::InterruptionHandled { at_ms, .. }) => assert_eq!(at_ms, 7000),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fx.workshop.machine(mp.machine()).unwrap().state, MachineState::Idle);

        // Planned start is in the past: restarts immediately on continue.
        mp.continue_run(&mut fx.ctx()).unwrap();
        assert_eq!(mp.current_operation(), Some(ops[0]));
        match fx.step(&mut mp) {
            Some(SimulationEvent::OperationCompleted { at_ms, .. }) => assert_eq!(at_ms, 17_000),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_continue_without_event_is_fault() {
        let (mut fx, mut mp, _) = fixture(&[1000]);
        assert!(matches!(
            mp.continue_run(&mut fx.ctx()),
            Err(Error::ProcessFault { .. })
        ));
    }

    #[test]
    fn test_duration_factor_scales_processing() {
        let (mut fx, mut mp, ops) = fixture(&[1000]);
        fx.workshop.operation_mut(ops[0]).unwrap().set_planned_start(0);
        let double = |_: &InfluenceFactors| 2.0;
        {
            let mut ctx = fx.ctx();
            ctx.duration_factor = Some(&double);
            mp.enqueue(ops[0], &mut ctx).unwrap();
        }
        let wakeup = fx.clock.pop_until(i64::MAX).unwrap();
        assert_eq!(wakeup.token, mp.token());
        {
            let mut ctx = fx.ctx();
            ctx.duration_factor = Some(&double);
            assert!(mp.resume(&mut ctx).unwrap().is_none());
        }
        match fx.step(&mut mp) {
            Some(SimulationEvent::OperationCompleted { at_ms, .. }) => assert_eq!(at_ms, 2000),
            other => panic!("unexpected {other:?}"),
        }
    }
}
