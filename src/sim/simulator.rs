//! The simulator: owns the clock, the workshop, and every process.
//!
//! [`Simulator::step`] resumes exactly one process. When that process raises
//! a [`SimulationEvent`] the simulator blocks: no other process runs until
//! the event has been handled and [`Simulator::continue_run`] is called.
//! Replanning and reconciliation therefore never overlap with execution.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use super::{
    DurationFactorFn, EventScheduler, MachineProcess, ProcessContext, ProcessId, SimulationEvent,
};
use crate::config::{InterruptConfig, SimulationConfig};
use crate::error::{Error, Result};
use crate::models::{
    InfluenceFactors, MachineId, MachineState, OperationId, OperationState, Plan,
    TimeDistribution, Workshop, MIN_INTER_ARRIVAL_MS,
};

/// Outcome of one [`Simulator::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A process raised an event; call `continue_run` after handling it.
    Event(SimulationEvent),
    /// A process ran to its next suspension point without an event.
    Advanced,
    /// Nothing is due before the horizon; the clock sits at the horizon.
    Finished,
}

#[derive(Debug, Clone)]
struct InterruptSource {
    config: InterruptConfig,
    occurrences: u32,
}

/// Discrete-event simulator of a workshop.
pub struct Simulator {
    clock: EventScheduler,
    workshop: Workshop,
    machines: BTreeMap<MachineId, MachineProcess>,
    rng: StdRng,
    duration_factor: Option<Box<DurationFactorFn>>,
    variation_coefficient: f64,
    replanning_interval_ms: Option<i64>,
    interrupts: Vec<InterruptSource>,
    order_inter_arrival: Option<TimeDistribution>,
    blocked: Option<ProcessId>,
    started: bool,
    start_ms: i64,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("now_ms", &self.clock.now_ms())
            .field("machines", &self.machines.len())
            .field("blocked", &self.blocked)
            .field("started", &self.started)
            .finish()
    }
}

impl Simulator {
    /// Creates a simulator over `workshop`, one process per machine.
    ///
    /// # Errors
    /// Configuration errors from [`SimulationConfig::validate`].
    pub fn new(workshop: Workshop, config: &SimulationConfig) -> Result<Self> {
        config.validate()?;
        let machines = workshop
            .machines()
            .iter()
            .map(|m| (m.id, MachineProcess::new(m)))
            .collect();
        Ok(Self {
            clock: EventScheduler::new(config.start_time_ms),
            workshop,
            machines,
            rng: StdRng::seed_from_u64(config.seed),
            duration_factor: None,
            variation_coefficient: config.variation_coefficient,
            replanning_interval_ms: config.replanning_interval_ms,
            interrupts: config
                .interrupts
                .iter()
                .map(|c| InterruptSource {
                    config: c.clone(),
                    occurrences: 0,
                })
                .collect(),
            order_inter_arrival: config
                .order_generation
                .as_ref()
                .map(|g| g.inter_arrival.clone()),
            blocked: None,
            started: false,
            start_ms: config.start_time_ms,
        })
    }

    /// Installs the hook mapping influence factors to a duration multiplier.
    pub fn with_duration_factor<F>(mut self, factor: F) -> Self
    where
        F: Fn(&InfluenceFactors) -> f64 + Send + Sync + 'static,
    {
        self.duration_factor = Some(Box::new(factor));
        self
    }

    pub fn set_duration_factor(&mut self, factor: Box<DurationFactorFn>) {
        self.duration_factor = Some(factor);
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn workshop(&self) -> &Workshop {
        &self.workshop
    }

    pub fn workshop_mut(&mut self) -> &mut Workshop {
        &mut self.workshop
    }

    /// The run's RNG, shared with anything that samples on its behalf.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn machine_process(&self, id: MachineId) -> Option<&MachineProcess> {
        self.machines.get(&id)
    }

    /// The process waiting for [`continue_run`](Self::continue_run), if any.
    pub fn blocked(&self) -> Option<ProcessId> {
        self.blocked
    }

    fn parts(&mut self) -> (&mut BTreeMap<MachineId, MachineProcess>, ProcessContext<'_>) {
        let ctx = ProcessContext {
            clock: &mut self.clock,
            workshop: &mut self.workshop,
            rng: &mut self.rng,
            duration_factor: self.duration_factor.as_deref(),
            variation_coefficient: self.variation_coefficient,
        };
        (&mut self.machines, ctx)
    }

    /// Starts the periodic processes. Called implicitly by the first step.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        if let Some(interval) = self.replanning_interval_ms {
            self.clock.schedule(ProcessId::Replanning, interval, 0);
        }
        for i in 0..self.interrupts.len() {
            self.schedule_interrupt(i)?;
        }
        self.schedule_order_generation()?;
        debug!(at_ms = self.clock.now_ms(), machines = self.machines.len(), "simulation started");
        Ok(())
    }

    fn schedule_interrupt(&mut self, index: usize) -> Result<()> {
        let Some(source) = self.interrupts.get(index) else {
            return Err(Error::ProcessFault {
                process: ProcessId::Interrupts(index),
                reason: "no such interrupt source".to_string(),
            });
        };
        if source
            .config
            .max_occurrences
            .is_some_and(|max| source.occurrences >= max)
        {
            return Ok(());
        }
        let delay = source
            .config
            .inter_arrival
            .sample(&mut self.rng)?
            .max(MIN_INTER_ARRIVAL_MS);
        self.clock.schedule(ProcessId::Interrupts(index), delay, 0);
        Ok(())
    }

    fn schedule_order_generation(&mut self) -> Result<()> {
        if let Some(inter_arrival) = &self.order_inter_arrival {
            let delay = inter_arrival.sample(&mut self.rng)?.max(MIN_INTER_ARRIVAL_MS);
            self.clock.schedule(ProcessId::OrderGeneration, delay, 0);
        }
        Ok(())
    }

    /// Resumes the next process due at or before `horizon_ms`.
    ///
    /// # Errors
    /// [`Error::ProcessFault`] when called while a raised event has not been
    /// continued, or when a process faults. A faulted process does not
    /// advance time further.
    pub fn step(&mut self, horizon_ms: i64) -> Result<Step> {
        if let Some(process) = self.blocked {
            return Err(Error::ProcessFault {
                process,
                reason: "event raised by this process was not continued".to_string(),
            });
        }
        self.start()?;

        loop {
            let Some(wakeup) = self.clock.pop_until(horizon_ms) else {
                self.clock.advance_to(horizon_ms);
                return Ok(Step::Finished);
            };
            let now = self.clock.now_ms();

            let event = match wakeup.process {
                ProcessId::Machine(id) => {
                    let (machines, mut ctx) = self.parts();
                    let process = machines.get_mut(&id).ok_or(Error::UnknownMachine(id))?;
                    if wakeup.token != process.token() {
                        continue;
                    }
                    let event = process.resume(&mut ctx)?;
                    if let Some(SimulationEvent::OperationCompleted { operation, .. }) = &event {
                        self.release_successor(*operation)?;
                    }
                    event
                }
                ProcessId::Replanning => Some(SimulationEvent::Replanning { at_ms: now }),
                ProcessId::Interrupts(index) => self.fire_interrupt(index)?,
                ProcessId::OrderGeneration => Some(SimulationEvent::OrderGeneration { at_ms: now }),
            };

            return Ok(match event {
                Some(event) => {
                    debug!(event = event.name(), process = %wakeup.process, at_ms = now, "event raised");
                    self.blocked = Some(wakeup.process);
                    Step::Event(event)
                }
                None => Step::Advanced,
            });
        }
    }

    /// Closes finished orders and queues the routing successor of a
    /// completed operation when it is already planned.
    fn release_successor(&mut self, operation: OperationId) -> Result<()> {
        let now = self.clock.now_ms();
        self.workshop.mark_completed(operation, now)?;
        let Some(successor) = self.workshop.operation(operation)?.successor else {
            return Ok(());
        };
        let next = self.workshop.operation(successor)?;
        let Some(machine) = next.machine else {
            return Ok(());
        };
        if next.state != OperationState::Scheduled {
            return Ok(());
        }
        let (machines, mut ctx) = self.parts();
        if let Some(process) = machines.get_mut(&machine) {
            process.enqueue(successor, &mut ctx)?;
        }
        Ok(())
    }

    fn fire_interrupt(&mut self, index: usize) -> Result<Option<SimulationEvent>> {
        let now = self.clock.now_ms();
        let config = match self.interrupts.get(index) {
            Some(source) => source.config.clone(),
            None => {
                return Err(Error::ProcessFault {
                    process: ProcessId::Interrupts(index),
                    reason: "no such interrupt source".to_string(),
                })
            }
        };

        let targets: Vec<MachineId> = self
            .workshop
            .machines()
            .iter()
            .filter(|m| m.state != MachineState::Interrupted && config.matches(m))
            .map(|m| m.id)
            .collect();

        for id in &targets {
            let (machines, mut ctx) = self.parts();
            let repair_ms = config.repair_time.sample(ctx.rng)?;
            let process = machines.get_mut(id).ok_or(Error::UnknownMachine(*id))?;
            process.interrupt(repair_ms, &mut ctx)?;
        }

        if targets.is_empty() {
            self.schedule_interrupt(index)?;
            return Ok(None);
        }
        if let Some(source) = self.interrupts.get_mut(index) {
            source.occurrences += 1;
        }
        info!(at_ms = now, machines = targets.len(), "machines interrupted");
        Ok(Some(SimulationEvent::Interruption {
            at_ms: now,
            machines: targets,
        }))
    }

    /// Unblocks the process whose event was just handled.
    pub fn continue_run(&mut self) -> Result<()> {
        let Some(process) = self.blocked.take() else {
            return Ok(());
        };
        match process {
            ProcessId::Machine(id) => {
                let (machines, mut ctx) = self.parts();
                machines
                    .get_mut(&id)
                    .ok_or(Error::UnknownMachine(id))?
                    .continue_run(&mut ctx)
            }
            ProcessId::Replanning => {
                if let Some(interval) = self.replanning_interval_ms {
                    self.clock.schedule(ProcessId::Replanning, interval, 0);
                }
                Ok(())
            }
            ProcessId::Interrupts(index) => self.schedule_interrupt(index),
            ProcessId::OrderGeneration => self.schedule_order_generation(),
        }
    }

    /// Brings machine queues in line with a freshly applied plan.
    ///
    /// - queued operations planned onto another machine move there;
    /// - queued operations the plan dropped leave their queue and fall back
    ///   to `Scheduled` without a machine;
    /// - planned operations whose predecessor is done (or absent) are queued.
    ///
    /// Every queue is then re-sorted by planned start.
    pub fn reconcile(&mut self, plan: &Plan) -> Result<()> {
        let (machines, mut ctx) = self.parts();

        let queued: Vec<(MachineId, OperationId)> = machines
            .iter()
            .flat_map(|(m, p)| p.queue().iter().map(move |op| (*m, *op)))
            .collect();

        for (queue_machine, operation) in queued {
            match plan.assignment_for(operation) {
                Some(a) if a.machine == queue_machine => {}
                Some(a) => {
                    let target = a.machine;
                    if let Some(p) = machines.get_mut(&queue_machine) {
                        p.remove(operation, &mut ctx)?;
                    }
                    machines
                        .get_mut(&target)
                        .ok_or(Error::UnknownMachine(target))?
                        .enqueue(operation, &mut ctx)?;
                    debug!(operation = %operation, from = %queue_machine, to = %target, "operation moved");
                }
                None => {
                    if let Some(p) = machines.get_mut(&queue_machine) {
                        p.remove(operation, &mut ctx)?;
                    }
                    let op = ctx.workshop.operation_mut(operation)?;
                    op.state = OperationState::Scheduled;
                    op.machine = None;
                    debug!(operation = %operation, machine = %queue_machine, "operation unplanned");
                }
            }
        }

        for a in &plan.assignments {
            let op = ctx.workshop.operation(a.operation)?;
            if op.state != OperationState::Scheduled {
                continue;
            }
            let ready = match op.predecessor {
                None => true,
                Some(p) => ctx.workshop.operation(p)?.state == OperationState::Completed,
            };
            if ready {
                machines
                    .get_mut(&a.machine)
                    .ok_or(Error::UnknownMachine(a.machine))?
                    .enqueue(a.operation, &mut ctx)?;
            }
        }

        self.refresh_machines()
    }

    /// Re-sorts every queue after planned starts changed outside a replan.
    pub fn refresh_machines(&mut self) -> Result<()> {
        let (machines, mut ctx) = self.parts();
        for process in machines.values_mut() {
            process.resort(&mut ctx)?;
        }
        Ok(())
    }

    /// Runs until `horizon_ms`, passing every event to `handler` and
    /// continuing the raising process afterwards.
    pub fn run_until<F>(&mut self, horizon_ms: i64, mut handler: F) -> Result<()>
    where
        F: FnMut(&mut Simulator, &SimulationEvent) -> Result<()>,
    {
        loop {
            match self.step(horizon_ms)? {
                Step::Event(event) => {
                    handler(self, &event)?;
                    self.continue_run()?;
                }
                Step::Advanced => {}
                Step::Finished => return Ok(()),
            }
        }
    }

    /// Runs for `duration_ms` from now. See [`run_until`](Self::run_until).
    pub fn run_for<F>(&mut self, duration_ms: i64, handler: F) -> Result<()>
    where
        F: FnMut(&mut Simulator, &SimulationEvent) -> Result<()>,
    {
        self.run_until(self.clock.now_ms() + duration_ms, handler)
    }

    /// Share of elapsed time each machine spent on completed operations.
    pub fn utilization(&self) -> BTreeMap<MachineId, f64> {
        let elapsed = (self.clock.now_ms() - self.start_ms).max(0);
        self.machines
            .iter()
            .map(|(id, p)| {
                let load = if elapsed == 0 {
                    0.0
                } else {
                    p.busy_ms() as f64 / elapsed as f64
                };
                (*id, load)
            })
            .collect()
    }
}
