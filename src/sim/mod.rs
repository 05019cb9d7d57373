//! Discrete-event simulation engine.
//!
//! A single-threaded cooperative scheduler: processes (machines, the
//! replanning timer, interrupt and order generators) are explicit state
//! machines that suspend on timeouts. The [`EventScheduler`] resumes exactly
//! one of them at a time in `(time, insertion order)` order.
//!
//! # Components
//!
//! - [`EventScheduler`]: virtual clock and wakeup queue
//! - [`MachineProcess`]: per-machine queue, changeover, processing, repair
//! - [`Simulator`]: owns the workshop and drives the processes
//! - [`SimulationEvent`]: domain signals handed to the controller
//!
//! # Reference
//! Law (2015), "Simulation Modeling and Analysis", Ch. 1.3 (Discrete-Event
//! Simulation)

mod clock;
mod machine;
mod process;
mod simulator;

pub use clock::{EventScheduler, Wakeup};
pub use machine::MachineProcess;
pub use process::{DurationFactorFn, ProcessContext, ProcessId, SimulationEvent};
pub use simulator::{Simulator, Step};
