//! Planners: turn not-yet-started operations into a [`Plan`].
//!
//! A planner is a pure function of the operations, machines, and time it is
//! given (plus its own seeded tie-break state). It never touches machine
//! queues; the controller applies the returned plan.
//!
//! # Algorithm
//!
//! [`GifflerThompsonPlanner`] builds an active schedule: repeatedly take the
//! operations with the minimum earliest finish, resolve the machine-type
//! conflict among them with a dispatching rule, and push competing
//! operations forward.
//!
//! # References
//!
//! - Giffler & Thompson (1960), "Algorithms for Solving Production-Scheduling Problems"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 7

mod giffler_thompson;
mod kpi;

pub use giffler_thompson::GifflerThompsonPlanner;
pub use kpi::{PlanKpi, ProductionStats};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{MachineId, OperationId, Plan, Workshop};
use crate::validation::validate_plan;

/// How the planner chooses among machine types that tie for the minimum
/// earliest finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MachineTypePolicy {
    /// Always the lowest machine type id.
    #[default]
    LowestTypeId,
    /// Uniformly at random from a dedicated RNG with the given seed.
    Seeded(u64),
}

/// A scheduling algorithm.
pub trait Planner {
    /// Algorithm name for logs.
    fn name(&self) -> &'static str;

    /// Computes a plan without validating it.
    ///
    /// `operations` must not contain started or completed operations;
    /// `machines` lists the machines that may receive work.
    fn schedule_internal(
        &mut self,
        workshop: &Workshop,
        operations: &[OperationId],
        machines: &[MachineId],
        now_ms: i64,
    ) -> Result<Plan>;

    /// Computes a plan and checks it for machine and work-order overlaps.
    ///
    /// # Errors
    /// [`Error::PlanOverlap`](crate::Error::PlanOverlap) when the algorithm
    /// produced an infeasible plan.
    fn schedule(
        &mut self,
        workshop: &Workshop,
        operations: &[OperationId],
        machines: &[MachineId],
        now_ms: i64,
    ) -> Result<Plan> {
        let plan = self.schedule_internal(workshop, operations, machines, now_ms)?;
        validate_plan(&plan)?;
        Ok(plan)
    }
}
