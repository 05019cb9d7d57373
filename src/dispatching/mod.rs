//! Dispatching rules and rule engine for conflict resolution.
//!
//! When several operations compete for the same machine type, the planner
//! asks a [`RuleEngine`] which one goes first. Rules score a [`Candidate`];
//! the engine compares scores rule by rule and falls back to stable input
//! order.
//!
//! # Usage
//!
//! ```
//! use jobshop_sim::dispatching::{RuleEngine, SchedulingContext};
//! use jobshop_sim::dispatching::rules;
//!
//! let engine = RuleEngine::new()
//!     .with_rule(rules::Spt)
//!     .with_tie_breaker(rules::MostWorkRemaining);
//!
//! let context = SchedulingContext::at_time(0);
//! assert!(engine.select_best(&[], &context).is_none());
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

mod context;
mod engine;
pub mod rules;

pub use context::SchedulingContext;
pub use engine::{EvaluationMode, RuleEngine, TieBreaker};

use crate::models::{MachineType, OperationId, WorkOrderId};
use std::fmt::Debug;

/// Score returned by a dispatching rule.
///
/// Lower scores = higher priority (scheduled first).
pub type RuleScore = f64;

/// An operation competing for a machine type during planning.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub operation: OperationId,
    pub work_order: WorkOrderId,
    pub machine_type: MachineType,
    /// Nominal processing time (ms).
    pub duration_ms: i64,
    /// Current earliest start (ms).
    pub start_ms: i64,
    /// Position in the planner's input; the final tie-break.
    pub sequence: usize,
}

impl Candidate {
    /// Earliest finish (ms).
    #[inline]
    pub fn finish_ms(&self) -> i64 {
        self.start_ms + self.duration_ms
    }
}

/// A dispatching rule that evaluates candidate priority.
///
/// # Score Convention
/// **Lower score = higher priority.**
///
/// # Reference
/// Pinedo (2016), "Scheduling", Ch. 4: Priority Dispatching
pub trait DispatchingRule: Send + Sync + Debug {
    /// Rule name (e.g., "SPT").
    fn name(&self) -> &'static str;

    /// Scores a candidate; lower = higher priority.
    fn evaluate(&self, candidate: &Candidate, context: &SchedulingContext) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
