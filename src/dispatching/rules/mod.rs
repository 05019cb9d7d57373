//! Built-in dispatching rules.
//!
//! # Categories
//!
//! - **Time-based**: SPT, LPT, EST
//! - **Work content**: MWKR
//!
//! # Score Convention
//! All rules return lower scores for higher priority candidates.
//!
//! # References
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Giffler & Thompson (1960), "Algorithms for Solving Production-Scheduling Problems"

use super::{Candidate, DispatchingRule, RuleScore, SchedulingContext};

/// Shortest Processing Time.
///
/// The default conflict rule of the Giffler-Thompson planner.
///
/// # Reference
/// Smith (1956), optimal for minimizing mean flow time on single machine.
#[derive(Debug, Clone, Copy)]
pub struct Spt;

impl DispatchingRule for Spt {
    fn name(&self) -> &'static str {
        "SPT"
    }

    fn evaluate(&self, candidate: &Candidate, _context: &SchedulingContext) -> RuleScore {
        candidate.duration_ms as f64
    }

    fn description(&self) -> &'static str {
        "Shortest Processing Time"
    }
}

/// Longest Processing Time.
#[derive(Debug, Clone, Copy)]
pub struct Lpt;

impl DispatchingRule for Lpt {
    fn name(&self) -> &'static str {
        "LPT"
    }

    fn evaluate(&self, candidate: &Candidate, _context: &SchedulingContext) -> RuleScore {
        -(candidate.duration_ms as f64)
    }

    fn description(&self) -> &'static str {
        "Longest Processing Time"
    }
}

/// Earliest Start.
///
/// Prefers the candidate that could start soonest, which keeps the
/// conflict set in release order.
#[derive(Debug, Clone, Copy)]
pub struct EarliestStart;

impl DispatchingRule for EarliestStart {
    fn name(&self) -> &'static str {
        "EST"
    }

    fn evaluate(&self, candidate: &Candidate, _context: &SchedulingContext) -> RuleScore {
        candidate.start_ms as f64
    }

    fn description(&self) -> &'static str {
        "Earliest Start"
    }
}

/// Most Work Remaining.
///
/// Prefers work orders with the most unplanned processing left. Falls back
/// to the candidate's own duration when the context has no entry.
#[derive(Debug, Clone, Copy)]
pub struct MostWorkRemaining;

impl DispatchingRule for MostWorkRemaining {
    fn name(&self) -> &'static str {
        "MWKR"
    }

    fn evaluate(&self, candidate: &Candidate, context: &SchedulingContext) -> RuleScore {
        let remaining = context
            .remaining_work
            .get(&candidate.work_order)
            .copied()
            .unwrap_or(candidate.duration_ms);
        -(remaining as f64)
    }

    fn description(&self) -> &'static str {
        "Most Work Remaining"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MachineType, OperationId, WorkOrderId};

    fn candidate(duration_ms: i64, start_ms: i64, work_order: usize) -> Candidate {
        Candidate {
            operation: OperationId(0),
            work_order: WorkOrderId(work_order),
            machine_type: MachineType(1),
            duration_ms,
            start_ms,
            sequence: 0,
        }
    }

    #[test]
    fn test_spt_and_lpt() {
        let ctx = SchedulingContext::at_time(0);
        let c = candidate(3000, 0, 0);
        assert!((Spt.evaluate(&c, &ctx) - 3000.0).abs() < 1e-10);
        assert!((Lpt.evaluate(&c, &ctx) + 3000.0).abs() < 1e-10);
    }

    #[test]
    fn test_earliest_start() {
        let ctx = SchedulingContext::at_time(0);
        let early = candidate(1000, 500, 0);
        let late = candidate(1000, 900, 0);
        assert!(EarliestStart.evaluate(&early, &ctx) < EarliestStart.evaluate(&late, &ctx));
    }

    #[test]
    fn test_mwkr_uses_context() {
        let ctx = SchedulingContext::at_time(0).with_remaining_work(WorkOrderId(1), 10_000);
        let heavy = candidate(1000, 0, 1);
        let light = candidate(2000, 0, 2);
        assert!((MostWorkRemaining.evaluate(&heavy, &ctx) + 10_000.0).abs() < 1e-10);
        // No entry → own duration.
        assert!((MostWorkRemaining.evaluate(&light, &ctx) + 2000.0).abs() < 1e-10);
    }

    #[test]
    fn test_rule_names() {
        assert_eq!(Spt.name(), "SPT");
        assert_eq!(MostWorkRemaining.description(), "Most Work Remaining");
    }
}
