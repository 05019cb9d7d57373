//! Right-shift delay propagation.
//!
//! When an operation finishes later than planned, every operation that
//! depends on it (the next one on the same machine and the next one of the
//! same work order) is pushed back by the delay it actually incurs, and the
//! push continues from each shifted operation. Gaps in the plan absorb
//! delay: an operation is moved only as far as needed to start after its
//! predecessor's latest finish.
//!
//! # Reference
//! Sabuncuoglu & Bayiz (2000), "Analysis of reactive scheduling problems
//! in a job shop environment", EJOR 126(3)

use tracing::debug;

use crate::error::Result;
use crate::models::{OperationId, Workshop};

/// Shifts the dependents of `origin` after its latest finish moved.
///
/// `active` lists the operations still being simulated; machine order is
/// taken among these, sorted stably by planned start. Machine successors
/// are followed before routing successors. Returns the number of shifts
/// applied.
pub fn propagate(workshop: &mut Workshop, active: &[OperationId], origin: OperationId) -> Result<usize> {
    let mut shifts = 0;
    let mut edges = Vec::new();
    push_successors(workshop, active, origin, &mut edges)?;

    while let Some((predecessor, successor)) = edges.pop() {
        let finish = workshop.operation(predecessor)?.latest_finish_ms;
        let op = workshop.operation_mut(successor)?;
        let delay = finish - op.earliest_start_ms;
        if delay <= 0 {
            continue;
        }
        op.shift(delay);
        shifts += 1;
        debug!(operation = %successor, after = %predecessor, delay_ms = delay, "right-shifted");
        push_successors(workshop, active, successor, &mut edges)?;
    }
    Ok(shifts)
}

/// Pushes `(operation, successor)` edges; the machine successor goes on
/// top so it is handled first.
fn push_successors(
    workshop: &Workshop,
    active: &[OperationId],
    operation: OperationId,
    edges: &mut Vec<(OperationId, OperationId)>,
) -> Result<()> {
    if let Some(next) = workshop.operation(operation)?.successor {
        edges.push((operation, next));
    }
    if let Some(next) = machine_successor(workshop, active, operation)? {
        edges.push((operation, next));
    }
    Ok(())
}

/// The operation after `operation` on its machine, by planned start.
fn machine_successor(
    workshop: &Workshop,
    active: &[OperationId],
    operation: OperationId,
) -> Result<Option<OperationId>> {
    let Some(machine) = workshop.operation(operation)?.machine else {
        return Ok(None);
    };

    let mut on_machine = Vec::new();
    for &id in active {
        let op = workshop.operation(id)?;
        if op.machine == Some(machine) {
            on_machine.push((op.earliest_start_ms, id));
        }
    }
    if !active.contains(&operation) {
        let op = workshop.operation(operation)?;
        on_machine.push((op.earliest_start_ms, operation));
    }
    on_machine.sort_by_key(|(start, _)| *start);

    Ok(on_machine
        .iter()
        .position(|(_, id)| *id == operation)
        .and_then(|i| on_machine.get(i + 1))
        .map(|(_, id)| *id))
}
