//! Virtual clock and wakeup queue.
//!
//! The scheduler orders pending process wakeups by `(time, sequence)`.
//! The sequence number is assigned at insertion, so wakeups at the same
//! instant resume in the order they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::ProcessId;

/// A pending resumption of one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wakeup {
    pub at_ms: i64,
    /// Insertion order; breaks ties between equal times.
    pub sequence: u64,
    pub process: ProcessId,
    /// Generation of the process when this wakeup was scheduled. A process
    /// that was interrupted has moved on and ignores older tokens.
    pub token: u64,
}

impl Ord for Wakeup {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior in BinaryHeap.
        other
            .at_ms
            .cmp(&self.at_ms)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Wakeup {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single-threaded virtual clock.
#[derive(Debug, Clone)]
pub struct EventScheduler {
    now_ms: i64,
    next_sequence: u64,
    queue: BinaryHeap<Wakeup>,
}

impl EventScheduler {
    /// Creates a clock positioned at `start_ms`.
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: start_ms,
            next_sequence: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// Current simulation time (ms).
    #[inline]
    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }

    /// Schedules a wakeup `delay_ms` from now. Negative delays resume now.
    pub fn schedule(&mut self, process: ProcessId, delay_ms: i64, token: u64) {
        self.schedule_at(process, self.now_ms + delay_ms.max(0), token);
    }

    /// Schedules a wakeup at an absolute time, clamped to now.
    pub fn schedule_at(&mut self, process: ProcessId, at_ms: i64, token: u64) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.push(Wakeup {
            at_ms: at_ms.max(self.now_ms),
            sequence,
            process,
            token,
        });
    }

    /// Time of the next pending wakeup.
    pub fn peek_time(&self) -> Option<i64> {
        self.queue.peek().map(|w| w.at_ms)
    }

    /// Pops the next wakeup due at or before `horizon_ms` and advances the
    /// clock to it. Returns `None` when nothing is due within the horizon.
    pub fn pop_until(&mut self, horizon_ms: i64) -> Option<Wakeup> {
        if self.peek_time()? > horizon_ms {
            return None;
        }
        let wakeup = self.queue.pop()?;
        self.now_ms = wakeup.at_ms;
        Some(wakeup)
    }

    /// Moves the clock forward to `time_ms` (never backwards).
    pub fn advance_to(&mut self, time_ms: i64) {
        self.now_ms = self.now_ms.max(time_ms);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MachineId;

    #[test]
    fn test_pops_in_time_order() {
        let mut clock = EventScheduler::new(0);
        clock.schedule(ProcessId::Replanning, 300, 0);
        clock.schedule(ProcessId::Machine(MachineId(0)), 100, 0);
        clock.schedule(ProcessId::OrderGeneration, 200, 0);

        let order: Vec<i64> = std::iter::from_fn(|| clock.pop_until(i64::MAX))
            .map(|w| w.at_ms)
            .collect();
        assert_eq!(order, vec![100, 200, 300]);
        assert_eq!(clock.now_ms(), 300);
    }

    #[test]
    fn test_fifo_for_equal_times() {
        let mut clock = EventScheduler::new(0);
        clock.schedule(ProcessId::Machine(MachineId(2)), 50, 0);
        clock.schedule(ProcessId::Machine(MachineId(0)), 50, 0);
        clock.schedule(ProcessId::Machine(MachineId(1)), 50, 0);

        let order: Vec<ProcessId> = std::iter::from_fn(|| clock.pop_until(i64::MAX))
            .map(|w| w.process)
            .collect();
        assert_eq!(
            order,
            vec![
                ProcessId::Machine(MachineId(2)),
                ProcessId::Machine(MachineId(0)),
                ProcessId::Machine(MachineId(1)),
            ]
        );
    }

    #[test]
    fn test_horizon_stops_popping() {
        let mut clock = EventScheduler::new(10);
        clock.schedule(ProcessId::Replanning, 100, 0);
        assert!(clock.pop_until(50).is_none());
        assert_eq!(clock.now_ms(), 10);
        assert_eq!(clock.pending(), 1);

        clock.advance_to(50);
        assert_eq!(clock.now_ms(), 50);
        assert!(clock.pop_until(110).is_some());
        assert!(clock.is_empty());
    }

    #[test]
    fn test_never_schedules_in_the_past() {
        let mut clock = EventScheduler::new(1000);
        clock.schedule(ProcessId::Replanning, -500, 0);
        clock.schedule_at(ProcessId::OrderGeneration, 10, 0);
        assert_eq!(clock.pop_until(i64::MAX).unwrap().at_ms, 1000);
        assert_eq!(clock.pop_until(i64::MAX).unwrap().at_ms, 1000);
    }
}
