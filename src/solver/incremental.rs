//! Repeated solves over one long-lived tracker.

use super::engine::{TimetableOutcome, TimetableRequest, TimetableSolver};
use crate::tracker::ResourceTracker;

/// Runs a solver repeatedly, reusing one tracker allocation.
///
/// The tracker is cleared at the start of every run, so nothing booked by a
/// previous run leaks into the next one.
pub struct IncrementalScheduler {
    solver: TimetableSolver,
    tracker: ResourceTracker,
    runs: usize,
}

impl IncrementalScheduler {
    pub fn new(solver: TimetableSolver) -> Self {
        Self {
            solver,
            tracker: ResourceTracker::new(),
            runs: 0,
        }
    }

    /// Clears the tracker and solves `request`.
    pub fn run(&mut self, request: &TimetableRequest) -> TimetableOutcome {
        self.tracker.clear();
        self.runs += 1;
        log::debug!("incremental run {}", self.runs);
        self.solver.solve_with_tracker(request, &mut self.tracker)
    }

    /// Number of completed runs.
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Reservations left by the latest run.
    pub fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }
}
