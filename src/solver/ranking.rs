//! Slot ranking for the greedy stages.
//!
//! Candidates are ordered by, in turn: exact duration first, least-crowded
//! start time across the week, lowest day load, not adjacent to a day the
//! course already uses, and day load at or below the weekly average. Day and
//! window break the remaining ties.

use crate::catalog::{DurationFit, TimeSlot};
use crate::models::DayPattern;
use crate::tracker::ResourceTracker;

/// Orders candidate slots, best first.
pub fn rank_slots(
    candidates: Vec<(TimeSlot, DurationFit)>,
    tracker: &ResourceTracker,
    used_days: DayPattern,
) -> Vec<TimeSlot> {
    let average = tracker.average_day_load();
    let mut keyed: Vec<_> = candidates
        .into_iter()
        .map(|(slot, fit)| {
            let day_load = tracker.day_load(slot.day);
            (
                fit != DurationFit::Exact,
                tracker.start_load(slot.window.start),
                day_load,
                used_days.iter().any(|d| d.is_adjacent(slot.day)),
                day_load as f64 > average,
                slot,
            )
        })
        .collect();
    keyed.sort();
    keyed.into_iter().map(|k| k.5).collect()
}
