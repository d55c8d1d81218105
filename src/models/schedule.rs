//! Timetable (solution) model.
//!
//! A [`Schedule`] is the list of [`ScheduleEntry`]s produced by the solver:
//! one entry per course request per session. Members of a joint unit get one
//! entry each, sharing day, window and room.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::{DayPattern, TimeWindow};

/// The placement stage that produced an entry, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlacementStage {
    /// Ranked slot, distribution-chosen room, same start time.
    Primary,
    /// Any structurally valid room.
    RoomRelaxed,
    /// Same-time rule dropped.
    SameTimeRelaxed,
    /// Room double-booking allowed.
    Emergency,
    /// Final pass that never leaves a session unplaced.
    Forced,
    /// Placement rewritten by the genetic refiner.
    Refined,
}

impl PlacementStage {
    /// Stages of the fallback ladder that run before the force pass.
    pub const LADDER: [PlacementStage; 4] = [
        PlacementStage::Primary,
        PlacementStage::RoomRelaxed,
        PlacementStage::SameTimeRelaxed,
        PlacementStage::Emergency,
    ];

    /// Short name.
    pub fn name(self) -> &'static str {
        match self {
            PlacementStage::Primary => "primary",
            PlacementStage::RoomRelaxed => "room-relaxed",
            PlacementStage::SameTimeRelaxed => "same-time-relaxed",
            PlacementStage::Emergency => "emergency",
            PlacementStage::Forced => "forced",
            PlacementStage::Refined => "refined",
        }
    }
}

/// One scheduled session of one course request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub course_key: String,
    pub instructor_id: String,
    pub subject_code: String,
    pub section_id: String,
    pub year_level: String,
    /// Meeting day(s). The solver always emits a single day; bookings loaded
    /// from upstream may carry joint patterns such as `Mon+Sat`.
    pub days: DayPattern,
    #[serde(flatten)]
    pub window: TimeWindow,
    pub room_id: String,
    pub duration_hours: f64,
    /// Zero-based session ordinal within the course.
    pub session: usize,
    pub stage: PlacementStage,
    pub emergency_scheduled: bool,
}

impl ScheduleEntry {
    /// Whether the two entries share at least one day and overlap in time.
    pub fn overlaps(&self, other: &ScheduleEntry) -> bool {
        self.days.intersects(other.days) && self.window.overlaps(&other.window)
    }
}

/// A complete timetable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    /// Scheduled sessions.
    pub entries: Vec<ScheduleEntry>,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    pub fn add(&mut self, entry: ScheduleEntry) {
        self.entries.push(entry);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the schedule has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one course.
    pub fn entries_for_course<'a>(
        &'a self,
        course_key: &'a str,
    ) -> impl Iterator<Item = &'a ScheduleEntry> + 'a {
        self.entries.iter().filter(move |e| e.course_key == course_key)
    }

    /// Number of sessions placed per course key.
    pub fn placed_counts(&self) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for e in &self.entries {
            *counts.entry(e.course_key.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Days already used by a course.
    pub fn used_days(&self, course_key: &str) -> DayPattern {
        self.entries_for_course(course_key)
            .fold(DayPattern::empty(), |acc, e| {
                e.days.iter().fold(acc, DayPattern::with)
            })
    }

    /// Entries per placement stage.
    pub fn stage_counts(&self) -> BTreeMap<PlacementStage, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.entries {
            *counts.entry(e.stage).or_insert(0) += 1;
        }
        counts
    }

    /// Number of entries flagged as emergency placements.
    pub fn emergency_count(&self) -> usize {
        self.entries.iter().filter(|e| e.emergency_scheduled).count()
    }

    /// Booked minutes per room (placeholder rooms included).
    pub fn room_minutes(&self) -> HashMap<&str, u32> {
        let mut minutes = HashMap::new();
        for e in &self.entries {
            *minutes.entry(e.room_id.as_str()).or_insert(0) +=
                e.window.duration() * e.days.len() as u32;
        }
        minutes
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::models::Day;

    /// Builds a single-day entry for tests.
    #[allow(clippy::too_many_arguments)]
    pub fn entry(
        key: &str,
        instructor: &str,
        subject: &str,
        section: &str,
        room: &str,
        day: Day,
        start: u32,
        end: u32,
    ) -> ScheduleEntry {
        ScheduleEntry {
            course_key: key.into(),
            instructor_id: instructor.into(),
            subject_code: subject.into(),
            section_id: section.into(),
            year_level: "1".into(),
            days: DayPattern::single(day),
            window: TimeWindow::new(start, end),
            room_id: room.into(),
            duration_hours: (end - start) as f64 / 60.0,
            session: 0,
            stage: PlacementStage::Primary,
            emergency_scheduled: false,
        }
    }
}
