//! External duplicate-booking guard.
//!
//! Before a solve, the guard is asked once for the bookings already held
//! under the request's context id. They are pre-reserved in the tracker
//! so the solver schedules around them, and handed to the genetic refiner
//! as fixed entries. Bookings naming a room that is not in the pool are
//! skipped.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::TimetableError;
use crate::models::{
    DayPattern, PlacementStage, Room, ScheduleEntry, TimeWindow, PLACEHOLDER_ROOM,
};
use crate::tracker::{Booking, ResourceTracker};
use crate::validation::{ValidationIssue, ValidationIssueKind};

/// A booking held outside the current solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardBooking {
    pub course_key: String,
    pub instructor_id: String,
    pub subject_code: String,
    pub room_id: String,
    #[serde(default)]
    pub section_ids: Vec<String>,
    pub days: DayPattern,
    #[serde(flatten)]
    pub window: TimeWindow,
}

impl GuardBooking {
    /// The booking as timetable entries, one per section.
    ///
    /// A booking without sections yields one entry whose section is its
    /// course key.
    pub fn entries(&self) -> Vec<ScheduleEntry> {
        let sections: Vec<&str> = if self.section_ids.is_empty() {
            vec![self.course_key.as_str()]
        } else {
            self.section_ids.iter().map(String::as_str).collect()
        };
        sections
            .into_iter()
            .map(|section| ScheduleEntry {
                course_key: self.course_key.clone(),
                instructor_id: self.instructor_id.clone(),
                subject_code: self.subject_code.clone(),
                section_id: section.to_string(),
                year_level: String::new(),
                days: self.days,
                window: self.window,
                room_id: self.room_id.clone(),
                duration_hours: self.window.duration_hours(),
                session: 0,
                stage: PlacementStage::Primary,
                emergency_scheduled: false,
            })
            .collect()
    }
}

/// Source of pre-existing bookings.
pub trait BookingGuard: Send + Sync {
    /// Bookings held under `context_id`.
    fn bookings(&self, context_id: &str) -> Result<Vec<GuardBooking>, TimetableError>;
}

/// In-process guard backed by a map of context id to bookings.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGuard {
    by_context: HashMap<String, Vec<GuardBooking>>,
}

impl InMemoryGuard {
    /// Creates an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a booking under a context id.
    pub fn with_booking(mut self, context_id: impl Into<String>, booking: GuardBooking) -> Self {
        self.by_context
            .entry(context_id.into())
            .or_default()
            .push(booking);
        self
    }
}

impl BookingGuard for InMemoryGuard {
    fn bookings(&self, context_id: &str) -> Result<Vec<GuardBooking>, TimetableError> {
        Ok(self.by_context.get(context_id).cloned().unwrap_or_default())
    }
}

/// Result of [`preload`].
#[derive(Debug, Clone, Default)]
pub struct Preloaded {
    /// Bookings reserved in the tracker.
    pub reserved: usize,
    /// Entries of the reserved bookings.
    pub entries: Vec<ScheduleEntry>,
    /// One issue per skipped booking.
    pub issues: Vec<ValidationIssue>,
}

/// Reserves guard bookings in the tracker.
pub fn preload(
    tracker: &mut ResourceTracker,
    bookings: &[GuardBooking],
    rooms: &[Room],
) -> Preloaded {
    let known: HashSet<&str> = rooms.iter().map(|r| r.id.as_str()).collect();
    let mut out = Preloaded::default();

    for b in bookings {
        if b.room_id != PLACEHOLDER_ROOM && !known.contains(b.room_id.as_str()) {
            out.issues.push(ValidationIssue::new(
                ValidationIssueKind::UnknownRoomReference,
                format!("booking '{}' names unknown room '{}', skipped", b.course_key, b.room_id),
            ));
            continue;
        }
        tracker.reserve_all_trusted(&Booking {
            course_key: &b.course_key,
            subject_code: &b.subject_code,
            instructor_id: &b.instructor_id,
            room_id: &b.room_id,
            section_ids: &b.section_ids,
            days: b.days,
            window: b.window,
        });
        out.reserved += 1;
        out.entries.extend(b.entries());
    }

    log::debug!(
        "preloaded {} guard bookings, skipped {}",
        out.reserved,
        out.issues.len()
    );
    out
}
