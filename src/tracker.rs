//! Resource tracker.
//!
//! Per-resource interval index for instructors, rooms and sections. Each
//! resource keeps one bucket per teaching day holding reservations sorted by
//! start time.
//!
//! # Algorithm
//! A bucket also remembers the longest reservation it holds. Any reservation
//! starting at or before `query.start - longest` must end by `query.start`,
//! so a binary search on `start + longest <= query.start` skips everything
//! that cannot overlap, even though ends are not sorted. The scan then runs
//! forward while `reservation.start < query.end`.
//!
//! Multi-resource bookings go through [`ResourceTracker::reserve_all`], which
//! validates every resource first and reserves nothing if any check fails.
//!
//! # Complexity
//! Availability: O(log n + k) per resource and day, k = overlapping
//! candidates. Insertion: O(n) for the sorted insert.

use std::collections::{BTreeMap, HashMap};

use crate::models::{
    Conflict, ConflictType, Day, DayPattern, Minute, TimeWindow, PLACEHOLDER_ROOM,
};

/// Kind of tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Instructor,
    Room,
    Section,
}

impl ResourceKind {
    /// Conflict type raised when this resource is double-booked.
    pub fn conflict_type(self) -> ConflictType {
        match self {
            ResourceKind::Instructor => ConflictType::Instructor,
            ResourceKind::Room => ConflictType::Room,
            ResourceKind::Section => ConflictType::Section,
        }
    }
}

/// Who holds a reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holder {
    pub course_key: String,
    pub subject_code: String,
    pub instructor_id: String,
}

/// A booked interval on one resource and day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub window: TimeWindow,
    pub holder: Holder,
}

/// Usage counters for one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceLoad {
    /// Number of reservations.
    pub reservations: usize,
    /// Total booked minutes.
    pub minutes: u32,
    /// Reservations per day.
    pub per_day: [usize; 6],
}

/// How strictly a booking is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Instructor, room and every section must be free.
    Strict,
    /// Instructor and room must be free; sections are not checked.
    RelaxedSection,
    /// Like `RelaxedSection`, but instructor and room overlaps are tolerated
    /// when the existing reservation has the same subject and instructor at
    /// the identical window.
    Combined,
    /// Instructor and sections must be free; the room may be double-booked.
    IgnoreRoom,
}

/// A multi-resource booking request.
#[derive(Debug, Clone, Copy)]
pub struct Booking<'a> {
    pub course_key: &'a str,
    pub subject_code: &'a str,
    pub instructor_id: &'a str,
    pub room_id: &'a str,
    pub section_ids: &'a [String],
    pub days: DayPattern,
    pub window: TimeWindow,
}

impl Booking<'_> {
    fn holder(&self) -> Holder {
        Holder {
            course_key: self.course_key.to_string(),
            subject_code: self.subject_code.to_string(),
            instructor_id: self.instructor_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct DayBucket {
    entries: Vec<Reservation>,
    longest: Minute,
}

impl DayBucket {
    fn overlapping(&self, window: TimeWindow) -> impl Iterator<Item = &Reservation> {
        let longest = self.longest;
        let lo = self
            .entries
            .partition_point(|r| r.window.start + longest <= window.start);
        self.entries[lo..]
            .iter()
            .take_while(move |r| r.window.start < window.end)
            .filter(move |r| r.window.overlaps(&window))
    }

    fn insert(&mut self, reservation: Reservation) {
        let pos = self
            .entries
            .partition_point(|r| r.window.start <= reservation.window.start);
        self.longest = self.longest.max(reservation.window.duration());
        self.entries.insert(pos, reservation);
    }
}

#[derive(Debug, Clone, Default)]
struct ResourceEntry {
    days: [DayBucket; 6],
    load: ResourceLoad,
}

/// Availability index over instructors, rooms and sections.
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    instructors: HashMap<String, ResourceEntry>,
    rooms: HashMap<String, ResourceEntry>,
    sections: HashMap<String, ResourceEntry>,
    day_load: [usize; 6],
    start_load: BTreeMap<Minute, usize>,
    bookings: usize,
}

fn repair(window: TimeWindow) -> TimeWindow {
    let (fixed, malformed) = window.normalized();
    if malformed {
        log::warn!("malformed window {window:?}, using {fixed:?}");
    }
    fixed
}

fn untracked(kind: ResourceKind, id: &str) -> bool {
    kind == ResourceKind::Room && id == PLACEHOLDER_ROOM
}

impl ResourceTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every reservation and counter.
    pub fn clear(&mut self) {
        self.instructors.clear();
        self.rooms.clear();
        self.sections.clear();
        self.day_load = [0; 6];
        self.start_load.clear();
        self.bookings = 0;
    }

    fn table(&self, kind: ResourceKind) -> &HashMap<String, ResourceEntry> {
        match kind {
            ResourceKind::Instructor => &self.instructors,
            ResourceKind::Room => &self.rooms,
            ResourceKind::Section => &self.sections,
        }
    }

    fn table_mut(&mut self, kind: ResourceKind) -> &mut HashMap<String, ResourceEntry> {
        match kind {
            ResourceKind::Instructor => &mut self.instructors,
            ResourceKind::Room => &mut self.rooms,
            ResourceKind::Section => &mut self.sections,
        }
    }

    /// Reservations of one resource on one day that overlap `window`.
    pub fn overlapping(
        &self,
        kind: ResourceKind,
        id: &str,
        day: Day,
        window: TimeWindow,
    ) -> Vec<&Reservation> {
        let window = repair(window);
        match self.table(kind).get(id) {
            Some(entry) if !untracked(kind, id) => {
                entry.days[day.index()].overlapping(window).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Whether the resource is free on every day of `days` during `window`.
    pub fn is_available(
        &self,
        kind: ResourceKind,
        id: &str,
        days: impl Into<DayPattern>,
        window: TimeWindow,
    ) -> bool {
        let window = repair(window);
        if untracked(kind, id) {
            return true;
        }
        let Some(entry) = self.table(kind).get(id) else {
            return true;
        };
        days.into()
            .iter()
            .all(|day| entry.days[day.index()].overlapping(window).next().is_none())
    }

    /// Whether every overlap is a combined section: same subject and
    /// instructor at the identical window.
    pub fn is_available_combined(
        &self,
        kind: ResourceKind,
        id: &str,
        days: impl Into<DayPattern>,
        window: TimeWindow,
        subject_code: &str,
        instructor_id: &str,
    ) -> bool {
        let window = repair(window);
        days.into().iter().all(|day| {
            self.overlapping(kind, id, day, window).iter().all(|r| {
                r.window == window
                    && r.holder.subject_code == subject_code
                    && r.holder.instructor_id == instructor_id
            })
        })
    }

    /// Inserts a single reservation, keeping the day bucket sorted.
    pub fn reserve(
        &mut self,
        kind: ResourceKind,
        id: &str,
        days: impl Into<DayPattern>,
        window: TimeWindow,
        holder: &Holder,
    ) {
        if untracked(kind, id) {
            return;
        }
        let window = repair(window);
        let entry = self.table_mut(kind).entry(id.to_string()).or_default();
        for day in days.into().iter() {
            entry.days[day.index()].insert(Reservation {
                window,
                holder: holder.clone(),
            });
            entry.load.reservations += 1;
            entry.load.minutes += window.duration();
            entry.load.per_day[day.index()] += 1;
        }
    }

    /// Runs every check of a strict booking without short-circuiting.
    pub fn validate(&self, booking: &Booking<'_>) -> Vec<Conflict> {
        self.validate_with(booking, ValidationMode::Strict)
    }

    /// Runs the checks `mode` requires and returns every clash found.
    pub fn validate_with(&self, booking: &Booking<'_>, mode: ValidationMode) -> Vec<Conflict> {
        let window = repair(booking.window);
        let mut checks: Vec<(ResourceKind, &str)> = Vec::new();
        checks.push((ResourceKind::Instructor, booking.instructor_id));
        if mode != ValidationMode::IgnoreRoom {
            checks.push((ResourceKind::Room, booking.room_id));
        }
        if matches!(mode, ValidationMode::Strict | ValidationMode::IgnoreRoom) {
            checks.extend(
                booking
                    .section_ids
                    .iter()
                    .map(|s| (ResourceKind::Section, s.as_str())),
            );
        }

        let mut conflicts = Vec::new();
        for (kind, id) in checks {
            for day in booking.days.iter() {
                let clashing: Vec<&Reservation> = self
                    .overlapping(kind, id, day, window)
                    .into_iter()
                    .filter(|r| {
                        !(mode == ValidationMode::Combined
                            && kind != ResourceKind::Section
                            && r.window == window
                            && r.holder.subject_code == booking.subject_code
                            && r.holder.instructor_id == booking.instructor_id)
                    })
                    .collect();
                if clashing.is_empty() {
                    continue;
                }
                let mut participants = vec![booking.course_key.to_string()];
                participants.extend(clashing.iter().map(|r| r.holder.course_key.clone()));
                conflicts.push(
                    Conflict::new(kind.conflict_type(), id, participants).at(day, window),
                );
            }
        }
        conflicts
    }

    /// Validates strictly, then reserves every resource of the booking.
    ///
    /// On any conflict nothing is reserved and the conflicts are returned.
    pub fn reserve_all(&mut self, booking: &Booking<'_>) -> Result<(), Vec<Conflict>> {
        self.reserve_all_with(booking, ValidationMode::Strict)
    }

    /// [`ResourceTracker::reserve_all`] with a relaxed validation mode.
    pub fn reserve_all_with(
        &mut self,
        booking: &Booking<'_>,
        mode: ValidationMode,
    ) -> Result<(), Vec<Conflict>> {
        let conflicts = self.validate_with(booking, mode);
        if !conflicts.is_empty() {
            return Err(conflicts);
        }
        self.reserve_all_trusted(booking);
        Ok(())
    }

    /// Reserves every resource of the booking without validation.
    pub fn reserve_all_trusted(&mut self, booking: &Booking<'_>) {
        let holder = booking.holder();
        let window = repair(booking.window);
        self.reserve(
            ResourceKind::Instructor,
            booking.instructor_id,
            booking.days,
            window,
            &holder,
        );
        self.reserve(ResourceKind::Room, booking.room_id, booking.days, window, &holder);
        for section in booking.section_ids {
            self.reserve(ResourceKind::Section, section, booking.days, window, &holder);
        }
        for day in booking.days.iter() {
            self.day_load[day.index()] += 1;
            *self.start_load.entry(window.start).or_insert(0) += 1;
            self.bookings += 1;
        }
    }

    /// Usage counters of one resource.
    pub fn load(&self, kind: ResourceKind, id: &str) -> ResourceLoad {
        self.table(kind)
            .get(id)
            .map(|e| e.load)
            .unwrap_or_default()
    }

    /// Bookings on a day.
    pub fn day_load(&self, day: Day) -> usize {
        self.day_load[day.index()]
    }

    /// Mean bookings per teaching day.
    pub fn average_day_load(&self) -> f64 {
        self.day_load.iter().sum::<usize>() as f64 / self.day_load.len() as f64
    }

    /// Bookings starting at `start`, across all days.
    pub fn start_load(&self, start: Minute) -> usize {
        self.start_load.get(&start).copied().unwrap_or(0)
    }

    /// Total day-bookings recorded.
    pub fn booking_count(&self) -> usize {
        self.bookings
    }

    /// Whether nothing is reserved.
    pub fn is_empty(&self) -> bool {
        self.bookings == 0
            && self.instructors.is_empty()
            && self.rooms.is_empty()
            && self.sections.is_empty()
    }
}
