//! Conflict detection.
//!
//! Scans a candidate timetable and classifies clashes by type and severity.
//! The same pass validates solver output and scores genetic-refiner
//! individuals.
//!
//! # Algorithm
//! 1. Expand every entry's day pattern into atomic days and group entries by
//!    `(day, start, end)`.
//! 2. Within a group: an instructor teaching more than one distinct subject
//!    is one instructor conflict; a room hosting more than one distinct
//!    `(instructor, subject)` event is one room conflict; a section appearing
//!    under more than one course is one section conflict. Same instructor and
//!    subject at the same time is a combined section.
//! 3. Groups on the same day whose windows partially overlap are compared
//!    pairwise, once per entry pair. A combined section needs the exact same
//!    window, so here a shared instructor or room always clashes.
//! 4. Any entry intersecting lunch is a lunch conflict.
//!
//! Output order is fully determined by the input, so detection is
//! idempotent.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{
    Conflict, ConflictReport, ConflictType, Day, DayPattern, Minute, ScheduleEntry, TimeWindow,
    PLACEHOLDER_ROOM,
};

type GroupKey = (Day, Minute, Minute);

/// Timetable conflict detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector;

impl ConflictDetector {
    /// Detects every conflict in `entries`.
    pub fn detect(entries: &[ScheduleEntry]) -> ConflictReport {
        let mut conflicts = Vec::new();

        for e in entries {
            if e.window.hits_lunch() {
                let mut c = Conflict::new(
                    ConflictType::Lunch,
                    e.course_key.as_str(),
                    vec![e.course_key.clone()],
                );
                if let Some(day) = e.days.iter().next() {
                    c = c.at(day, e.window);
                }
                conflicts.push(c);
            }
        }

        let mut groups: BTreeMap<GroupKey, Vec<&ScheduleEntry>> = BTreeMap::new();
        for e in entries {
            for day in e.days.iter() {
                groups
                    .entry((day, e.window.start, e.window.end))
                    .or_default()
                    .push(e);
            }
        }

        for (&(day, start, end), members) in &groups {
            group_conflicts(day, TimeWindow::new(start, end), members, &mut conflicts);
        }

        let keys: Vec<GroupKey> = groups.keys().copied().collect();
        for (i, &(day, _, end)) in keys.iter().enumerate() {
            for other in &keys[i + 1..] {
                if other.0 != day || other.1 >= end {
                    break;
                }
                for a in &groups[&keys[i]] {
                    for b in &groups[other] {
                        pair_conflicts(day, a, b, &mut conflicts);
                    }
                }
            }
        }

        ConflictReport::from_conflicts(conflicts)
    }
}

fn sorted_keys<'a>(entries: impl Iterator<Item = &'a ScheduleEntry>) -> Vec<String> {
    let keys: BTreeSet<&str> = entries.map(|e| e.course_key.as_str()).collect();
    keys.into_iter().map(String::from).collect()
}

fn group_conflicts(
    day: Day,
    window: TimeWindow,
    members: &[&ScheduleEntry],
    out: &mut Vec<Conflict>,
) {
    if members.len() < 2 {
        return;
    }

    let mut by_instructor: BTreeMap<&str, Vec<&ScheduleEntry>> = BTreeMap::new();
    let mut by_room: BTreeMap<&str, Vec<&ScheduleEntry>> = BTreeMap::new();
    let mut by_section: BTreeMap<&str, Vec<&ScheduleEntry>> = BTreeMap::new();
    for &e in members {
        by_instructor.entry(&e.instructor_id).or_default().push(e);
        if e.room_id != PLACEHOLDER_ROOM {
            by_room.entry(&e.room_id).or_default().push(e);
        }
        by_section.entry(&e.section_id).or_default().push(e);
    }

    for (instructor, list) in by_instructor {
        let subjects: BTreeSet<&str> = list.iter().map(|e| e.subject_code.as_str()).collect();
        if subjects.len() > 1 {
            out.push(
                Conflict::new(
                    ConflictType::Instructor,
                    instructor,
                    sorted_keys(list.into_iter()),
                )
                .at(day, window),
            );
        }
    }

    for (room, list) in by_room {
        let events: BTreeSet<(&str, &str)> = list
            .iter()
            .map(|e| (e.instructor_id.as_str(), e.subject_code.as_str()))
            .collect();
        if events.len() > 1 {
            out.push(
                Conflict::new(ConflictType::Room, room, sorted_keys(list.into_iter()))
                    .at(day, window),
            );
        }
    }

    for (section, list) in by_section {
        let keys = sorted_keys(list.into_iter());
        if keys.len() > 1 {
            out.push(Conflict::new(ConflictType::Section, section, keys).at(day, window));
        }
    }
}

fn pair_conflicts(day: Day, a: &ScheduleEntry, b: &ScheduleEntry, out: &mut Vec<Conflict>) {
    let participants = || vec![a.course_key.clone(), b.course_key.clone()];
    let window = a.window;
    let combined = a.window == b.window
        && a.instructor_id == b.instructor_id
        && a.subject_code == b.subject_code;

    if a.instructor_id == b.instructor_id && !combined {
        out.push(
            Conflict::new(ConflictType::Instructor, a.instructor_id.as_str(), participants())
                .at(day, window),
        );
    }
    if a.room_id == b.room_id && a.room_id != PLACEHOLDER_ROOM && !combined {
        out.push(
            Conflict::new(ConflictType::Room, a.room_id.as_str(), participants()).at(day, window),
        );
    }
    if a.section_id == b.section_id && a.course_key != b.course_key {
        out.push(
            Conflict::new(ConflictType::Section, a.section_id.as_str(), participants())
                .at(day, window),
        );
    }
}

#[derive(Debug, Clone)]
struct Indexed {
    days: DayPattern,
    window: TimeWindow,
    course_key: String,
    instructor_id: String,
    subject_code: String,
}

impl Indexed {
    fn clashes(&self, candidate: &ScheduleEntry) -> bool {
        self.course_key != candidate.course_key
            && self.days.intersects(candidate.days)
            && self.window.overlaps(&candidate.window)
    }

    fn combined_with(&self, candidate: &ScheduleEntry) -> bool {
        self.window == candidate.window
            && self.instructor_id == candidate.instructor_id
            && self.subject_code == candidate.subject_code
    }
}

/// Point-query index over accepted entries.
///
/// Answers whether a candidate clashes with anything already accepted for
/// its instructor, room or section, reporting the most severe type.
#[derive(Debug, Clone, Default)]
pub struct AcceptedIndex {
    instructors: HashMap<String, Vec<Indexed>>,
    rooms: HashMap<String, Vec<Indexed>>,
    sections: HashMap<String, Vec<Indexed>>,
    len: usize,
}

impl AcceptedIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes a batch of entries.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a ScheduleEntry>) -> Self {
        let mut index = Self::new();
        for e in entries {
            index.insert(e);
        }
        index
    }

    /// Accepts an entry.
    pub fn insert(&mut self, entry: &ScheduleEntry) {
        let item = Indexed {
            days: entry.days,
            window: entry.window,
            course_key: entry.course_key.clone(),
            instructor_id: entry.instructor_id.clone(),
            subject_code: entry.subject_code.clone(),
        };
        self.instructors
            .entry(entry.instructor_id.clone())
            .or_default()
            .push(item.clone());
        if entry.room_id != PLACEHOLDER_ROOM {
            self.rooms
                .entry(entry.room_id.clone())
                .or_default()
                .push(item.clone());
        }
        self.sections
            .entry(entry.section_id.clone())
            .or_default()
            .push(item);
        self.len += 1;
    }

    /// Number of accepted entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing was accepted.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The most severe clash between `candidate` and accepted entries.
    pub fn conflicts_with(&self, candidate: &ScheduleEntry) -> Option<ConflictType> {
        let hit = |map: &HashMap<String, Vec<Indexed>>, id: &str, f: &dyn Fn(&Indexed) -> bool| {
            map.get(id)
                .is_some_and(|list| list.iter().any(|i| i.clashes(candidate) && f(i)))
        };

        if hit(&self.sections, &candidate.section_id, &|_| true) {
            return Some(ConflictType::Section);
        }
        if hit(&self.instructors, &candidate.instructor_id, &|i| {
            !i.combined_with(candidate)
        }) {
            return Some(ConflictType::Instructor);
        }
        if candidate.room_id != PLACEHOLDER_ROOM
            && hit(&self.rooms, &candidate.room_id, &|i| !i.combined_with(candidate))
        {
            return Some(ConflictType::Room);
        }
        None
    }
}
