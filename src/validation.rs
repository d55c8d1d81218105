//! Boundary normalization for timetabling input.
//!
//! Raw upstream rows are turned into typed models before scheduling. Bad data
//! never rejects the batch: missing fields get placeholders, unusable rooms
//! are skipped, and every substitution is reported as a
//! [`ValidationIssue`] and logged.
//!
//! Detects:
//! - Missing instructor, subject, section, year level or block
//! - Unit counts above the splitter's range
//! - Room rows without an id, inactive rooms and duplicate room ids
//! - Lab courses with no lab room available

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{CourseRecord, CourseRequest, EmploymentCategory, Room, RoomRecord};
use crate::sessions::MAX_UNITS;

/// Year level used when a record has none.
pub const PLACEHOLDER_YEAR: &str = "0";

/// Block used when a record has none.
pub const PLACEHOLDER_BLOCK: &str = "A";

/// Room category used when a room record has none.
pub const DEFAULT_ROOM_CATEGORY: &str = "General";

/// A data-quality finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Issue category.
    pub kind: ValidationIssueKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of data-quality findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationIssueKind {
    /// A required course field was missing and replaced.
    MissingField,
    /// Units above the supported range.
    UnitsClamped,
    /// Two requests expand to the same key.
    DuplicateKey,
    /// A room row without an id.
    MissingRoomId,
    /// An inactive room.
    InactiveRoom,
    /// Two rooms share an id.
    DuplicateRoomId,
    /// A booking names a room that does not exist.
    UnknownRoomReference,
    /// A course needs a room kind that does not exist.
    NoSuitableRoom,
}

impl ValidationIssue {
    pub(crate) fn new(kind: ValidationIssueKind, message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!("{message}");
        Self { kind, message }
    }
}

/// Normalized items plus the issues found while producing them.
#[derive(Debug, Clone)]
pub struct Normalized<T> {
    pub items: Vec<T>,
    pub issues: Vec<ValidationIssue>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Turns raw course rows into requests, substituting placeholders.
///
/// Placeholders for instructor, subject and section include the row number
/// so that unrelated incomplete rows never merge into one course.
pub fn normalize_courses(records: &[CourseRecord], department: &str) -> Normalized<CourseRequest> {
    let mut items = Vec::with_capacity(records.len());
    let mut issues = Vec::new();

    for (row, rec) in records.iter().enumerate() {
        let mut field = |value: &Option<String>, name: &str, fallback: String| -> String {
            match present(value) {
                Some(v) => v.to_string(),
                None => {
                    issues.push(ValidationIssue::new(
                        ValidationIssueKind::MissingField,
                        format!("row {row}: missing {name}, using '{fallback}'"),
                    ));
                    fallback
                }
            }
        };

        let instructor = field(&rec.instructor_id, "instructorId", format!("TBA-INSTRUCTOR-{row}"));
        let subject = field(&rec.subject_code, "subjectCode", format!("TBA-SUBJECT-{row}"));
        let section = field(&rec.section_id, "sectionId", format!("TBA-SECTION-{row}"));
        let year = field(&rec.year_level, "yearLevel", PLACEHOLDER_YEAR.to_string());
        let block = field(&rec.block, "block", PLACEHOLDER_BLOCK.to_string());

        let raw_units = rec.units.unwrap_or(0);
        if raw_units > MAX_UNITS {
            issues.push(ValidationIssue::new(
                ValidationIssueKind::UnitsClamped,
                format!("row {row}: {raw_units} units clamped to {MAX_UNITS}"),
            ));
        }

        let dept = present(&rec.department).unwrap_or(department).to_string();
        items.push(
            CourseRequest::new(instructor, subject, section, raw_units.min(MAX_UNITS))
                .with_year_level(year)
                .with_block(block)
                .with_category(rec.employment_category.unwrap_or(EmploymentCategory::FullTime))
                .with_lab(rec.requires_lab.unwrap_or(false))
                .with_department(dept),
        );
    }

    Normalized { items, issues }
}

/// Turns raw room rows into rooms, skipping unusable ones.
pub fn normalize_rooms(records: &[RoomRecord]) -> Normalized<Room> {
    let mut items = Vec::new();
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for (row, rec) in records.iter().enumerate() {
        let Some(id) = present(&rec.id) else {
            issues.push(ValidationIssue::new(
                ValidationIssueKind::MissingRoomId,
                format!("room row {row} has no id, skipped"),
            ));
            continue;
        };
        if !rec.active {
            issues.push(ValidationIssue::new(
                ValidationIssueKind::InactiveRoom,
                format!("room '{id}' is inactive, skipped"),
            ));
            continue;
        }
        if !seen.insert(id.to_string()) {
            issues.push(ValidationIssue::new(
                ValidationIssueKind::DuplicateRoomId,
                format!("duplicate room id '{id}', keeping the first"),
            ));
            continue;
        }

        let mut room = Room::new(id, present(&rec.category).unwrap_or(DEFAULT_ROOM_CATEGORY))
            .with_lab(rec.is_lab.unwrap_or(false));
        if let Some(name) = present(&rec.name) {
            room = room.with_name(name);
        }
        if let Some(capacity) = rec.capacity {
            room = room.with_capacity(capacity);
        }
        items.push(room);
    }

    Normalized { items, issues }
}

/// Checks typed requests against the room pool.
///
/// Reports lab or lecture courses for which no room of the right kind
/// exists; such courses are placed in the placeholder room.
pub fn check_rooms(requests: &[CourseRequest], rooms: &[Room]) -> Vec<ValidationIssue> {
    let has_lab = rooms.iter().any(|r| r.is_lab);
    let has_lecture = rooms.iter().any(|r| !r.is_lab);
    let mut reported = HashSet::new();
    let mut issues = Vec::new();

    for req in requests {
        let missing = if req.requires_lab { !has_lab } else { !has_lecture };
        if missing && reported.insert(req.requires_lab) {
            let kind = if req.requires_lab { "lab" } else { "lecture" };
            issues.push(ValidationIssue::new(
                ValidationIssueKind::NoSuitableRoom,
                format!("no {kind} room available, e.g. for '{}'", req.key),
            ));
        }
    }
    issues
}
