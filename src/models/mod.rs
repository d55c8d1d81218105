//! Timetabling domain models.
//!
//! Provides the core data types for representing class timetabling
//! problems and solutions.
//!
//! # Domain Mappings
//!
//! | u-timetable | Meaning |
//! |-------------|---------|
//! | CourseRequest | One course offering for one block of one section |
//! | JointUnit | Blocks of the same course that must meet together |
//! | Room | Bookable lecture or lab room |
//! | ScheduleEntry | One weekly session at a day, window and room |
//! | Conflict | A double-booking or blackout violation |

mod conflict;
mod course;
mod room;
mod schedule;
mod time;

pub use conflict::{Conflict, ConflictReport, ConflictType, Severity, SeverityCounts, TypeCounts};
pub use course::{CourseRecord, CourseRequest, EmploymentCategory, JointUnit};
pub use room::{Room, RoomRecord, PLACEHOLDER_ROOM};
pub use schedule::{PlacementStage, Schedule, ScheduleEntry};
pub use time::{
    format_minute, parse_minute, Day, DayPattern, Minute, TimeWindow, DAY_CUTOFF, DAY_START,
    EVENING, LUNCH,
};

#[cfg(test)]
pub(crate) use schedule::fixtures;
