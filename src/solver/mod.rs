//! Timetable construction.
//!
//! Turns course requests and rooms into a weekly timetable.
//!
//! # Algorithm
//!
//! [`TimetableSolver`] is greedy and most-constrained-first. Each unit walks
//! a fallback ladder (primary, room-relaxed, same-time-relaxed, emergency);
//! a force pass then places whatever is left, so every requested session
//! appears in the output. Remaining conflicts are handed to the GA in
//! [`crate::ga`].
//!
//! # KPI
//!
//! [`ScheduleKpi`] reports the scheduling rate, room utilisation and
//! per-stage placement counts.
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Burke & Petrovic (2002), "Recent research directions in automated
//!   timetabling"

mod deadline;
mod engine;
mod incremental;
pub mod kpi;
pub mod preprocess;
pub mod ranking;
pub mod rebalance;
pub mod rooms;
mod stages;

pub use deadline::Deadline;
pub use engine::{Diagnostics, TimetableOutcome, TimetableRequest, TimetableSolver};
pub use incremental::IncrementalScheduler;
pub use kpi::ScheduleKpi;
pub use rebalance::{overloaded_instructors, rebalance, RebalanceMove, RebalanceReport};
pub use rooms::RoomSelector;

pub(crate) use stages::{fallback_slot, unit_entries};
