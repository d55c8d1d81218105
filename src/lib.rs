//! Weekly class timetabling for the U-Engine ecosystem.
//!
//! Builds a conflict-free (or, failing that, complete and flagged) weekly
//! timetable from course offerings, instructors and rooms.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `CourseRequest`, `JointUnit`, `Room`,
//!   `ScheduleEntry`, `Schedule`, `Conflict`, `TimeWindow`, `DayPattern`
//! - **`catalog`**: The shared set of candidate time slots
//! - **`sessions`**: Units to weekly session durations
//! - **`tracker`**: Interval index of instructor, room and section bookings
//! - **`detection`**: Whole-timetable conflict detection
//! - **`dispatching`**: Priority rules ordering units for placement
//! - **`solver`**: Greedy placement with a fallback ladder and force pass
//! - **`ga`**: Genetic refinement of the finished timetable
//! - **`guard`**: Bookings held outside this solve
//! - **`validation`**: Normalization of raw upstream rows
//! - **`config`**: Solver settings
//!
//! # Example
//!
//! ```
//! use u_timetable::{SolverConfig, TimetableRequest, TimetableSolver};
//! use u_timetable::models::{CourseRequest, Room};
//!
//! let request = TimetableRequest::new(
//!     vec![
//!         CourseRequest::new("I1", "CS101", "BSCS-1A", 3),
//!         CourseRequest::new("I2", "MATH1", "BSCS-1A", 5),
//!     ],
//!     vec![Room::new("R101", "Main"), Room::new("R102", "Main")],
//! );
//! let outcome = TimetableSolver::new(SolverConfig::default()).solve(&request);
//! assert!(outcome.success);
//! assert!(outcome.conflicts.is_clean());
//! ```
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Burke, Elliman & Weare (1994), "A Genetic Algorithm Based University
//!   Timetabling System"

pub mod catalog;
pub mod config;
pub mod detection;
pub mod dispatching;
pub mod error;
pub mod ga;
pub mod guard;
pub mod models;
pub mod sessions;
pub mod solver;
pub mod tracker;
pub mod validation;

pub use catalog::TimeCatalog;
pub use config::SolverConfig;
pub use detection::ConflictDetector;
pub use error::{Result, TimetableError};
pub use solver::{IncrementalScheduler, TimetableOutcome, TimetableRequest, TimetableSolver};
pub use tracker::ResourceTracker;
