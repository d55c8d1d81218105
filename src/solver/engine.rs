//! Timetable solver.
//!
//! # Pipeline
//! 1. Room checks, block expansion, joint-unit detection
//! 2. Overload rebalancing
//! 3. Guard preload (when a context id and guard are set)
//! 4. Most-constrained-first ordering
//! 5. Fallback ladder: primary, room-relaxed, same-time-relaxed, emergency
//! 6. Force pass
//! 7. Conflict detection, optional GA refinement, KPIs
//!
//! Any error or panic inside the pipeline becomes an unsuccessful
//! [`TimetableOutcome`] carrying the partial timetable.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::deadline::Deadline;
use super::kpi::ScheduleKpi;
use super::preprocess::{detect_joint_units, expand_blocks};
use super::rebalance::{rebalance, RebalanceReport};
use super::rooms::RoomSelector;
use super::stages::{force_pass, run_stage, PendingUnit, PlacementContext};
use crate::catalog::TimeCatalog;
use crate::config::SolverConfig;
use crate::detection::ConflictDetector;
use crate::dispatching::{PriorityContext, RuleEngine};
use crate::error::TimetableError;
use crate::ga::{self, RefinementSummary};
use crate::guard::{preload, BookingGuard};
use crate::models::{
    ConflictReport, CourseRecord, CourseRequest, PlacementStage, Room, RoomRecord, Schedule,
    ScheduleEntry,
};
use crate::tracker::ResourceTracker;
use crate::validation::{check_rooms, normalize_courses, normalize_rooms, ValidationIssue};

const GREEDY: &str = "mrv-greedy";
const GREEDY_GENETIC: &str = "mrv-greedy+genetic";

/// Input of one solve.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableRequest {
    pub courses: Vec<CourseRequest>,
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub department: String,
    /// Key under which the booking guard holds existing bookings.
    #[serde(default)]
    pub context_id: Option<String>,
    /// Issues found while normalizing raw records.
    #[serde(skip)]
    pub issues: Vec<ValidationIssue>,
}

impl TimetableRequest {
    pub fn new(courses: Vec<CourseRequest>, rooms: Vec<Room>) -> Self {
        Self {
            courses,
            rooms,
            ..Self::default()
        }
    }

    /// Normalizes raw rows into a request.
    pub fn from_records(courses: &[CourseRecord], rooms: &[RoomRecord], department: &str) -> Self {
        let courses = normalize_courses(courses, department);
        let rooms = normalize_rooms(rooms);
        let mut issues = courses.issues;
        issues.extend(rooms.issues);
        Self {
            courses: courses.items,
            rooms: rooms.items,
            department: department.to_string(),
            context_id: None,
            issues,
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }

    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }
}

/// Everything the solver learned along the way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub kpi: Option<ScheduleKpi>,
    pub rebalance: RebalanceReport,
    pub issues: Vec<ValidationIssue>,
    /// Guard bookings reserved before placement.
    pub preloaded_bookings: usize,
    /// Sessions placed by the force pass.
    pub forced_sessions: usize,
    /// Present when the GA ran.
    pub refinement: Option<RefinementSummary>,
    pub elapsed_ms: u64,
}

/// Result of one solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableOutcome {
    pub success: bool,
    pub message: String,
    pub schedules: Vec<ScheduleEntry>,
    pub conflicts: ConflictReport,
    pub unscheduled_count: usize,
    pub algorithm: String,
    pub diagnostics: Diagnostics,
}

/// Greedy timetable solver with a fallback ladder and GA refinement.
///
/// # Example
/// ```
/// use u_timetable::config::SolverConfig;
/// use u_timetable::models::{CourseRequest, Room};
/// use u_timetable::solver::{TimetableRequest, TimetableSolver};
///
/// let request = TimetableRequest::new(
///     vec![CourseRequest::new("I1", "CS101", "BSCS-1A", 3)],
///     vec![Room::new("R101", "Main")],
/// );
/// let outcome = TimetableSolver::new(SolverConfig::default()).solve(&request);
/// assert!(outcome.success);
/// assert_eq!(outcome.schedules.len(), 2);
/// ```
#[derive(Clone)]
pub struct TimetableSolver {
    config: SolverConfig,
    catalog: Arc<TimeCatalog>,
    guard: Option<Arc<dyn BookingGuard>>,
}

impl TimetableSolver {
    /// Creates a solver over the shared time catalog.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            catalog: TimeCatalog::shared(),
            guard: None,
        }
    }

    /// Attaches a booking guard.
    pub fn with_guard(mut self, guard: Arc<dyn BookingGuard>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Uses a specific catalog instead of the shared one.
    pub fn with_catalog(mut self, catalog: Arc<TimeCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solves with a fresh tracker.
    pub fn solve(&self, request: &TimetableRequest) -> TimetableOutcome {
        let mut tracker = ResourceTracker::new();
        self.solve_with_tracker(request, &mut tracker)
    }

    /// Solves on top of the reservations already in `tracker`.
    ///
    /// Never panics and never returns an error: faults become an
    /// unsuccessful outcome with whatever was placed so far.
    pub fn solve_with_tracker(
        &self,
        request: &TimetableRequest,
        tracker: &mut ResourceTracker,
    ) -> TimetableOutcome {
        let started = Instant::now();
        let mut partial = Schedule::new();
        let mut diagnostics = Diagnostics {
            issues: request.issues.clone(),
            ..Diagnostics::default()
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run(request, tracker, &mut partial, &mut diagnostics)
        }));
        let error = match result {
            Ok(Ok(mut outcome)) => {
                outcome.diagnostics.elapsed_ms = started.elapsed().as_millis() as u64;
                return outcome;
            }
            Ok(Err(e)) => e,
            Err(payload) => TimetableError::Internal(panic_message(payload.as_ref())),
        };

        log::error!("solve failed: {error}");
        diagnostics.elapsed_ms = started.elapsed().as_millis() as u64;
        let placed: HashSet<&str> = partial.entries.iter().map(|e| e.course_key.as_str()).collect();
        let unscheduled_count = request.courses.len().saturating_sub(placed.len());
        TimetableOutcome {
            success: false,
            message: error.to_string(),
            conflicts: ConflictDetector::detect(&partial.entries),
            schedules: partial.entries,
            unscheduled_count,
            algorithm: GREEDY.to_string(),
            diagnostics,
        }
    }

    fn run(
        &self,
        request: &TimetableRequest,
        tracker: &mut ResourceTracker,
        schedule: &mut Schedule,
        diagnostics: &mut Diagnostics,
    ) -> Result<TimetableOutcome, TimetableError> {
        self.config.validate()?;
        let deadline = Deadline::from_seconds(self.config.time_limit_seconds);
        log::info!(
            "solving {} course requests with {} rooms",
            request.courses.len(),
            request.rooms.len()
        );

        diagnostics
            .issues
            .extend(check_rooms(&request.courses, &request.rooms));
        let (requests, issues) = expand_blocks(&request.courses);
        diagnostics.issues.extend(issues);
        let mut units = detect_joint_units(requests);
        diagnostics.rebalance = rebalance(&mut units, &self.config.load_ceilings);

        let mut fixed = Vec::new();
        if let (Some(guard), Some(context_id)) = (&self.guard, &request.context_id) {
            let bookings = guard
                .bookings(context_id)
                .map_err(|e| TimetableError::pipeline("guard", e.to_string()))?;
            let preloaded = preload(tracker, &bookings, &request.rooms);
            diagnostics.preloaded_bookings = preloaded.reserved;
            diagnostics.issues.extend(preloaded.issues);
            fixed = preloaded.entries;
        }

        let context = PriorityContext::from_units(&units);
        let order = RuleEngine::mrv(&self.config.priority_weights).sort_indices(&units, &context);

        let selector = RoomSelector::new(
            request.rooms.clone(),
            &self.config.room_distribution,
            &request.department,
            self.config.room_top_k,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        {
            let mut ctx = PlacementContext {
                units: &units,
                catalog: self.catalog.as_ref(),
                rooms: &selector,
                tracker: &mut *tracker,
                schedule: &mut *schedule,
                rng: &mut rng,
                deadline,
            };
            let mut pending: Vec<PendingUnit> = order
                .iter()
                .map(|&i| PendingUnit::new(i, units[i].sessions()))
                .collect();
            for stage in PlacementStage::LADDER {
                if pending.is_empty() {
                    break;
                }
                pending = run_stage(stage, pending, &mut ctx).remaining;
            }
            diagnostics.forced_sessions = force_pass(&mut ctx, &order);
        }

        let mut conflicts = ConflictDetector::detect(&schedule.entries);
        let mut algorithm = GREEDY;
        if self.config.enable_genetic && !conflicts.is_clean() {
            if deadline.expired() {
                log::info!("time budget spent, skipping refinement");
            } else {
                let (refined, summary) = ga::refine(
                    &units,
                    &request.rooms,
                    &self.catalog,
                    &schedule.entries,
                    &fixed,
                    &self.config,
                    deadline,
                );
                if let Some(entries) = refined {
                    schedule.entries = entries;
                    conflicts = ConflictDetector::detect(&schedule.entries);
                    algorithm = GREEDY_GENETIC;
                }
                diagnostics.refinement = Some(summary);
            }
        }

        let kpi = ScheduleKpi::calculate(schedule, &units, &conflicts);
        let success = kpi.meets_thresholds(&self.config.success);
        let message = format!(
            "Scheduled {}/{} courses with {} conflicts",
            kpi.placed_courses, kpi.total_courses, conflicts.total
        );
        log::info!("{message}");

        let unscheduled_count = kpi.unscheduled_count;
        diagnostics.kpi = Some(kpi);
        Ok(TimetableOutcome {
            success,
            message,
            schedules: std::mem::take(&mut schedule.entries),
            conflicts,
            unscheduled_count,
            algorithm: algorithm.to_string(),
            diagnostics: std::mem::take(diagnostics),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "solver panicked".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeneticConfig, LoadCeilings};
    use crate::guard::{GuardBooking, InMemoryGuard};
    use crate::models::{Day, DayPattern, EmploymentCategory, TimeWindow, DAY_CUTOFF, EVENING};
    use std::collections::HashMap;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn rooms(n: usize) -> Vec<Room> {
        (1..=n).map(|i| Room::new(format!("R{i}"), "Main")).collect()
    }

    fn sample_courses() -> Vec<CourseRequest> {
        vec![
            CourseRequest::new("I1", "CS101", "BSCS-1", 3).with_block("A & B"),
            CourseRequest::new("I1", "CS102", "BSCS-1A", 2),
            CourseRequest::new("I2", "MATH1", "BSCS-1A", 5),
            CourseRequest::new("I2", "MATH2", "BSCS-2A", 6).with_year_level("2"),
            CourseRequest::new("I3", "PHYS1", "BSCS-1A", 4).with_lab(true),
            CourseRequest::new("P1", "ENG1", "BSCS-1A", 5).with_category(EmploymentCategory::PartTime),
            CourseRequest::new("I4", "HIST1", "BSCS-2A", 1).with_year_level("2"),
            CourseRequest::new("I4", "PE1", "BSCS-1B", 10),
        ]
    }

    fn sample_request() -> TimetableRequest {
        let mut rooms = rooms(3);
        rooms.push(Room::new("LAB1", "Main").with_lab(true));
        TimetableRequest::new(sample_courses(), rooms).with_department("CS")
    }

    fn sessions_by_key(outcome: &TimetableOutcome) -> HashMap<&str, Vec<&ScheduleEntry>> {
        let mut map: HashMap<&str, Vec<&ScheduleEntry>> = HashMap::new();
        for e in &outcome.schedules {
            map.entry(e.course_key.as_str()).or_default().push(e);
        }
        map
    }

    #[test]
    fn test_every_course_fully_placed() {
        init_logger();
        let request = sample_request();
        let outcome = TimetableSolver::new(SolverConfig::default()).solve(&request);
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.unscheduled_count, 0);

        let (expanded, _) = expand_blocks(&request.courses);
        let by_key = sessions_by_key(&outcome);
        assert_eq!(by_key.len(), expanded.len());
        for req in &expanded {
            let entries = &by_key[req.key.as_str()];
            assert_eq!(entries.len(), req.sessions().len(), "{}", req.key);
            let days: DayPattern = entries.iter().flat_map(|e| e.days.iter()).collect();
            assert_eq!(days.len(), entries.len(), "{} repeats a day", req.key);
        }
        let kpi = outcome.diagnostics.kpi.as_ref().unwrap();
        assert!((kpi.scheduling_rate - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_lunch_and_cutoff_respected() {
        let outcome = TimetableSolver::new(SolverConfig::default()).solve(&sample_request());
        for e in &outcome.schedules {
            assert!(!e.window.hits_lunch(), "{e:?}");
            assert!(e.window.end <= DAY_CUTOFF);
        }
        assert_eq!(outcome.conflicts.by_type.lunch, 0);
    }

    #[test]
    fn test_part_time_five_units_in_evening() {
        let request = TimetableRequest::new(
            vec![CourseRequest::new("P1", "ENG1", "S1", 5).with_category(EmploymentCategory::PartTime)],
            rooms(1),
        );
        let outcome = TimetableSolver::new(SolverConfig::default()).solve(&request);
        assert_eq!(outcome.schedules.len(), 2);
        for e in &outcome.schedules {
            assert!((e.duration_hours - 2.5).abs() < 1e-10);
            assert!(EVENING.covers(&e.window), "{e:?}");
        }
        assert_ne!(outcome.schedules[0].days, outcome.schedules[1].days);
    }

    #[test]
    fn test_primary_sessions_share_start() {
        let outcome = TimetableSolver::new(SolverConfig::default()).solve(&sample_request());
        for (key, entries) in sessions_by_key(&outcome) {
            if entries.iter().all(|e| e.stage == PlacementStage::Primary) {
                let start = entries[0].window.start;
                assert!(entries.iter().all(|e| e.window.start == start), "{key}");
            }
        }
    }

    #[test]
    fn test_critical_pair_at_ceiling_stays_together() {
        let courses = vec![
            CourseRequest::new("I1", "CS1", "BSCS-1", 6).with_block("A & B"),
            CourseRequest::new("I1", "CS2", "BSCS-1", 6).with_block("A/B"),
            CourseRequest::new("I2", "MATH1", "BSCS-2A", 3).with_year_level("2"),
        ];
        let request = TimetableRequest::new(courses, rooms(2));
        let outcome = TimetableSolver::new(SolverConfig::default()).solve(&request);
        assert!(outcome.diagnostics.rebalance.moves.is_empty());

        let by_key = sessions_by_key(&outcome);
        for subject in ["CS1", "CS2"] {
            let a = &by_key[format!("I1|{subject}|1|A").as_str()];
            let b = &by_key[format!("I1|{subject}|1|B").as_str()];
            assert_eq!(a.len(), 2);
            assert!(a.iter().chain(b.iter()).all(|e| e.instructor_id == "I1"));
            let mut ma: Vec<_> = a.iter().map(|e| (e.days, e.window, e.room_id.clone())).collect();
            let mut mb: Vec<_> = b.iter().map(|e| (e.days, e.window, e.room_id.clone())).collect();
            ma.sort_by_key(|m| (m.1, m.2.clone()));
            mb.sort_by_key(|m| (m.1, m.2.clone()));
            assert_eq!(ma, mb);
        }
    }

    #[test]
    fn test_overloaded_instructor_rebalanced() {
        let courses = vec![
            CourseRequest::new("I1", "A", "S1", 10),
            CourseRequest::new("I1", "B", "S2", 10),
            CourseRequest::new("I1", "C", "S3", 10),
            CourseRequest::new("I2", "D", "S4", 3),
        ];
        let request = TimetableRequest::new(courses, rooms(2));
        let config = SolverConfig::default().with_load_ceilings(LoadCeilings::default());
        let outcome = TimetableSolver::new(config).solve(&request);
        let moves = &outcome.diagnostics.rebalance.moves;
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].to, "I2");
        let moved_key = format!("{}|A", moves[0].unit_id);
        assert!(outcome
            .schedules
            .iter()
            .filter(|e| e.course_key == moved_key)
            .all(|e| e.instructor_id == "I2"));
    }

    #[test]
    fn test_empty_input_is_success() {
        let outcome =
            TimetableSolver::new(SolverConfig::default()).solve(&TimetableRequest::default());
        assert!(outcome.success);
        assert!(outcome.schedules.is_empty());
        assert_eq!(outcome.unscheduled_count, 0);
        assert!(outcome.conflicts.is_clean());
        let kpi = outcome.diagnostics.kpi.unwrap();
        assert!((kpi.scheduling_rate - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_huge_time_limit_runs_unbounded() {
        let config = SolverConfig::default().with_time_limit_seconds(1e30);
        let outcome = TimetableSolver::new(config).solve(&sample_request());
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.unscheduled_count, 0);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let request = sample_request();
        let a = TimetableSolver::new(SolverConfig::default()).solve(&request);
        let b = TimetableSolver::new(SolverConfig::default()).solve(&request);
        assert_eq!(a.schedules, b.schedules);
    }

    #[test]
    fn test_guard_bookings_are_avoided() {
        let busy = GuardBooking {
            course_key: "EXT|X|1|A".into(),
            instructor_id: "EXT".into(),
            subject_code: "X".into(),
            room_id: "R1".into(),
            section_ids: Vec::new(),
            days: Day::ALL.into_iter().collect(),
            window: TimeWindow::new(0, 1440),
        };
        let guard = InMemoryGuard::new().with_booking("term-1", busy);
        let request = TimetableRequest::new(
            vec![
                CourseRequest::new("I1", "CS1", "S1", 3),
                CourseRequest::new("I2", "CS2", "S2", 2),
            ],
            rooms(2),
        )
        .with_context_id("term-1");
        let outcome = TimetableSolver::new(SolverConfig::default())
            .with_guard(Arc::new(guard))
            .solve(&request);

        assert_eq!(outcome.diagnostics.preloaded_bookings, 1);
        assert_eq!(outcome.schedules.len(), 3);
        assert!(outcome.schedules.iter().all(|e| e.room_id == "R2"));
    }

    #[test]
    fn test_emergency_when_rooms_run_out() {
        // 24 five-hour sessions, one room with two such openings per day.
        let courses: Vec<CourseRequest> = (0..12)
            .map(|i| CourseRequest::new(format!("I{i}"), format!("CS{i}"), format!("S{i}"), 10))
            .collect();
        let request = TimetableRequest::new(courses, rooms(1));
        let config = SolverConfig::default().with_genetic(false);
        let outcome = TimetableSolver::new(config).solve(&request);
        assert_eq!(outcome.unscheduled_count, 0);
        assert_eq!(outcome.schedules.len(), 24);
        assert!(outcome.schedules.iter().any(|e| e.emergency_scheduled));
        assert!(outcome.conflicts.by_type.room > 0);
        assert_eq!(outcome.algorithm, GREEDY);
    }

    #[test]
    fn test_invalid_config_becomes_failed_outcome() {
        let config = SolverConfig::default()
            .with_genetic_config(GeneticConfig::default().with_population_size(0));
        let outcome = TimetableSolver::new(config).solve(&sample_request());
        assert!(!outcome.success);
        assert!(outcome.message.contains("Invalid configuration"));
        assert!(outcome.schedules.is_empty());
    }

    struct FailingGuard;

    impl BookingGuard for FailingGuard {
        fn bookings(&self, _context_id: &str) -> Result<Vec<GuardBooking>, TimetableError> {
            Err(TimetableError::Guard("connection refused".into()))
        }
    }

    struct PanickingGuard;

    impl BookingGuard for PanickingGuard {
        fn bookings(&self, _context_id: &str) -> Result<Vec<GuardBooking>, TimetableError> {
            panic!("guard exploded")
        }
    }

    #[test]
    fn test_guard_error_becomes_failed_outcome() {
        let request = sample_request().with_context_id("term-1");
        let outcome = TimetableSolver::new(SolverConfig::default())
            .with_guard(Arc::new(FailingGuard))
            .solve(&request);
        assert!(!outcome.success);
        assert!(outcome.message.contains("connection refused"));
        assert_eq!(outcome.unscheduled_count, request.courses.len());
    }

    #[test]
    fn test_panic_becomes_failed_outcome() {
        let request = sample_request().with_context_id("term-1");
        let outcome = TimetableSolver::new(SolverConfig::default())
            .with_guard(Arc::new(PanickingGuard))
            .solve(&request);
        assert!(!outcome.success);
        assert!(outcome.message.contains("guard exploded"));
    }

    #[test]
    fn test_from_records_carries_issues() {
        let records = vec![
            CourseRecord {
                instructor_id: Some("I1".into()),
                subject_code: Some("CS1".into()),
                section_id: Some("S1".into()),
                year_level: Some("1".into()),
                block: Some("A".into()),
                units: Some(3),
                ..CourseRecord::default()
            },
            CourseRecord {
                subject_code: Some("CS2".into()),
                units: Some(2),
                ..CourseRecord::default()
            },
        ];
        let room_records = vec![RoomRecord {
            id: Some("R1".into()),
            ..RoomRecord::default()
        }];
        let request = TimetableRequest::from_records(&records, &room_records, "CS");
        assert_eq!(request.courses.len(), 2);
        assert!(!request.issues.is_empty());

        let outcome = TimetableSolver::new(SolverConfig::default()).solve(&request);
        assert!(outcome.diagnostics.issues.len() >= request.issues.len());
        assert_eq!(outcome.unscheduled_count, 0);
    }

    #[test]
    fn test_outcome_serializes_camel_case() {
        let outcome = TimetableSolver::new(SolverConfig::default()).solve(&sample_request());
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("unscheduledCount").is_some());
        assert!(json["schedules"][0].get("courseKey").is_some());
        assert!(json["diagnostics"].get("forcedSessions").is_some());
    }
}
