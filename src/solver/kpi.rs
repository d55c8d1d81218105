//! Timetable quality metrics (KPIs).
//!
//! Computes placement and utilization indicators from a finished timetable
//! and the units it was built from.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Scheduling Rate | Fully placed courses / total courses |
//! | Unscheduled | Courses with fewer entries than sessions |
//! | Room Utilization | Booked minutes / weekly teaching minutes |
//! | Stage Counts | Entries per placement stage |
//! | Emergency Count | Entries flagged as emergency placements |
//!
//! # Reference
//! Schaerf (1999), "A Survey of Automated Timetabling", Sec. 2 (evaluation)

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::SuccessThresholds;
use crate::models::{
    ConflictReport, JointUnit, PlacementStage, Schedule, DAY_CUTOFF, DAY_START, LUNCH,
    PLACEHOLDER_ROOM,
};

/// Bookable minutes per room per week: Mon–Sat, 07:00–20:45 minus lunch.
pub const WEEKLY_ROOM_MINUTES: u32 = 6 * (DAY_CUTOFF - DAY_START - (LUNCH.end - LUNCH.start));

/// Timetable performance indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleKpi {
    /// Course requests in the input (after block expansion).
    pub total_courses: usize,
    /// Courses with every session placed.
    pub placed_courses: usize,
    /// `placed_courses / total_courses`, 1.0 when there is nothing to place.
    pub scheduling_rate: f64,
    /// `total_courses - placed_courses`.
    pub unscheduled_count: usize,
    /// Per-room utilization (0.0..1.0), placeholder room excluded.
    pub room_utilization: HashMap<String, f64>,
    /// Mean of `room_utilization`.
    pub avg_room_utilization: f64,
    /// Entries per placement stage.
    pub stage_counts: BTreeMap<PlacementStage, usize>,
    /// Entries flagged as emergency placements.
    pub emergency_count: usize,
    /// Conflicts remaining in the timetable.
    pub total_conflicts: usize,
}

impl ScheduleKpi {
    /// Computes KPIs from a timetable, its units and its conflict report.
    pub fn calculate(schedule: &Schedule, units: &[JointUnit], conflicts: &ConflictReport) -> Self {
        let counts = schedule.placed_counts();
        let mut total_courses = 0;
        let mut placed_courses = 0;

        for unit in units {
            let required = unit.sessions().len();
            for member in &unit.members {
                total_courses += 1;
                if counts.get(member.key.as_str()).copied().unwrap_or(0) >= required {
                    placed_courses += 1;
                }
            }
        }

        let room_utilization: HashMap<String, f64> = schedule
            .room_minutes()
            .into_iter()
            .filter(|(room, _)| *room != PLACEHOLDER_ROOM)
            .map(|(room, minutes)| {
                (
                    room.to_string(),
                    minutes as f64 / WEEKLY_ROOM_MINUTES as f64,
                )
            })
            .collect();
        let avg_room_utilization = if room_utilization.is_empty() {
            0.0
        } else {
            room_utilization.values().sum::<f64>() / room_utilization.len() as f64
        };

        let scheduling_rate = if total_courses == 0 {
            1.0
        } else {
            placed_courses as f64 / total_courses as f64
        };

        Self {
            total_courses,
            placed_courses,
            scheduling_rate,
            unscheduled_count: total_courses - placed_courses,
            room_utilization,
            avg_room_utilization,
            stage_counts: schedule.stage_counts(),
            emergency_count: schedule.emergency_count(),
            total_conflicts: conflicts.total,
        }
    }

    /// Whether the timetable counts as a success.
    pub fn meets_thresholds(&self, thresholds: &SuccessThresholds) -> bool {
        self.scheduling_rate >= thresholds.min_rate
            && self.total_conflicts < thresholds.max_conflicts
    }
}
