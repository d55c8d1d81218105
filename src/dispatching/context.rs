//! Instructor-level context for priority rule evaluation.

use std::collections::{HashMap, HashSet};

use crate::models::{EmploymentCategory, JointUnit};

/// Aggregates for one instructor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructorStats {
    /// Distinct sections taught.
    pub sections: usize,
    /// Course requests held.
    pub courses: usize,
    /// Total units carried.
    pub units: u32,
    /// Part-time if any request is.
    pub category: EmploymentCategory,
}

impl InstructorStats {
    /// Whether the instructor holds more requests than the category allows.
    pub fn is_infeasible(&self) -> bool {
        self.courses > self.category.max_courses()
    }
}

/// Context passed to priority rules.
#[derive(Debug, Clone, Default)]
pub struct PriorityContext {
    /// Stats per instructor id.
    pub instructors: HashMap<String, InstructorStats>,
}

impl PriorityContext {
    /// Computes instructor stats from the units to be placed.
    pub fn from_units(units: &[JointUnit]) -> Self {
        let mut instructors: HashMap<String, InstructorStats> = HashMap::new();
        let mut sections: HashMap<&str, HashSet<&str>> = HashMap::new();

        for unit in units {
            let stats = instructors
                .entry(unit.instructor_id().to_string())
                .or_default();
            stats.courses += unit.members.len();
            stats.units += unit.load_units();
            if unit.category().is_part_time() {
                stats.category = EmploymentCategory::PartTime;
            }
            let set = sections.entry(unit.instructor_id()).or_default();
            for m in &unit.members {
                set.insert(&m.section_id);
            }
        }
        for (id, set) in sections {
            if let Some(stats) = instructors.get_mut(id) {
                stats.sections = set.len();
            }
        }

        Self { instructors }
    }

    /// Stats of a unit's instructor.
    pub fn stats_for(&self, unit: &JointUnit) -> InstructorStats {
        self.instructors
            .get(unit.instructor_id())
            .cloned()
            .unwrap_or_default()
    }
}
