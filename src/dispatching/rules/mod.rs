//! Built-in priority rules.
//!
//! # Categories
//!
//! - **Unit flags**: part-time, gap filler, lab, multi-session
//! - **Instructor load**: infeasible flag, sections, courses, units
//!
//! # Score Convention
//! All rules return lower scores for more constrained units. Flag rules
//! return `-1` when the flag is set and `0` otherwise; load rules return the
//! negated count.

use super::{PriorityContext, PriorityRule, RuleScore};
use crate::models::JointUnit;

fn flag(set: bool) -> RuleScore {
    if set {
        -1.0
    } else {
        0.0
    }
}

// ======================== Unit flags ========================

/// Part-time units first: they only fit the evening window.
#[derive(Debug, Clone, Copy)]
pub struct PartTimeFirst;

impl PriorityRule for PartTimeFirst {
    fn name(&self) -> &'static str {
        "PART_TIME"
    }

    fn evaluate(&self, unit: &JointUnit, _context: &PriorityContext) -> RuleScore {
        flag(unit.category().is_part_time())
    }

    fn description(&self) -> &'static str {
        "Part-time instructor"
    }
}

/// Small courses (at most 2 units) that fill gaps between longer blocks.
#[derive(Debug, Clone, Copy)]
pub struct GapFiller;

impl PriorityRule for GapFiller {
    fn name(&self) -> &'static str {
        "GAP_FILLER"
    }

    fn evaluate(&self, unit: &JointUnit, _context: &PriorityContext) -> RuleScore {
        flag(unit.units() <= 2)
    }

    fn description(&self) -> &'static str {
        "Gap filler (units <= 2)"
    }
}

/// Units that need a lab room.
#[derive(Debug, Clone, Copy)]
pub struct LabFirst;

impl PriorityRule for LabFirst {
    fn name(&self) -> &'static str {
        "LAB"
    }

    fn evaluate(&self, unit: &JointUnit, _context: &PriorityContext) -> RuleScore {
        flag(unit.requires_lab())
    }
}

/// Units meeting more than once a week.
#[derive(Debug, Clone, Copy)]
pub struct MultiSession;

impl PriorityRule for MultiSession {
    fn name(&self) -> &'static str {
        "MULTI_SESSION"
    }

    fn evaluate(&self, unit: &JointUnit, _context: &PriorityContext) -> RuleScore {
        flag(unit.sessions().len() > 1)
    }
}

// ======================== Instructor load ========================

/// Instructor holding more requests than the category maximum.
#[derive(Debug, Clone, Copy)]
pub struct InfeasibleInstructor;

impl PriorityRule for InfeasibleInstructor {
    fn name(&self) -> &'static str {
        "INFEASIBLE"
    }

    fn evaluate(&self, unit: &JointUnit, context: &PriorityContext) -> RuleScore {
        flag(context.stats_for(unit).is_infeasible())
    }

    fn description(&self) -> &'static str {
        "Instructor over the category course maximum"
    }
}

/// Instructors teaching many sections.
#[derive(Debug, Clone, Copy)]
pub struct InstructorSections;

impl PriorityRule for InstructorSections {
    fn name(&self) -> &'static str {
        "SECTIONS"
    }

    fn evaluate(&self, unit: &JointUnit, context: &PriorityContext) -> RuleScore {
        -(context.stats_for(unit).sections as f64)
    }
}

/// Instructors holding many course requests.
#[derive(Debug, Clone, Copy)]
pub struct InstructorCourses;

impl PriorityRule for InstructorCourses {
    fn name(&self) -> &'static str {
        "COURSES"
    }

    fn evaluate(&self, unit: &JointUnit, context: &PriorityContext) -> RuleScore {
        -(context.stats_for(unit).courses as f64)
    }
}

/// Instructors carrying many units.
#[derive(Debug, Clone, Copy)]
pub struct InstructorUnits;

impl PriorityRule for InstructorUnits {
    fn name(&self) -> &'static str {
        "UNITS"
    }

    fn evaluate(&self, unit: &JointUnit, context: &PriorityContext) -> RuleScore {
        -(context.stats_for(unit).units as f64)
    }
}
