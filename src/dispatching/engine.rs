//! Rule engine for multi-criteria priority ordering.
//!
//! Sums weighted rule scores per unit and sorts ascending. Units whose
//! totals tie are ordered by id, so the order never depends on input order.
//!
//! # Reference
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use std::cmp::Ordering;
use std::sync::Arc;

use super::{rules, PriorityContext, PriorityRule};
use crate::config::PriorityWeights;
use crate::models::JointUnit;

#[derive(Clone)]
struct WeightedRule {
    rule: Arc<dyn PriorityRule>,
    weight: f64,
}

/// A composable rule engine for unit prioritization.
///
/// # Example
/// ```
/// use u_timetable::dispatching::{rules, RuleEngine};
///
/// let engine = RuleEngine::new()
///     .with_weighted_rule(rules::PartTimeFirst, 1000.0)
///     .with_weighted_rule(rules::LabFirst, 200.0);
/// ```
#[derive(Clone)]
pub struct RuleEngine {
    rules: Vec<WeightedRule>,
    epsilon: f64,
}

impl RuleEngine {
    /// Creates an empty rule engine.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            epsilon: 1e-9,
        }
    }

    /// The weighted most-constrained-first ordering used by the solver.
    pub fn mrv(weights: &PriorityWeights) -> Self {
        Self::new()
            .with_weighted_rule(rules::PartTimeFirst, weights.part_time)
            .with_weighted_rule(rules::GapFiller, weights.gap_filler)
            .with_weighted_rule(rules::InfeasibleInstructor, weights.infeasible_instructor)
            .with_weighted_rule(rules::LabFirst, weights.lab)
            .with_weighted_rule(rules::MultiSession, weights.multi_session)
            .with_weighted_rule(rules::InstructorSections, weights.instructor_sections)
            .with_weighted_rule(rules::InstructorCourses, weights.instructor_courses)
            .with_weighted_rule(rules::InstructorUnits, weights.instructor_units)
    }

    /// Adds a weighted rule.
    pub fn with_weighted_rule<R: PriorityRule + 'static>(mut self, rule: R, weight: f64) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight,
        });
        self
    }

    /// Sorts units by priority (highest priority first).
    ///
    /// Returns indices into the original slice.
    pub fn sort_indices(&self, units: &[JointUnit], context: &PriorityContext) -> Vec<usize> {
        if units.is_empty() {
            return Vec::new();
        }

        let scores: Vec<f64> = units
            .iter()
            .map(|u| self.weighted_score(u, context))
            .collect();
        let mut indices: Vec<usize> = (0..units.len()).collect();
        indices.sort_by(|&a, &b| {
            if (scores[a] - scores[b]).abs() > self.epsilon {
                scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal)
            } else {
                units[a].id.cmp(&units[b].id)
            }
        });
        indices
    }

    fn weighted_score(&self, unit: &JointUnit, context: &PriorityContext) -> f64 {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(unit, context) * wr.weight)
            .sum()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field(
                "rules",
                &self
                    .rules
                    .iter()
                    .map(|r| format!("{}(w={})", r.rule.name(), r.weight))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseRequest, EmploymentCategory};

    fn unit(id: &str, instructor: &str, units: u32) -> JointUnit {
        JointUnit::new(
            id,
            vec![CourseRequest::new(instructor, id, format!("{id}-S"), units)],
        )
    }

    #[test]
    fn test_part_time_first() {
        let mut pt = unit("B", "I2", 3);
        pt.members[0].employment_category = EmploymentCategory::PartTime;
        let units = vec![unit("A", "I1", 3), pt];
        let ctx = PriorityContext::from_units(&units);
        let engine = RuleEngine::new().with_weighted_rule(rules::PartTimeFirst, 1.0);

        let indices = engine.sort_indices(&units, &ctx);
        assert_eq!(units[indices[0]].id, "B");
    }

    #[test]
    fn test_mrv_weighted_order() {
        let mut lab = unit("LAB", "I1", 3);
        lab.members[0].requires_lab = true;
        let gap = unit("GAP", "I2", 2);
        let plain = unit("PLAIN", "I3", 3);
        let units = vec![plain, lab, gap];
        let ctx = PriorityContext::from_units(&units);
        let engine = RuleEngine::mrv(&PriorityWeights::default());

        let order: Vec<&str> = engine
            .sort_indices(&units, &ctx)
            .into_iter()
            .map(|i| units[i].id.as_str())
            .collect();
        // gap filler (500) beats lab (200 + 100 multi-session) beats plain (100)
        assert_eq!(order, vec!["GAP", "LAB", "PLAIN"]);
    }

    #[test]
    fn test_ties_break_by_id() {
        let units = vec![unit("B", "I1", 3), unit("A", "I2", 3)];
        let ctx = PriorityContext::from_units(&units);
        let engine = RuleEngine::new().with_weighted_rule(rules::LabFirst, 200.0);

        let indices = engine.sort_indices(&units, &ctx);
        assert_eq!(units[indices[0]].id, "A");
    }

    #[test]
    fn test_weights_combine() {
        // Neither is lab; the busier instructor wins on course count.
        let units = vec![
            unit("X", "I1", 3),
            unit("Y", "I2", 3),
            unit("Y2", "I2", 3),
        ];
        let ctx = PriorityContext::from_units(&units);
        let engine = RuleEngine::new()
            .with_weighted_rule(rules::LabFirst, 200.0)
            .with_weighted_rule(rules::InstructorCourses, 10.0);

        let indices = engine.sort_indices(&units, &ctx);
        assert_eq!(units[indices[0]].id, "Y");
        assert_eq!(units[indices[2]].id, "X");
    }

    #[test]
    fn test_empty_units() {
        let ctx = PriorityContext::default();
        let engine = RuleEngine::mrv(&PriorityWeights::default());
        assert!(engine.sort_indices(&[], &ctx).is_empty());
    }
}
