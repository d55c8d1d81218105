//! Overload rebalancing.
//!
//! Instructors above their unit ceiling hand whole joint units to
//! full-time instructors with spare capacity.
//!
//! # Algorithm
//! 1. Total load per instructor (sum of member units). An instructor is
//!    part-time when any of their units is.
//! 2. For each overloaded instructor (by id), move non-critical units,
//!    largest first, to the least-loaded full-time instructor that stays
//!    within the ceiling after the move.
//! 3. Critical pairs (blocks exactly A and B) move only while the remaining
//!    overage exceeds the critical-pair tolerance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::LoadCeilings;
use crate::models::{EmploymentCategory, JointUnit};

/// One unit handed from one instructor to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceMove {
    pub unit_id: String,
    pub from: String,
    pub to: String,
    pub units: u32,
    pub critical_pair: bool,
}

/// Result of a rebalancing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceReport {
    pub moves: Vec<RebalanceMove>,
    /// Instructors still above their ceiling afterwards.
    pub still_overloaded: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Load {
    units: u32,
    category: EmploymentCategory,
}

fn loads(units: &[JointUnit]) -> BTreeMap<String, Load> {
    let mut map: BTreeMap<String, Load> = BTreeMap::new();
    for unit in units {
        let load = map.entry(unit.instructor_id().to_string()).or_default();
        load.units += unit.load_units();
        if unit.category().is_part_time() {
            load.category = EmploymentCategory::PartTime;
        }
    }
    map
}

/// Instructors whose total load exceeds their category ceiling.
pub fn overloaded_instructors(units: &[JointUnit], ceilings: &LoadCeilings) -> Vec<String> {
    loads(units)
        .into_iter()
        .filter(|(_, l)| l.units > ceilings.for_category(l.category))
        .map(|(id, _)| id)
        .collect()
}

/// Moves units off overloaded instructors in place.
pub fn rebalance(units: &mut [JointUnit], ceilings: &LoadCeilings) -> RebalanceReport {
    let mut loads = loads(units);
    let mut report = RebalanceReport::default();

    let overloaded: Vec<String> = loads
        .iter()
        .filter(|(_, l)| l.units > ceilings.for_category(l.category))
        .map(|(id, _)| id.clone())
        .collect();

    for instructor in overloaded {
        let ceiling = loads
            .get(&instructor)
            .map(|l| ceilings.for_category(l.category))
            .unwrap_or(ceilings.full_time_units);

        for critical in [false, true] {
            let mut candidates: Vec<usize> = units
                .iter()
                .enumerate()
                .filter(|(_, u)| u.instructor_id() == instructor && u.is_critical_pair() == critical)
                .map(|(i, _)| i)
                .collect();
            candidates.sort_by(|&a, &b| {
                units[b]
                    .load_units()
                    .cmp(&units[a].load_units())
                    .then_with(|| units[a].id.cmp(&units[b].id))
            });

            for idx in candidates {
                let current = loads.get(&instructor).map(|l| l.units).unwrap_or(0);
                let allowed = if critical {
                    ceiling + ceilings.critical_pair_tolerance
                } else {
                    ceiling
                };
                if current <= allowed {
                    break;
                }
                let size = units[idx].load_units();
                let Some(target) = pick_target(&loads, &instructor, size, ceilings) else {
                    continue;
                };

                units[idx].reassign(&target, EmploymentCategory::FullTime);
                if let Some(l) = loads.get_mut(&instructor) {
                    l.units -= size;
                }
                if let Some(l) = loads.get_mut(&target) {
                    l.units += size;
                }
                log::info!(
                    "rebalance: moved {} ({} units) from {} to {}",
                    units[idx].id,
                    size,
                    instructor,
                    target
                );
                report.moves.push(RebalanceMove {
                    unit_id: units[idx].id.clone(),
                    from: instructor.clone(),
                    to: target,
                    units: size,
                    critical_pair: critical,
                });
            }
        }

        if loads.get(&instructor).is_some_and(|l| l.units > ceiling) {
            report.still_overloaded.push(instructor);
        }
    }

    if !report.still_overloaded.is_empty() {
        log::warn!(
            "instructors still over ceiling after rebalancing: {:?}",
            report.still_overloaded
        );
    }
    report
}

/// Least-loaded full-time instructor that can absorb `size` units.
fn pick_target(
    loads: &BTreeMap<String, Load>,
    from: &str,
    size: u32,
    ceilings: &LoadCeilings,
) -> Option<String> {
    loads
        .iter()
        .filter(|(id, l)| {
            id.as_str() != from
                && !l.category.is_part_time()
                && l.units + size <= ceilings.full_time_units
        })
        .min_by(|(a_id, a), (b_id, b)| a.units.cmp(&b.units).then_with(|| a_id.cmp(b_id)))
        .map(|(id, _)| id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CourseRequest;

    fn single(instructor: &str, subject: &str, units: u32) -> JointUnit {
        JointUnit::new(
            format!("{instructor}|{subject}|1"),
            vec![CourseRequest::new(instructor, subject, format!("{subject}-S"), units)],
        )
    }

    fn pair(instructor: &str, subject: &str, units: u32) -> JointUnit {
        JointUnit::new(
            format!("{instructor}|{subject}|1"),
            vec![
                CourseRequest::new(instructor, subject, "S-A", units).with_block("A"),
                CourseRequest::new(instructor, subject, "S-B", units).with_block("B"),
            ],
        )
    }

    #[test]
    fn test_moves_largest_non_critical_first() {
        let ceilings = LoadCeilings::default();
        let mut units = vec![
            single("I1", "A", 10),
            single("I1", "B", 6),
            single("I1", "C", 12),
            single("I2", "D", 3),
        ];
        let report = rebalance(&mut units, &ceilings);

        assert_eq!(report.moves.len(), 1);
        assert_eq!(report.moves[0].unit_id, "I1|C|1");
        assert_eq!(report.moves[0].to, "I2");
        assert_eq!(units[2].instructor_id(), "I2");
        // Key identity is preserved across the move.
        assert_eq!(units[2].members[0].key, "I1|C|1|A");
        assert!(report.still_overloaded.is_empty());
        assert!(overloaded_instructors(&units, &ceilings).is_empty());
    }

    #[test]
    fn test_critical_pair_at_ceiling_stays() {
        let ceilings = LoadCeilings::default();
        // 12 + 12 = 24 units: at the ceiling, nothing moves.
        let mut units = vec![pair("I1", "CS1", 6), pair("I1", "CS2", 6), single("I2", "X", 3)];
        let report = rebalance(&mut units, &ceilings);
        assert!(report.moves.is_empty());
        assert_eq!(units[0].instructor_id(), "I1");
        assert_eq!(units[1].instructor_id(), "I1");
    }

    #[test]
    fn test_critical_pair_within_tolerance_stays() {
        let ceilings = LoadCeilings::default();
        // 25 units: overage 1 is within tolerance.
        let mut units = vec![pair("I1", "CS1", 6), pair("I1", "CS2", 6), single("I1", "Y", 1)];
        units.push(single("I2", "X", 3));
        let report = rebalance(&mut units, &ceilings);
        // The single 1-unit course moves first and clears the overage.
        assert_eq!(report.moves.len(), 1);
        assert!(!report.moves[0].critical_pair);
        assert!(units[0].is_critical_pair());
        assert_eq!(units[0].instructor_id(), "I1");
    }

    #[test]
    fn test_critical_pair_moves_as_last_resort() {
        let ceilings = LoadCeilings::default();
        let mut units = vec![
            pair("I1", "CS1", 6),
            pair("I1", "CS2", 6),
            pair("I1", "CS3", 3),
            single("I2", "X", 3),
        ];
        let report = rebalance(&mut units, &ceilings);
        assert_eq!(report.moves.len(), 1);
        assert!(report.moves[0].critical_pair);
        let moved = units.iter().find(|u| u.id == report.moves[0].unit_id).unwrap();
        assert!(moved.members.iter().all(|m| m.instructor_id == "I2"));
    }

    #[test]
    fn test_part_time_never_receives() {
        let ceilings = LoadCeilings::default();
        let mut units = vec![
            single("I1", "A", 12),
            single("I1", "B", 12),
            single("I1", "C", 3),
            JointUnit::new(
                "PT|Z|1",
                vec![CourseRequest::new("PT", "Z", "Z-S", 2)
                    .with_category(EmploymentCategory::PartTime)],
            ),
        ];
        let report = rebalance(&mut units, &ceilings);
        assert!(report.moves.is_empty());
        assert_eq!(report.still_overloaded, vec!["I1".to_string()]);
    }
}
