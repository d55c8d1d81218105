//! Per-unit placement chromosome.
//!
//! # Encoding
//!
//! One gene per joint unit, in unit order. A gene lists the placement of
//! every session of the unit: day, window and room. Decoding emits one
//! entry per member per session, so joint units stay co-scheduled by
//! construction.

use std::collections::HashMap;

use u_metaheur::ga::Individual;

use crate::catalog::TimeSlot;
use crate::models::{JointUnit, PlacementStage, ScheduleEntry};
use crate::solver::unit_entries;

/// Where one session of a unit meets.
#[derive(Debug, Clone, PartialEq)]
pub struct GenePlacement {
    pub ordinal: usize,
    pub slot: TimeSlot,
    pub room_id: String,
    /// Stage that produced this placement.
    pub stage: PlacementStage,
    pub emergency: bool,
}

/// Placements of every session of one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gene {
    pub placements: Vec<GenePlacement>,
}

impl Gene {
    /// Entries for every member of `unit`.
    pub fn entries(&self, unit: &JointUnit) -> Vec<ScheduleEntry> {
        self.placements
            .iter()
            .flat_map(|p| unit_entries(unit, p.ordinal, p.slot, &p.room_id, p.stage, p.emergency))
            .collect()
    }
}

/// A whole timetable as a gene sequence.
///
/// Lower fitness = better timetable (minimization convention).
#[derive(Debug, Clone)]
pub struct TimetableChromosome {
    pub genes: Vec<Gene>,
    pub fitness: f64,
}

impl Individual for TimetableChromosome {
    type Fitness = f64;

    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }
}

impl TimetableChromosome {
    /// Creates an unevaluated chromosome.
    pub fn new(genes: Vec<Gene>) -> Self {
        Self {
            genes,
            fitness: f64::INFINITY,
        }
    }

    /// Encodes an existing timetable.
    ///
    /// Each unit reads the entries of its first member.
    pub fn from_entries(units: &[JointUnit], entries: &[ScheduleEntry]) -> Self {
        let mut by_key: HashMap<&str, Vec<&ScheduleEntry>> = HashMap::new();
        for e in entries {
            by_key.entry(e.course_key.as_str()).or_default().push(e);
        }

        let genes = units
            .iter()
            .map(|unit| {
                let mut placements: Vec<GenePlacement> = unit
                    .members
                    .first()
                    .and_then(|lead| by_key.get(lead.key.as_str()))
                    .into_iter()
                    .flatten()
                    .filter_map(|e| {
                        let day = e.days.iter().next()?;
                        Some(GenePlacement {
                            ordinal: e.session,
                            slot: TimeSlot {
                                day,
                                window: e.window,
                            },
                            room_id: e.room_id.clone(),
                            stage: e.stage,
                            emergency: e.emergency_scheduled,
                        })
                    })
                    .collect();
                placements.sort_by_key(|p| p.ordinal);
                Gene { placements }
            })
            .collect();

        Self::new(genes)
    }

    /// Decodes into timetable entries.
    pub fn decode(&self, units: &[JointUnit]) -> Vec<ScheduleEntry> {
        self.genes
            .iter()
            .zip(units)
            .flat_map(|(gene, unit)| gene.entries(unit))
            .collect()
    }

    /// Number of genes.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Whether there are no genes.
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseRequest, Day, TimeWindow};

    fn pair() -> JointUnit {
        JointUnit::new(
            "I1|CS1|1",
            vec![
                CourseRequest::new("I1", "CS1", "S-A", 3).with_block("A"),
                CourseRequest::new("I1", "CS1", "S-B", 3).with_block("B"),
            ],
        )
    }

    fn placement(ordinal: usize, day: Day, start: u32) -> GenePlacement {
        GenePlacement {
            ordinal,
            slot: TimeSlot {
                day,
                window: TimeWindow::starting_at(start, 90),
            },
            room_id: "R1".into(),
            stage: PlacementStage::Primary,
            emergency: false,
        }
    }

    #[test]
    fn test_decode_emits_per_member() {
        let units = vec![pair()];
        let ch = TimetableChromosome::new(vec![Gene {
            placements: vec![placement(0, Day::Mon, 480), placement(1, Day::Thu, 480)],
        }]);
        let entries = ch.decode(&units);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].course_key, "I1|CS1|1|A");
        assert_eq!(entries[1].course_key, "I1|CS1|1|B");
        assert_eq!(entries[0].window, entries[1].window);
        assert!(ch.fitness.is_infinite());
    }

    #[test]
    fn test_encode_decode_preserves_entries() {
        let units = vec![pair()];
        let ch = TimetableChromosome::new(vec![Gene {
            placements: vec![placement(0, Day::Tue, 540), placement(1, Day::Fri, 540)],
        }]);
        let entries = ch.decode(&units);
        let again = TimetableChromosome::from_entries(&units, &entries);
        assert_eq!(again.genes, ch.genes);
        assert_eq!(again.len(), 1);
    }
}
