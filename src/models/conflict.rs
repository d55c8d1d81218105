//! Conflict model.
//!
//! Contention between courses is data, not an error. Each [`Conflict`] has a
//! type and a severity; a [`ConflictReport`] aggregates them and doubles as
//! the fitness signal for the genetic refiner.

use serde::{Deserialize, Serialize};

use super::{Day, TimeWindow};

/// What kind of resource is contended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictType {
    /// Same section booked twice.
    Section,
    /// Instructor teaching two different subjects at once.
    Instructor,
    /// Room hosting two teaching events at once.
    Room,
    /// Session intersecting the lunch blackout.
    Lunch,
}

impl ConflictType {
    /// Severity attached to this type.
    pub fn severity(self) -> Severity {
        match self {
            ConflictType::Section => Severity::Critical,
            ConflictType::Instructor | ConflictType::Room => Severity::High,
            ConflictType::Lunch => Severity::Medium,
        }
    }
}

/// Conflict severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Penalty weight used by fitness evaluation.
    pub fn weight(self) -> f64 {
        match self {
            Severity::Critical => 100.0,
            Severity::High => 50.0,
            Severity::Medium => 10.0,
            Severity::Low => 1.0,
        }
    }
}

/// A detected clash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub conflict_type: ConflictType,
    pub severity: Severity,
    /// Contended resource id (instructor, room or section).
    pub resource_id: String,
    pub day: Option<Day>,
    pub window: Option<TimeWindow>,
    /// Course keys involved.
    pub participants: Vec<String>,
    pub message: String,
}

impl Conflict {
    /// Creates a conflict; severity follows from the type.
    pub fn new(
        conflict_type: ConflictType,
        resource_id: impl Into<String>,
        participants: Vec<String>,
    ) -> Self {
        let resource_id = resource_id.into();
        let message = format!(
            "{:?} conflict on '{}' between {}",
            conflict_type,
            resource_id,
            participants.join(", ")
        );
        Self {
            conflict_type,
            severity: conflict_type.severity(),
            resource_id,
            day: None,
            window: None,
            participants,
            message,
        }
    }

    /// Sets the day and window where the clash happens.
    pub fn at(mut self, day: Day, window: TimeWindow) -> Self {
        self.day = Some(day);
        self.window = Some(window);
        self
    }
}

/// Conflict counts by type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub instructor: usize,
    pub room: usize,
    pub section: usize,
    pub lunch: usize,
}

/// Conflict counts by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Aggregated detection result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub total: usize,
    pub by_type: TypeCounts,
    pub by_severity: SeverityCounts,
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    /// Builds a report from a conflict list.
    pub fn from_conflicts(conflicts: Vec<Conflict>) -> Self {
        let mut by_type = TypeCounts::default();
        let mut by_severity = SeverityCounts::default();
        for c in &conflicts {
            match c.conflict_type {
                ConflictType::Instructor => by_type.instructor += 1,
                ConflictType::Room => by_type.room += 1,
                ConflictType::Section => by_type.section += 1,
                ConflictType::Lunch => by_type.lunch += 1,
            }
            match c.severity {
                Severity::Critical => by_severity.critical += 1,
                Severity::High => by_severity.high += 1,
                Severity::Medium => by_severity.medium += 1,
                Severity::Low => by_severity.low += 1,
            }
        }
        Self {
            total: conflicts.len(),
            by_type,
            by_severity,
            conflicts,
        }
    }

    /// Whether no conflict was found.
    pub fn is_clean(&self) -> bool {
        self.total == 0
    }

    /// `100×critical + 50×high + 10×medium + 1×low`.
    pub fn weighted_score(&self) -> f64 {
        let s = &self.by_severity;
        s.critical as f64 * Severity::Critical.weight()
            + s.high as f64 * Severity::High.weight()
            + s.medium as f64 * Severity::Medium.weight()
            + s.low as f64 * Severity::Low.weight()
    }
}
