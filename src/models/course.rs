//! Course-offering models.
//!
//! A [`CourseRecord`] is the raw, all-optional input row. Boundary
//! normalization (see [`crate::validation`]) turns it into a typed
//! [`CourseRequest`]. Requests that share instructor, subject and year level
//! but differ in block are bundled into a [`JointUnit`] and always placed
//! together.

use serde::{Deserialize, Serialize};

use crate::sessions::{split_sessions, Session};

/// Employment category of the instructor teaching a course.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentCategory {
    /// Full-time faculty, any teaching hour.
    #[default]
    FullTime,
    /// Part-time faculty, restricted to the evening window.
    PartTime,
}

impl EmploymentCategory {
    /// Whether this is the part-time category.
    #[inline]
    pub fn is_part_time(self) -> bool {
        self == EmploymentCategory::PartTime
    }

    /// Maximum number of course requests an instructor of this category can
    /// realistically carry before being flagged as infeasible.
    pub fn max_courses(self) -> usize {
        match self {
            EmploymentCategory::FullTime => 8,
            EmploymentCategory::PartTime => 4,
        }
    }
}

/// Raw course-offering row, as received from upstream.
///
/// Every field is optional; missing values are replaced with placeholders
/// during normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseRecord {
    pub instructor_id: Option<String>,
    pub subject_code: Option<String>,
    pub section_id: Option<String>,
    pub year_level: Option<String>,
    pub block: Option<String>,
    pub units: Option<u32>,
    pub employment_category: Option<EmploymentCategory>,
    pub requires_lab: Option<bool>,
    pub department: Option<String>,
}

/// A typed, schedulable course offering.
///
/// `key` is `instructorId|subjectCode|yearLevel|block`. It is composed while
/// the request is built and is never recomputed afterwards, so it stays the
/// course's identity when rebalancing hands the course to another instructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequest {
    pub key: String,
    pub instructor_id: String,
    pub subject_code: String,
    pub section_id: String,
    pub year_level: String,
    pub block: String,
    pub units: u32,
    pub employment_category: EmploymentCategory,
    pub requires_lab: bool,
    pub department: String,
}

impl CourseRequest {
    /// Creates a full-time, non-lab, single-block request.
    pub fn new(
        instructor_id: impl Into<String>,
        subject_code: impl Into<String>,
        section_id: impl Into<String>,
        units: u32,
    ) -> Self {
        let mut request = Self {
            key: String::new(),
            instructor_id: instructor_id.into(),
            subject_code: subject_code.into(),
            section_id: section_id.into(),
            year_level: "1".into(),
            block: "A".into(),
            units,
            employment_category: EmploymentCategory::FullTime,
            requires_lab: false,
            department: String::new(),
        };
        request.key = request.compose_key();
        request
    }

    /// Sets the year level.
    pub fn with_year_level(mut self, year_level: impl Into<String>) -> Self {
        self.year_level = year_level.into();
        self.key = self.compose_key();
        self
    }

    /// Sets the block letter (or a raw multi-block encoding before expansion).
    pub fn with_block(mut self, block: impl Into<String>) -> Self {
        self.block = block.into();
        self.key = self.compose_key();
        self
    }

    /// Sets the employment category.
    pub fn with_category(mut self, category: EmploymentCategory) -> Self {
        self.employment_category = category;
        self
    }

    /// Marks the course as requiring a lab room.
    pub fn with_lab(mut self, requires_lab: bool) -> Self {
        self.requires_lab = requires_lab;
        self
    }

    /// Sets the owning department.
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }

    /// `instructorId|subjectCode|yearLevel`, the bundle identity.
    pub fn joint_key(&self) -> String {
        format!("{}|{}|{}", self.instructor_id, self.subject_code, self.year_level)
    }

    /// Session durations required by this course.
    pub fn sessions(&self) -> Vec<Session> {
        split_sessions(self.units, self.employment_category)
    }

    /// Moves the course to another instructor. The key is left untouched.
    pub fn reassign(&mut self, instructor_id: &str, category: EmploymentCategory) {
        self.instructor_id = instructor_id.to_string();
        self.employment_category = category;
    }

    fn compose_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.instructor_id, self.subject_code, self.year_level, self.block
        )
    }
}

/// Requests that must share an identical day, time and room.
///
/// A single-block course is a unit with one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointUnit {
    /// `instructorId|subjectCode|yearLevel` at detection time.
    pub id: String,
    /// Member requests, ordered by block.
    pub members: Vec<CourseRequest>,
}

impl JointUnit {
    /// Creates a unit from its members. Members are sorted by block.
    pub fn new(id: impl Into<String>, mut members: Vec<CourseRequest>) -> Self {
        members.sort_by(|a, b| a.block.cmp(&b.block));
        Self {
            id: id.into(),
            members,
        }
    }

    fn lead(&self) -> Option<&CourseRequest> {
        self.members.first()
    }

    /// Current instructor (shared by all members).
    pub fn instructor_id(&self) -> &str {
        self.lead().map(|m| m.instructor_id.as_str()).unwrap_or_default()
    }

    /// Subject code (shared by all members).
    pub fn subject_code(&self) -> &str {
        self.lead().map(|m| m.subject_code.as_str()).unwrap_or_default()
    }

    /// Department of the lead member.
    pub fn department(&self) -> &str {
        self.lead().map(|m| m.department.as_str()).unwrap_or_default()
    }

    /// Part-time if any member is part-time.
    pub fn category(&self) -> EmploymentCategory {
        if self.members.iter().any(|m| m.employment_category.is_part_time()) {
            EmploymentCategory::PartTime
        } else {
            EmploymentCategory::FullTime
        }
    }

    /// Whether any member needs a lab room.
    pub fn requires_lab(&self) -> bool {
        self.members.iter().any(|m| m.requires_lab)
    }

    /// Weekly units of one meeting pattern (the largest member's).
    pub fn units(&self) -> u32 {
        self.members.iter().map(|m| m.units).max().unwrap_or(0)
    }

    /// Units this unit contributes to its instructor's load.
    pub fn load_units(&self) -> u32 {
        self.members.iter().map(|m| m.units).sum()
    }

    /// Sessions the whole unit must be placed in.
    pub fn sessions(&self) -> Vec<Session> {
        split_sessions(self.units(), self.category())
    }

    /// Block letters of the members.
    pub fn blocks(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.block.as_str()).collect()
    }

    /// Section ids of the members.
    pub fn section_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.section_id.clone()).collect()
    }

    /// Member keys.
    pub fn keys(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.key.as_str()).collect()
    }

    /// Whether the member blocks are exactly {A, B}.
    pub fn is_critical_pair(&self) -> bool {
        let mut blocks: Vec<String> = self
            .members
            .iter()
            .map(|m| m.block.trim().to_ascii_uppercase())
            .collect();
        blocks.sort();
        blocks == ["A", "B"]
    }

    /// Moves every member to another instructor.
    pub fn reassign(&mut self, instructor_id: &str, category: EmploymentCategory) {
        for member in &mut self.members {
            member.reassign(instructor_id, category);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_key_fixed_at_build() {
        let mut req = CourseRequest::new("I1", "CS101", "BSCS-1", 3)
            .with_year_level("2")
            .with_block("B");
        assert_eq!(req.key, "I1|CS101|2|B");
        assert_eq!(req.joint_key(), "I1|CS101|2");

        req.reassign("I9", EmploymentCategory::FullTime);
        assert_eq!(req.instructor_id, "I9");
        assert_eq!(req.key, "I1|CS101|2|B");
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&EmploymentCategory::PartTime).unwrap();
        assert_eq!(json, "\"PART_TIME\"");
        assert_eq!(EmploymentCategory::PartTime.max_courses(), 4);
        assert_eq!(EmploymentCategory::FullTime.max_courses(), 8);
    }

    #[test]
    fn test_record_all_optional() {
        let rec: CourseRecord = serde_json::from_str(r#"{"subjectCode":"MATH1"}"#).unwrap();
        assert_eq!(rec.subject_code.as_deref(), Some("MATH1"));
        assert!(rec.instructor_id.is_none());
        assert!(rec.units.is_none());
    }

    #[test]
    fn test_joint_unit_critical_pair() {
        let a = CourseRequest::new("I1", "CS101", "S-A", 3).with_block("A");
        let b = CourseRequest::new("I1", "CS101", "S-B", 3).with_block("B");
        let c = CourseRequest::new("I1", "CS101", "S-C", 3).with_block("C");

        let pair = JointUnit::new("I1|CS101|1", vec![b.clone(), a.clone()]);
        assert!(pair.is_critical_pair());
        assert_eq!(pair.blocks(), vec!["A", "B"]);
        assert_eq!(pair.load_units(), 6);
        assert_eq!(pair.units(), 3);

        let triple = JointUnit::new("I1|CS101|1", vec![a.clone(), b, c]);
        assert!(!triple.is_critical_pair());

        let single = JointUnit::new("I1|CS101|1", vec![a]);
        assert!(!single.is_critical_pair());
        assert_eq!(single.sessions().len(), 2);
    }

    #[test]
    fn test_joint_unit_category_and_reassign() {
        let a = CourseRequest::new("I1", "CS101", "S-A", 2)
            .with_block("A")
            .with_category(EmploymentCategory::PartTime);
        let b = CourseRequest::new("I1", "CS101", "S-B", 2).with_block("B");
        let mut unit = JointUnit::new("I1|CS101|1", vec![a, b]);
        assert_eq!(unit.category(), EmploymentCategory::PartTime);

        unit.reassign("I2", EmploymentCategory::FullTime);
        assert_eq!(unit.instructor_id(), "I2");
        assert_eq!(unit.category(), EmploymentCategory::FullTime);
        assert_eq!(unit.keys(), vec!["I1|CS101|1|A", "I1|CS101|1|B"]);
    }
}
