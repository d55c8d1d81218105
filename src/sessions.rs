//! Session splitter.
//!
//! Maps a course's weekly units and employment category to the ordered list
//! of weekly meetings it needs. Pure function; at most two sessions.
//!
//! | units | full-time   | part-time   |
//! |-------|-------------|-------------|
//! | 0, 1  | 1.5         | 1.5         |
//! | 2     | 2           | 2           |
//! | 3     | 1.5 + 1.5   | 1.5 + 1.5   |
//! | 4     | 2 + 2       | 2 + 2       |
//! | 5     | 2.5 + 2.5   | 2.5 + 2.5   |
//! | 6     | 3 + 3       | 3 + 3       |
//! | 7     | 3.5 + 3.5   | 3.5 + 3.5   |
//! | 8     | 4 + 4       | 3.5 + 3.5   |
//! | 9     | 4.5 + 4.5   | 3.5 + 3.5   |
//! | 10–12 | 5 + 5       | 3.5 + 3.5   |
//!
//! Part-time sessions are capped at 3.5 h so they fit the 17:00–20:45 window.

use serde::{Deserialize, Serialize};

use crate::models::{EmploymentCategory, Minute};

/// Highest unit count the splitter distinguishes.
pub const MAX_UNITS: u32 = 12;

/// Longest session a part-time course may have (3.5 h).
pub const PART_TIME_CAP: Minute = 210;

/// One required weekly meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Zero-based position within the course.
    pub ordinal: usize,
    /// Required length in minutes.
    pub duration: Minute,
}

impl Session {
    /// Length in hours.
    pub fn duration_hours(&self) -> f64 {
        self.duration as f64 / 60.0
    }
}

/// Splits weekly units into sessions.
///
/// Units above [`MAX_UNITS`] are clamped with a warning.
pub fn split_sessions(units: u32, category: EmploymentCategory) -> Vec<Session> {
    let units = if units > MAX_UNITS {
        log::warn!("units {units} above {MAX_UNITS}, clamping");
        MAX_UNITS
    } else {
        units
    };

    let (count, minutes): (usize, Minute) = match units {
        0 | 1 => (1, 90),
        2 => (1, 120),
        3 => (2, 90),
        4 => (2, 120),
        5 => (2, 150),
        6 => (2, 180),
        7 => (2, 210),
        8 => (2, 240),
        9 => (2, 270),
        _ => (2, 300),
    };
    let minutes = if category.is_part_time() {
        minutes.min(PART_TIME_CAP)
    } else {
        minutes
    };

    (0..count)
        .map(|ordinal| Session {
            ordinal,
            duration: minutes,
        })
        .collect()
}

/// Number of sessions [`split_sessions`] returns.
pub fn session_count(units: u32) -> usize {
    if units <= 2 {
        1
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(units: u32, category: EmploymentCategory) -> Vec<f64> {
        split_sessions(units, category)
            .iter()
            .map(Session::duration_hours)
            .collect()
    }

    #[test]
    fn test_full_time_table() {
        let ft = EmploymentCategory::FullTime;
        assert_eq!(hours(0, ft), vec![1.5]);
        assert_eq!(hours(1, ft), vec![1.5]);
        assert_eq!(hours(2, ft), vec![2.0]);
        assert_eq!(hours(3, ft), vec![1.5, 1.5]);
        assert_eq!(hours(5, ft), vec![2.5, 2.5]);
        assert_eq!(hours(8, ft), vec![4.0, 4.0]);
        assert_eq!(hours(9, ft), vec![4.5, 4.5]);
        assert_eq!(hours(12, ft), vec![5.0, 5.0]);
    }

    #[test]
    fn test_part_time_capped() {
        let pt = EmploymentCategory::PartTime;
        assert_eq!(hours(5, pt), vec![2.5, 2.5]);
        assert_eq!(hours(7, pt), vec![3.5, 3.5]);
        assert_eq!(hours(8, pt), vec![3.5, 3.5]);
        assert_eq!(hours(11, pt), vec![3.5, 3.5]);
    }

    #[test]
    fn test_units_clamped() {
        let ft = EmploymentCategory::FullTime;
        assert_eq!(hours(40, ft), hours(12, ft));
    }

    #[test]
    fn test_ordinals_and_count() {
        for units in 0..=14 {
            let sessions = split_sessions(units, EmploymentCategory::FullTime);
            assert_eq!(sessions.len(), session_count(units));
            for (i, s) in sessions.iter().enumerate() {
                assert_eq!(s.ordinal, i);
            }
        }
    }
}
