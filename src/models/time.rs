//! Weekday and time-of-day primitives.
//!
//! All times are minutes since midnight. A [`TimeWindow`] is the half-open
//! interval `[start, end)`, so back-to-back classes (10:30–12:00 then
//! 13:00–14:30) never overlap.
//!
//! # Day Encoding
//! A single meeting happens on one atomic [`Day`]. Some upstream records
//! encode a joint pattern such as `Mon+Sat`; [`DayPattern`] is a bitmask over
//! the six teaching days and is always expanded to atomic days before any
//! availability lookup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TimetableError;

/// Minutes since midnight.
pub type Minute = u32;

/// Earliest start of the teaching day (07:00).
pub const DAY_START: Minute = 7 * 60;

/// Global daily cutoff (20:45). No class may end after it.
pub const DAY_CUTOFF: Minute = 20 * 60 + 45;

/// Fixed midday blackout (12:00–13:00).
pub const LUNCH: TimeWindow = TimeWindow {
    start: 12 * 60,
    end: 13 * 60,
};

/// Evening window reserved for part-time instructors (17:00–20:45).
pub const EVENING: TimeWindow = TimeWindow {
    start: 17 * 60,
    end: DAY_CUTOFF,
};

/// A teaching day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl Day {
    /// All teaching days in week order.
    pub const ALL: [Day; 6] = [Day::Mon, Day::Tue, Day::Wed, Day::Thu, Day::Fri, Day::Sat];

    /// Zero-based position in the week (Mon = 0).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`Day::index`].
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Three-letter code.
    pub fn code(self) -> &'static str {
        match self {
            Day::Mon => "Mon",
            Day::Tue => "Tue",
            Day::Wed => "Wed",
            Day::Thu => "Thu",
            Day::Fri => "Fri",
            Day::Sat => "Sat",
        }
    }

    /// Whether the two days are consecutive in the week.
    pub fn is_adjacent(self, other: Day) -> bool {
        self.index().abs_diff(other.index()) == 1
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Day {
    type Err = TimetableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let day = match lowered.as_str() {
            "mon" | "monday" | "m" => Day::Mon,
            "tue" | "tues" | "tuesday" | "t" => Day::Tue,
            "wed" | "wednesday" | "w" => Day::Wed,
            "thu" | "thur" | "thurs" | "thursday" | "th" => Day::Thu,
            "fri" | "friday" | "f" => Day::Fri,
            "sat" | "saturday" | "s" => Day::Sat,
            _ => return Err(TimetableError::Parse(format!("unknown day '{s}'"))),
        };
        Ok(day)
    }
}

/// A set of teaching days, stored as a bitmask.
///
/// ```
/// use u_timetable::models::{Day, DayPattern};
///
/// let p: DayPattern = "Mon+Sat".parse().unwrap();
/// assert_eq!(p.iter().collect::<Vec<_>>(), vec![Day::Mon, Day::Sat]);
/// assert_eq!(p.to_string(), "Mon+Sat");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayPattern(u8);

impl DayPattern {
    /// The empty pattern.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// A pattern containing exactly one day.
    pub const fn single(day: Day) -> Self {
        Self(1 << day as u8)
    }

    /// Whether the pattern contains `day`.
    #[inline]
    pub fn contains(self, day: Day) -> bool {
        self.0 & (1 << day.index()) != 0
    }

    /// Adds a day.
    pub fn insert(&mut self, day: Day) {
        self.0 |= 1 << day.index();
    }

    /// Builder form of [`DayPattern::insert`].
    pub fn with(mut self, day: Day) -> Self {
        self.insert(day);
        self
    }

    /// Whether the two patterns share a day.
    pub fn intersects(self, other: DayPattern) -> bool {
        self.0 & other.0 != 0
    }

    /// Number of atomic days.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether no day is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Atomic days in week order.
    pub fn iter(self) -> impl Iterator<Item = Day> {
        Day::ALL.into_iter().filter(move |d| self.contains(*d))
    }

    /// The only day of a single-day pattern.
    pub fn as_single(self) -> Option<Day> {
        if self.len() == 1 {
            self.iter().next()
        } else {
            None
        }
    }
}

impl From<Day> for DayPattern {
    fn from(day: Day) -> Self {
        Self::single(day)
    }
}

impl FromIterator<Day> for DayPattern {
    fn from_iter<I: IntoIterator<Item = Day>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), DayPattern::with)
    }
}

impl fmt::Display for DayPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<&str> = self.iter().map(Day::code).collect();
        f.write_str(&codes.join("+"))
    }
}

impl FromStr for DayPattern {
    type Err = TimetableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut pattern = Self::empty();
        for part in s
            .split(|c: char| c == '+' || c == '/' || c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
        {
            pattern.insert(part.parse()?);
        }
        if pattern.is_empty() {
            return Err(TimetableError::Parse(format!("empty day pattern '{s}'")));
        }
        Ok(pattern)
    }
}

impl TryFrom<String> for DayPattern {
    type Error = TimetableError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DayPattern> for String {
    fn from(value: DayPattern) -> Self {
        value.to_string()
    }
}

/// A time interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start (minutes since midnight, inclusive).
    pub start: Minute,
    /// End (minutes since midnight, exclusive).
    pub end: Minute,
}

impl TimeWindow {
    /// Creates a new window.
    pub const fn new(start: Minute, end: Minute) -> Self {
        Self { start, end }
    }

    /// Creates a window from a start and a length in minutes.
    pub const fn starting_at(start: Minute, minutes: Minute) -> Self {
        Self {
            start,
            end: start + minutes,
        }
    }

    /// Length in minutes (zero for malformed windows).
    #[inline]
    pub fn duration(&self) -> Minute {
        self.end.saturating_sub(self.start)
    }

    /// Length in hours.
    pub fn duration_hours(&self) -> f64 {
        self.duration() as f64 / 60.0
    }

    /// Whether a minute falls within this window.
    #[inline]
    pub fn contains(&self, minute: Minute) -> bool {
        minute >= self.start && minute < self.end
    }

    /// Whether two windows overlap.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `other` lies entirely inside this window.
    pub fn covers(&self, other: &Self) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Whether the window is well-formed (`start < end`).
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    /// Returns the window with `start <= end`, and whether a swap happened.
    pub fn normalized(self) -> (Self, bool) {
        if self.start > self.end {
            (Self::new(self.end, self.start), true)
        } else {
            (self, self.start == self.end)
        }
    }

    /// Whether the window intersects the lunch blackout.
    pub fn hits_lunch(&self) -> bool {
        self.overlaps(&LUNCH)
    }

    /// Whether the window ends after the daily cutoff.
    pub fn past_cutoff(&self) -> bool {
        self.end > DAY_CUTOFF
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_minute(self.start), format_minute(self.end))
    }
}

/// Formats minutes since midnight as `HH:MM`.
pub fn format_minute(minute: Minute) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

/// Parses `HH:MM` (or `H:MM`) into minutes since midnight.
pub fn parse_minute(s: &str) -> Result<Minute, TimetableError> {
    let (h, m) = s
        .trim()
        .split_once(':')
        .ok_or_else(|| TimetableError::Parse(format!("bad time '{s}'")))?;
    let hours: Minute = h
        .parse()
        .map_err(|_| TimetableError::Parse(format!("bad hour in '{s}'")))?;
    let minutes: Minute = m
        .parse()
        .map_err(|_| TimetableError::Parse(format!("bad minute in '{s}'")))?;
    if hours > 23 || minutes > 59 {
        return Err(TimetableError::Parse(format!("time out of range '{s}'")));
    }
    Ok(hours * 60 + minutes)
}
