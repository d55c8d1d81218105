//! Time catalog.
//!
//! The finite set of candidate `(day, start, end)` slots every placement is
//! drawn from. Built once per process and shared behind an [`Arc`].
//!
//! # Generation
//! For each duration in [`SLOT_DURATIONS`] and each day Mon–Sat, starts run
//! every 30 minutes from 07:00, plus one start aligned so the slot ends
//! exactly at the 20:45 cutoff. Slots intersecting lunch or ending after the
//! cutoff are dropped.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::models::{Day, DayPattern, Minute, TimeWindow, DAY_CUTOFF, DAY_START, EVENING};

/// Slot lengths in minutes (1.5 h to 5 h in half-hour steps).
pub const SLOT_DURATIONS: [Minute; 8] = [90, 120, 150, 180, 210, 240, 270, 300];

/// Grid step between consecutive starts.
pub const START_STEP: Minute = 30;

/// A candidate meeting slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    pub day: Day,
    pub window: TimeWindow,
}

/// How a slot's length compares with a required session length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationFit {
    Exact,
    Tolerated,
}

/// Whether a slot of `slot_minutes` may host a session of `required`.
///
/// Sessions of 5 h or of at most 2 h need an exact match; the rest accept
/// slots within 75–125 % of the required length.
pub fn duration_fit(required: Minute, slot_minutes: Minute) -> Option<DurationFit> {
    if slot_minutes == required {
        return Some(DurationFit::Exact);
    }
    if required >= 300 || required <= 120 {
        return None;
    }
    let lo = required * 3 / 4;
    let hi = required * 5 / 4;
    (lo..=hi)
        .contains(&slot_minutes)
        .then_some(DurationFit::Tolerated)
}

/// Precomputed candidate slots.
#[derive(Debug, Clone)]
pub struct TimeCatalog {
    slots: Vec<TimeSlot>,
    by_duration: BTreeMap<Minute, Vec<usize>>,
}

impl TimeCatalog {
    /// Generates the catalog.
    pub fn build() -> Self {
        let mut slots = Vec::new();
        for day in Day::ALL {
            for &minutes in &SLOT_DURATIONS {
                let mut starts: Vec<Minute> = (DAY_START..=DAY_CUTOFF - minutes)
                    .step_by(START_STEP as usize)
                    .collect();
                let aligned = DAY_CUTOFF - minutes;
                if !starts.contains(&aligned) {
                    starts.push(aligned);
                }
                for start in starts {
                    let window = TimeWindow::starting_at(start, minutes);
                    if window.hits_lunch() || window.past_cutoff() {
                        continue;
                    }
                    slots.push(TimeSlot { day, window });
                }
            }
        }
        slots.sort();

        let mut by_duration: BTreeMap<Minute, Vec<usize>> = BTreeMap::new();
        for (i, slot) in slots.iter().enumerate() {
            by_duration.entry(slot.window.duration()).or_default().push(i);
        }

        log::debug!("time catalog built with {} slots", slots.len());
        Self { slots, by_duration }
    }

    /// Process-wide shared catalog.
    pub fn shared() -> Arc<TimeCatalog> {
        static CATALOG: OnceLock<Arc<TimeCatalog>> = OnceLock::new();
        Arc::clone(CATALOG.get_or_init(|| Arc::new(TimeCatalog::build())))
    }

    /// All slots, sorted by day then window.
    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots of exactly `minutes` length.
    pub fn with_duration(&self, minutes: Minute) -> impl Iterator<Item = &TimeSlot> {
        self.by_duration
            .get(&minutes)
            .into_iter()
            .flatten()
            .map(move |&i| &self.slots[i])
    }

    /// Slots that may host a session of `required` minutes.
    ///
    /// Excludes `used_days`; restricts to the evening window when
    /// `evening_only` is set.
    pub fn candidates(
        &self,
        required: Minute,
        used_days: DayPattern,
        evening_only: bool,
    ) -> Vec<(TimeSlot, DurationFit)> {
        self.by_duration
            .iter()
            .filter_map(|(&minutes, idx)| duration_fit(required, minutes).map(|fit| (fit, idx)))
            .flat_map(|(fit, idx)| idx.iter().map(move |&i| (self.slots[i], fit)))
            .filter(|(slot, _)| !used_days.contains(slot.day))
            .filter(|(slot, _)| !evening_only || EVENING.covers(&slot.window))
            .collect()
    }
}

impl Default for TimeCatalog {
    fn default() -> Self {
        Self::build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LUNCH;

    #[test]
    fn test_catalog_respects_blackouts() {
        let catalog = TimeCatalog::build();
        assert!(!catalog.is_empty());
        for slot in catalog.slots() {
            assert!(!slot.window.overlaps(&LUNCH), "{slot:?} hits lunch");
            assert!(slot.window.end <= DAY_CUTOFF);
            assert!(slot.window.start >= DAY_START);
            assert!(SLOT_DURATIONS.contains(&slot.window.duration()));
        }
    }

    #[test]
    fn test_cutoff_aligned_start() {
        let catalog = TimeCatalog::build();
        // 150 min ending at 20:45 starts at 18:15, off the half-hour grid.
        let aligned = catalog
            .with_duration(150)
            .any(|s| s.day == Day::Mon && s.window == TimeWindow::new(1095, DAY_CUTOFF));
        assert!(aligned);
    }

    #[test]
    fn test_every_day_has_every_duration() {
        let catalog = TimeCatalog::build();
        for &d in &SLOT_DURATIONS {
            for day in Day::ALL {
                assert!(catalog.with_duration(d).any(|s| s.day == day), "{day} {d}");
            }
        }
    }

    #[test]
    fn test_duration_fit() {
        assert_eq!(duration_fit(90, 90), Some(DurationFit::Exact));
        assert_eq!(duration_fit(90, 120), None);
        assert_eq!(duration_fit(300, 270), None);
        assert_eq!(duration_fit(180, 150), Some(DurationFit::Tolerated));
        assert_eq!(duration_fit(180, 210), Some(DurationFit::Tolerated));
        assert_eq!(duration_fit(180, 240), None);
    }

    #[test]
    fn test_candidates_evening_and_used_days() {
        let catalog = TimeCatalog::build();
        let used = DayPattern::single(Day::Mon);
        let cands = catalog.candidates(150, used, true);
        assert!(!cands.is_empty());
        for (slot, _) in &cands {
            assert_ne!(slot.day, Day::Mon);
            assert!(slot.window.start >= EVENING.start);
            assert!(slot.window.end <= EVENING.end);
        }
    }

    #[test]
    fn test_shared_is_singleton() {
        let a = TimeCatalog::shared();
        let b = TimeCatalog::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
