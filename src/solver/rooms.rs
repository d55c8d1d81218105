//! Room selection.
//!
//! Rooms are bucketed by building category. A department declares target
//! shares per category; the selector steers bookings toward the category
//! with the largest deficit, then samples among the least-used rooms of
//! that category.

use rand::prelude::IndexedRandom;
use rand::Rng;

use crate::config::{CategoryTarget, RoomDistribution};
use crate::models::{DayPattern, Room, TimeWindow};
use crate::tracker::{ResourceKind, ResourceTracker};

/// Chooses rooms for bookings.
#[derive(Debug, Clone)]
pub struct RoomSelector {
    rooms: Vec<Room>,
    targets: Vec<CategoryTarget>,
    top_k: usize,
}

impl RoomSelector {
    /// Creates a selector for one department.
    ///
    /// Without a declared table every category present in `rooms` gets an
    /// equal share, in order of first appearance.
    pub fn new(rooms: Vec<Room>, distribution: &RoomDistribution, department: &str, top_k: usize) -> Self {
        let targets = match distribution.targets(department) {
            Some(t) if !t.is_empty() => t.to_vec(),
            _ => {
                let mut categories: Vec<&str> = Vec::new();
                for room in &rooms {
                    if !categories.contains(&room.category.as_str()) {
                        categories.push(&room.category);
                    }
                }
                let share = if categories.is_empty() {
                    0.0
                } else {
                    100.0 / categories.len() as f64
                };
                categories
                    .into_iter()
                    .map(|c| CategoryTarget::new(c, share))
                    .collect()
            }
        };
        Self {
            rooms,
            targets,
            top_k: top_k.max(1),
        }
    }

    /// The room pool.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Category targets in priority order.
    pub fn targets(&self) -> &[CategoryTarget] {
        &self.targets
    }

    /// Rooms whose lab flag matches.
    pub fn suitable(&self, requires_lab: bool) -> impl Iterator<Item = &Room> {
        self.rooms.iter().filter(move |r| r.suits(requires_lab))
    }

    /// Whether any room can host the session at all.
    pub fn has_suitable(&self, requires_lab: bool) -> bool {
        self.suitable(requires_lab).next().is_some()
    }

    fn usage(tracker: &ResourceTracker, room: &Room, days: DayPattern) -> (usize, usize) {
        let load = tracker.load(ResourceKind::Room, &room.id);
        let same_day = days.iter().map(|d| load.per_day[d.index()]).sum();
        (load.reservations, same_day)
    }

    /// Share of reservations per category, in percent.
    fn category_usage(&self, tracker: &ResourceTracker) -> Vec<f64> {
        let per_room: Vec<usize> = self
            .rooms
            .iter()
            .map(|r| tracker.load(ResourceKind::Room, &r.id).reservations)
            .collect();
        let total: usize = per_room.iter().sum();
        self.targets
            .iter()
            .map(|t| {
                if total == 0 {
                    return 0.0;
                }
                let used: usize = self
                    .rooms
                    .iter()
                    .zip(&per_room)
                    .filter(|(r, _)| r.category == t.category)
                    .map(|(_, n)| n)
                    .sum();
                used as f64 * 100.0 / total as f64
            })
            .collect()
    }

    /// Distribution-aware choice among free rooms.
    ///
    /// Only categories listed in the targets are considered. Returns `None`
    /// when no such room is free.
    pub fn choose_distributed<R: Rng>(
        &self,
        tracker: &ResourceTracker,
        days: DayPattern,
        window: TimeWindow,
        requires_lab: bool,
        rng: &mut R,
    ) -> Option<&Room> {
        let usage = self.category_usage(tracker);
        let mut best: Option<(f64, Vec<&Room>)> = None;

        for (target, used) in self.targets.iter().zip(usage) {
            let free: Vec<&Room> = self
                .suitable(requires_lab)
                .filter(|r| r.category == target.category)
                .filter(|r| tracker.is_available(ResourceKind::Room, &r.id, days, window))
                .collect();
            if free.is_empty() {
                continue;
            }
            let deficit = target.percent - used;
            match &best {
                Some((d, _)) if deficit <= *d => {}
                _ => best = Some((deficit, free)),
            }
        }

        let (_, mut free) = best?;
        free.sort_by(|a, b| {
            Self::usage(tracker, a, days)
                .cmp(&Self::usage(tracker, b, days))
                .then_with(|| a.id.cmp(&b.id))
        });
        free.truncate(self.top_k);
        free.choose(rng).copied()
    }

    /// Least-used suitable room accepted by `accept`.
    pub fn choose_least_used(
        &self,
        tracker: &ResourceTracker,
        days: DayPattern,
        requires_lab: bool,
        accept: impl Fn(&Room) -> bool,
    ) -> Option<&Room> {
        self.suitable(requires_lab)
            .filter(|r| accept(r))
            .min_by(|a, b| {
                Self::usage(tracker, a, days)
                    .cmp(&Self::usage(tracker, b, days))
                    .then_with(|| a.id.cmp(&b.id))
            })
    }

    /// First suitable room in pool order.
    pub fn first_suitable(&self, requires_lab: bool) -> Option<&Room> {
        self.suitable(requires_lab).next()
    }
}
