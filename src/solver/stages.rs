//! Placement stages.
//!
//! Each stage of the fallback ladder takes the still-pending units and
//! returns what it could not place. Stages differ only in how strictly they
//! validate, how they choose rooms, and whether the same-start rule holds.
//!
//! | Stage | Same start | Validation | Room |
//! |-------|-----------|------------|------|
//! | Primary | yes | strict | distribution |
//! | RoomRelaxed | yes | strict | least used |
//! | SameTimeRelaxed | no | strict | least used |
//! | Emergency | no | instructor + sections | free, else double-booked |
//!
//! [`force_pass`] runs last over every unit and never leaves a session
//! unplaced.

use rand_chacha::ChaCha8Rng;

use super::deadline::Deadline;
use super::ranking::rank_slots;
use super::rooms::RoomSelector;
use crate::catalog::{DurationFit, TimeCatalog, TimeSlot};
use crate::models::{
    Day, DayPattern, JointUnit, Minute, PlacementStage, Room, Schedule, ScheduleEntry, TimeWindow,
    DAY_START, PLACEHOLDER_ROOM,
};
use crate::sessions::Session;
use crate::tracker::{Booking, ResourceKind, ResourceTracker, ValidationMode};

/// Mutable state shared by the stages of one solve.
pub(crate) struct PlacementContext<'a> {
    pub units: &'a [JointUnit],
    pub catalog: &'a TimeCatalog,
    pub rooms: &'a RoomSelector,
    pub tracker: &'a mut ResourceTracker,
    pub schedule: &'a mut Schedule,
    pub rng: &'a mut ChaCha8Rng,
    pub deadline: Deadline,
}

#[derive(Debug, Clone, Copy)]
struct PlacedSession {
    ordinal: usize,
    slot: TimeSlot,
}

/// A unit with sessions still to place.
#[derive(Debug, Clone)]
pub(crate) struct PendingUnit {
    pub index: usize,
    sessions: Vec<Session>,
    placed: Vec<PlacedSession>,
    preferred_start: Option<Minute>,
}

impl PendingUnit {
    pub fn new(index: usize, sessions: Vec<Session>) -> Self {
        Self {
            index,
            sessions,
            placed: Vec::new(),
            preferred_start: None,
        }
    }

    fn used_days(&self) -> DayPattern {
        self.placed
            .iter()
            .fold(DayPattern::empty(), |acc, p| acc.with(p.slot.day))
    }

    fn unplaced(&self) -> Vec<Session> {
        self.sessions
            .iter()
            .filter(|s| !self.placed.iter().any(|p| p.ordinal == s.ordinal))
            .copied()
            .collect()
    }

    fn record(&mut self, ordinal: usize, slot: TimeSlot) {
        self.placed.push(PlacedSession { ordinal, slot });
        self.preferred_start.get_or_insert(slot.window.start);
    }

    pub fn is_complete(&self) -> bool {
        self.placed.len() >= self.sessions.len()
    }
}

/// What a stage placed and what it hands on.
#[derive(Debug, Default)]
pub(crate) struct StageOutcome {
    pub placed: usize,
    pub remaining: Vec<PendingUnit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoomPolicy {
    Distributed,
    LeastUsed,
    Combined,
    Contended,
}

#[derive(Debug, Clone, Copy)]
struct Attempt {
    stage: PlacementStage,
    same_time: bool,
    mode: ValidationMode,
    rooms: RoomPolicy,
}

impl Attempt {
    fn for_stage(stage: PlacementStage) -> Self {
        let (same_time, mode, rooms) = match stage {
            PlacementStage::Primary => (true, ValidationMode::Strict, RoomPolicy::Distributed),
            PlacementStage::RoomRelaxed => (true, ValidationMode::Strict, RoomPolicy::LeastUsed),
            PlacementStage::SameTimeRelaxed => {
                (false, ValidationMode::Strict, RoomPolicy::LeastUsed)
            }
            PlacementStage::Emergency => {
                (false, ValidationMode::IgnoreRoom, RoomPolicy::Contended)
            }
            PlacementStage::Forced | PlacementStage::Refined => {
                (false, ValidationMode::Strict, RoomPolicy::LeastUsed)
            }
        };
        Self {
            stage,
            same_time,
            mode,
            rooms,
        }
    }

    const fn forced(same_time: bool, mode: ValidationMode, rooms: RoomPolicy) -> Self {
        Self {
            stage: PlacementStage::Forced,
            same_time,
            mode,
            rooms,
        }
    }
}

const FORCE_TIERS: [Attempt; 6] = [
    Attempt::forced(true, ValidationMode::Strict, RoomPolicy::LeastUsed),
    Attempt::forced(true, ValidationMode::RelaxedSection, RoomPolicy::LeastUsed),
    Attempt::forced(true, ValidationMode::Combined, RoomPolicy::Combined),
    Attempt::forced(false, ValidationMode::Strict, RoomPolicy::LeastUsed),
    Attempt::forced(false, ValidationMode::RelaxedSection, RoomPolicy::LeastUsed),
    Attempt::forced(false, ValidationMode::Combined, RoomPolicy::Combined),
];

/// Entries for every member of `unit` in one session.
pub(crate) fn unit_entries(
    unit: &JointUnit,
    ordinal: usize,
    slot: TimeSlot,
    room_id: &str,
    stage: PlacementStage,
    emergency: bool,
) -> Vec<ScheduleEntry> {
    unit.members
        .iter()
        .map(|m| ScheduleEntry {
            course_key: m.key.clone(),
            instructor_id: m.instructor_id.clone(),
            subject_code: m.subject_code.clone(),
            section_id: m.section_id.clone(),
            year_level: m.year_level.clone(),
            days: slot.day.into(),
            window: slot.window,
            room_id: room_id.to_string(),
            duration_hours: slot.window.duration_hours(),
            session: ordinal,
            stage,
            emergency_scheduled: emergency,
        })
        .collect()
}

fn commit(
    ctx: &mut PlacementContext<'_>,
    unit: &JointUnit,
    ordinal: usize,
    slot: TimeSlot,
    room_id: &str,
    stage: PlacementStage,
    emergency: bool,
) {
    if room_id == PLACEHOLDER_ROOM {
        log::warn!("{}: no suitable room, using {PLACEHOLDER_ROOM}", unit.id);
    }
    log::trace!("{} session {} -> {} {} {}", unit.id, ordinal, slot.day, slot.window, room_id);
    ctx.schedule
        .entries
        .extend(unit_entries(unit, ordinal, slot, room_id, stage, emergency));
}

/// Picks a room for one slot. The flag is set when the room is contended.
fn choose_room(
    ctx: &mut PlacementContext<'_>,
    unit: &JointUnit,
    policy: RoomPolicy,
    slot: TimeSlot,
) -> Option<(String, bool)> {
    let rooms = ctx.rooms;
    let lab = unit.requires_lab();
    if !rooms.has_suitable(lab) {
        return Some((PLACEHOLDER_ROOM.to_string(), false));
    }
    let days = DayPattern::single(slot.day);
    let window = slot.window;
    let tracker: &ResourceTracker = &*ctx.tracker;
    let free = |r: &Room| tracker.is_available(ResourceKind::Room, &r.id, days, window);

    let chosen = match policy {
        RoomPolicy::Distributed => rooms
            .choose_distributed(tracker, days, window, lab, ctx.rng)
            .map(|r| (r, false)),
        RoomPolicy::LeastUsed => rooms
            .choose_least_used(tracker, days, lab, free)
            .map(|r| (r, false)),
        RoomPolicy::Combined => rooms
            .choose_least_used(tracker, days, lab, |r| {
                tracker.is_available_combined(
                    ResourceKind::Room,
                    &r.id,
                    days,
                    window,
                    unit.subject_code(),
                    unit.instructor_id(),
                )
            })
            .map(|r| (r, false)),
        RoomPolicy::Contended => rooms
            .choose_least_used(tracker, days, lab, free)
            .map(|r| (r, false))
            .or_else(|| rooms.first_suitable(lab).map(|r| (r, true))),
    };
    chosen.map(|(r, contended)| (r.id.clone(), contended))
}

/// Tries every ranked slot for one session and commits the first that
/// validates.
fn try_session(
    ctx: &mut PlacementContext<'_>,
    unit_index: usize,
    session: Session,
    used_days: DayPattern,
    preferred_start: Option<Minute>,
    attempt: Attempt,
) -> Option<TimeSlot> {
    let units = ctx.units;
    let unit = &units[unit_index];
    let evening = unit.category().is_part_time();
    let mut candidates = ctx.catalog.candidates(session.duration, used_days, evening);
    if let Some(start) = preferred_start {
        candidates.retain(|(slot, _)| slot.window.start == start);
    }
    let sections = unit.section_ids();

    for slot in rank_slots(candidates, ctx.tracker, used_days) {
        let Some((room_id, contended)) = choose_room(ctx, unit, attempt.rooms, slot) else {
            continue;
        };
        let booking = Booking {
            course_key: &unit.id,
            subject_code: unit.subject_code(),
            instructor_id: unit.instructor_id(),
            room_id: &room_id,
            section_ids: &sections,
            days: slot.day.into(),
            window: slot.window,
        };
        let reserved = if contended {
            let ok = ctx
                .tracker
                .validate_with(&booking, ValidationMode::IgnoreRoom)
                .is_empty();
            if ok {
                ctx.tracker.reserve_all_trusted(&booking);
            }
            ok
        } else {
            ctx.tracker.reserve_all_with(&booking, attempt.mode).is_ok()
        };
        if reserved {
            if contended {
                log::warn!(
                    "{}: double-booking room {} on {} {}",
                    unit.id,
                    room_id,
                    slot.day,
                    slot.window
                );
            }
            commit(ctx, unit, session.ordinal, slot, &room_id, attempt.stage, contended);
            return Some(slot);
        }
    }
    None
}

/// Runs one ladder stage over the pending units.
pub(crate) fn run_stage(
    stage: PlacementStage,
    pending: Vec<PendingUnit>,
    ctx: &mut PlacementContext<'_>,
) -> StageOutcome {
    let attempt = Attempt::for_stage(stage);
    let mut outcome = StageOutcome::default();
    let mut timed_out = false;

    for mut unit in pending {
        if timed_out || ctx.deadline.expired() {
            timed_out = true;
            outcome.remaining.push(unit);
            continue;
        }
        for session in unit.unplaced() {
            let preferred = if attempt.same_time {
                unit.preferred_start
            } else {
                None
            };
            if let Some(slot) =
                try_session(ctx, unit.index, session, unit.used_days(), preferred, attempt)
            {
                unit.record(session.ordinal, slot);
                outcome.placed += 1;
            }
        }
        if !unit.is_complete() {
            outcome.remaining.push(unit);
        }
    }

    if timed_out {
        log::debug!("{} stage hit the deadline", stage.name());
    }
    log::debug!(
        "{} stage: placed {} sessions, {} units pending",
        stage.name(),
        outcome.placed,
        outcome.remaining.len()
    );
    outcome
}

/// First slot of the required length on an unused day, exact lengths first.
pub(crate) fn fallback_slot(
    catalog: &TimeCatalog,
    unit: &JointUnit,
    session: Session,
    used_days: DayPattern,
) -> TimeSlot {
    let pick = |evening_only: bool| {
        let candidates = catalog.candidates(session.duration, used_days, evening_only);
        candidates
            .iter()
            .find(|(_, fit)| *fit == DurationFit::Exact)
            .or_else(|| candidates.first())
            .map(|(slot, _)| *slot)
    };

    let evening = unit.category().is_part_time();
    pick(evening)
        .or_else(|| {
            if !evening {
                return None;
            }
            log::warn!("{}: dropping the evening window to force a session", unit.id);
            pick(false)
        })
        .or_else(|| catalog.with_duration(session.duration).next().copied())
        .unwrap_or(TimeSlot {
            day: Day::Mon,
            window: TimeWindow::starting_at(DAY_START, session.duration),
        })
}

fn last_resort(
    ctx: &mut PlacementContext<'_>,
    unit_index: usize,
    session: Session,
    used_days: DayPattern,
) -> TimeSlot {
    let units = ctx.units;
    let rooms = ctx.rooms;
    let unit = &units[unit_index];
    let slot = fallback_slot(ctx.catalog, unit, session, used_days);
    let days = DayPattern::single(slot.day);
    let lab = unit.requires_lab();

    let room_id = {
        let tracker: &ResourceTracker = &*ctx.tracker;
        rooms
            .choose_least_used(tracker, days, lab, |r| {
                tracker.is_available(ResourceKind::Room, &r.id, days, slot.window)
            })
            .or_else(|| rooms.first_suitable(lab))
            .map_or_else(|| PLACEHOLDER_ROOM.to_string(), |r| r.id.clone())
    };
    let sections = unit.section_ids();
    ctx.tracker.reserve_all_trusted(&Booking {
        course_key: &unit.id,
        subject_code: unit.subject_code(),
        instructor_id: unit.instructor_id(),
        room_id: &room_id,
        section_ids: &sections,
        days,
        window: slot.window,
    });
    log::warn!(
        "{}: forced session {} into {} {} {}",
        unit.id,
        session.ordinal,
        slot.day,
        slot.window,
        room_id
    );
    commit(ctx, unit, session.ordinal, slot, &room_id, PlacementStage::Forced, true);
    slot
}

/// Places every missing session of every unit, whatever it takes.
///
/// Returns the number of sessions forced.
pub(crate) fn force_pass(ctx: &mut PlacementContext<'_>, order: &[usize]) -> usize {
    let units = ctx.units;
    let mut forced = 0;

    for &index in order {
        let unit = &units[index];
        let Some(lead) = unit.members.first() else {
            continue;
        };
        let sessions = unit.sessions();
        let placed: Vec<(usize, Minute)> = ctx
            .schedule
            .entries_for_course(&lead.key)
            .map(|e| (e.session, e.window.start))
            .collect();
        if placed.len() >= sessions.len() {
            continue;
        }

        let mut used_days = ctx.schedule.used_days(&lead.key);
        let mut preferred = placed.first().map(|&(_, start)| start);

        for session in sessions
            .iter()
            .filter(|s| !placed.iter().any(|&(ordinal, _)| ordinal == s.ordinal))
        {
            let mut slot = None;
            for attempt in FORCE_TIERS {
                if attempt.same_time && preferred.is_none() {
                    continue;
                }
                let start = if attempt.same_time { preferred } else { None };
                slot = try_session(ctx, index, *session, used_days, start, attempt);
                if slot.is_some() {
                    break;
                }
            }
            let slot = match slot {
                Some(s) => s,
                None => last_resort(ctx, index, *session, used_days),
            };
            used_days.insert(slot.day);
            preferred.get_or_insert(slot.window.start);
            forced += 1;
        }
    }

    if forced > 0 {
        log::debug!("force pass placed {forced} sessions");
    }
    forced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomDistribution;
    use crate::models::{CourseRequest, EmploymentCategory, EVENING};
    use rand::SeedableRng;

    struct Fixture {
        units: Vec<JointUnit>,
        catalog: TimeCatalog,
        rooms: RoomSelector,
        tracker: ResourceTracker,
        schedule: Schedule,
        rng: ChaCha8Rng,
    }

    impl Fixture {
        fn new(units: Vec<JointUnit>, rooms: Vec<Room>) -> Self {
            Self {
                units,
                catalog: TimeCatalog::build(),
                rooms: RoomSelector::new(rooms, &RoomDistribution::default(), "", 3),
                tracker: ResourceTracker::new(),
                schedule: Schedule::new(),
                rng: ChaCha8Rng::seed_from_u64(42),
            }
        }

        fn ctx(&mut self) -> PlacementContext<'_> {
            PlacementContext {
                units: &self.units,
                catalog: &self.catalog,
                rooms: &self.rooms,
                tracker: &mut self.tracker,
                schedule: &mut self.schedule,
                rng: &mut self.rng,
                deadline: Deadline::never(),
            }
        }

        fn pending(&self) -> Vec<PendingUnit> {
            self.units
                .iter()
                .enumerate()
                .map(|(i, u)| PendingUnit::new(i, u.sessions()))
                .collect()
        }
    }

    fn single(instructor: &str, subject: &str, section: &str, units: u32) -> JointUnit {
        JointUnit::new(
            format!("{instructor}|{subject}|1"),
            vec![CourseRequest::new(instructor, subject, section, units)],
        )
    }

    #[test]
    fn test_primary_places_with_same_start() {
        let mut fx = Fixture::new(
            vec![single("I1", "CS1", "S1", 3), single("I2", "CS2", "S2", 6)],
            vec![Room::new("R1", "Main"), Room::new("R2", "Main")],
        );
        let pending = fx.pending();
        let outcome = run_stage(PlacementStage::Primary, pending, &mut fx.ctx());
        assert_eq!(outcome.placed, 4);
        assert!(outcome.remaining.is_empty());

        for key in ["I1|CS1|1|A", "I2|CS2|1|A"] {
            let entries: Vec<_> = fx.schedule.entries_for_course(key).collect();
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].window.start, entries[1].window.start);
            assert_ne!(entries[0].days, entries[1].days);
            assert!(entries.iter().all(|e| e.stage == PlacementStage::Primary));
        }
    }

    #[test]
    fn test_part_time_sessions_in_evening() {
        let unit = JointUnit::new(
            "P1|CS9|1",
            vec![CourseRequest::new("P1", "CS9", "S9", 5)
                .with_category(EmploymentCategory::PartTime)],
        );
        let mut fx = Fixture::new(vec![unit], vec![Room::new("R1", "Main")]);
        let pending = fx.pending();
        run_stage(PlacementStage::Primary, pending, &mut fx.ctx());

        let entries = &fx.schedule.entries;
        assert_eq!(entries.len(), 2);
        for e in entries {
            assert!(EVENING.covers(&e.window), "{:?}", e.window);
            assert_eq!(e.window.duration(), 150);
        }
        assert_ne!(entries[0].days, entries[1].days);
    }

    #[test]
    fn test_joint_unit_members_share_slot() {
        let unit = JointUnit::new(
            "I1|CS1|1",
            vec![
                CourseRequest::new("I1", "CS1", "S-A", 3).with_block("A"),
                CourseRequest::new("I1", "CS1", "S-B", 3).with_block("B"),
            ],
        );
        let mut fx = Fixture::new(vec![unit], vec![Room::new("R1", "Main")]);
        let pending = fx.pending();
        run_stage(PlacementStage::Primary, pending, &mut fx.ctx());

        let a: Vec<_> = fx.schedule.entries_for_course("I1|CS1|1|A").collect();
        let b: Vec<_> = fx.schedule.entries_for_course("I1|CS1|1|B").collect();
        assert_eq!(a.len(), 2);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!((x.days, x.window, &x.room_id), (y.days, y.window, &y.room_id));
        }
    }

    #[test]
    fn test_missing_lab_room_uses_placeholder() {
        let unit = JointUnit::new(
            "I1|LAB1|1",
            vec![CourseRequest::new("I1", "LAB1", "S1", 2).with_lab(true)],
        );
        let mut fx = Fixture::new(vec![unit], vec![Room::new("R1", "Main")]);
        let pending = fx.pending();
        let outcome = run_stage(PlacementStage::Primary, pending, &mut fx.ctx());
        assert_eq!(outcome.placed, 1);
        assert_eq!(fx.schedule.entries[0].room_id, PLACEHOLDER_ROOM);
    }

    #[test]
    fn test_emergency_double_books_single_room() {
        // One room, instructor-disjoint courses filling it.
        let mut fx = Fixture::new(vec![single("I1", "CS1", "S1", 2)], vec![Room::new("R1", "Main")]);
        for slot in fx.catalog.slots() {
            fx.tracker.reserve(
                ResourceKind::Room,
                "R1",
                slot.day,
                slot.window,
                &crate::tracker::Holder {
                    course_key: "X".into(),
                    subject_code: "X".into(),
                    instructor_id: "IX".into(),
                },
            );
        }
        let pending = fx.pending();
        let primary = run_stage(PlacementStage::Primary, pending, &mut fx.ctx());
        assert_eq!(primary.placed, 0);
        let emergency = run_stage(PlacementStage::Emergency, primary.remaining, &mut fx.ctx());
        assert_eq!(emergency.placed, 1);
        let e = &fx.schedule.entries[0];
        assert_eq!(e.stage, PlacementStage::Emergency);
        assert!(e.emergency_scheduled);
        assert_eq!(e.room_id, "R1");
    }

    #[test]
    fn test_force_pass_completes_everything() {
        // The instructor is busy all week; nothing validates.
        let mut fx = Fixture::new(vec![single("I1", "CS1", "S1", 6)], vec![Room::new("R1", "Main")]);
        let holder = crate::tracker::Holder {
            course_key: "X".into(),
            subject_code: "X".into(),
            instructor_id: "I1".into(),
        };
        for day in Day::ALL {
            fx.tracker
                .reserve(ResourceKind::Instructor, "I1", day, TimeWindow::new(0, 1440), &holder);
        }
        let forced = force_pass(&mut fx.ctx(), &[0]);
        assert_eq!(forced, 2);
        let entries = &fx.schedule.entries;
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.stage == PlacementStage::Forced && e.emergency_scheduled));
        assert!(entries.iter().all(|e| e.window.duration() == 180));
        assert_ne!(entries[0].days, entries[1].days);
        assert!(entries.iter().all(|e| !e.window.hits_lunch()));
    }

    #[test]
    fn test_force_pass_skips_complete_units() {
        let mut fx = Fixture::new(vec![single("I1", "CS1", "S1", 2)], vec![Room::new("R1", "Main")]);
        let pending = fx.pending();
        run_stage(PlacementStage::Primary, pending, &mut fx.ctx());
        assert_eq!(force_pass(&mut fx.ctx(), &[0]), 0);
        assert_eq!(fx.schedule.len(), 1);
    }

    #[test]
    fn test_expired_deadline_defers_everything() {
        let mut fx = Fixture::new(vec![single("I1", "CS1", "S1", 3)], vec![Room::new("R1", "Main")]);
        let pending = fx.pending();
        let mut ctx = fx.ctx();
        ctx.deadline = Deadline::after(std::time::Duration::ZERO);
        let outcome = run_stage(PlacementStage::Primary, pending, &mut ctx);
        assert_eq!(outcome.placed, 0);
        assert_eq!(outcome.remaining.len(), 1);
        assert_eq!(force_pass(&mut ctx, &[0]), 2);
    }

    #[test]
    fn test_blocks_with_different_units_get_own_sessions() {
        let units = crate::solver::preprocess::detect_joint_units(vec![
            CourseRequest::new("I1", "CS1", "S-A", 2).with_block("A"),
            CourseRequest::new("I1", "CS1", "S-B", 3).with_block("B"),
        ]);
        assert_eq!(units.len(), 2);
        let mut fx = Fixture::new(units, vec![Room::new("R1", "Main"), Room::new("R2", "Main")]);
        let pending = fx.pending();
        let outcome = run_stage(PlacementStage::Primary, pending, &mut fx.ctx());
        assert!(outcome.remaining.is_empty());
        assert_eq!(force_pass(&mut fx.ctx(), &[0, 1]), 0);

        let a: Vec<_> = fx.schedule.entries_for_course("I1|CS1|1|A").collect();
        let b: Vec<_> = fx.schedule.entries_for_course("I1|CS1|1|B").collect();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].window.duration(), 120);
        assert_eq!(b.len(), 2);
        assert!(b.iter().all(|e| e.window.duration() == 90));
        assert_eq!(fx.schedule.len(), 3);
    }
}
