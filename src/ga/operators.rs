//! Genetic operators for timetable chromosomes.
//!
//! - [`random_gene`]: a fresh placement of one unit drawn from the catalog,
//!   respecting duration, the part-time evening window, distinct days and a
//!   shared start time.
//! - [`single_point_crossover`]: swaps gene tails at one cut point.
//! - [`reassign_mutation`]: redraws one gene, preferring a draw that does
//!   not clash with the rest of the timetable or with fixed bookings.

use rand::prelude::IndexedRandom;
use rand::Rng;

use super::chromosome::{Gene, GenePlacement, TimetableChromosome};
use crate::catalog::{TimeCatalog, TimeSlot};
use crate::detection::AcceptedIndex;
use crate::models::{
    DayPattern, JointUnit, Minute, PlacementStage, Room, ScheduleEntry, PLACEHOLDER_ROOM,
};
use crate::solver::fallback_slot;

/// Draws a random placement for every session of `unit`.
pub fn random_gene<R: Rng>(
    unit: &JointUnit,
    catalog: &TimeCatalog,
    rooms: &[Room],
    rng: &mut R,
) -> Gene {
    let evening = unit.category().is_part_time();
    let lab = unit.requires_lab();
    let suitable: Vec<&Room> = rooms.iter().filter(|r| r.suits(lab)).collect();
    let mut used_days = DayPattern::empty();
    let mut start: Option<Minute> = None;
    let mut placements = Vec::new();

    for session in unit.sessions() {
        let candidates: Vec<TimeSlot> = catalog
            .candidates(session.duration, used_days, evening)
            .into_iter()
            .map(|(slot, _)| slot)
            .collect();
        let same_start: Vec<TimeSlot> = match start {
            Some(s) => candidates.iter().copied().filter(|c| c.window.start == s).collect(),
            None => Vec::new(),
        };
        let pool = if same_start.is_empty() {
            &candidates
        } else {
            &same_start
        };
        let slot = pool
            .choose(rng)
            .copied()
            .unwrap_or_else(|| fallback_slot(catalog, unit, session, used_days));

        used_days.insert(slot.day);
        start.get_or_insert(slot.window.start);
        let room_id = suitable
            .choose(rng)
            .map_or_else(|| PLACEHOLDER_ROOM.to_string(), |r| r.id.clone());
        placements.push(GenePlacement {
            ordinal: session.ordinal,
            slot,
            room_id,
            stage: PlacementStage::Refined,
            emergency: false,
        });
    }

    Gene { placements }
}

/// One-point crossover over the gene sequence.
pub fn single_point_crossover<R: Rng>(
    p1: &TimetableChromosome,
    p2: &TimetableChromosome,
    rng: &mut R,
) -> (TimetableChromosome, TimetableChromosome) {
    let len = p1.len().min(p2.len());
    if len < 2 {
        return (
            TimetableChromosome::new(p1.genes.clone()),
            TimetableChromosome::new(p2.genes.clone()),
        );
    }
    let cut = rng.random_range(1..len);
    let mut c1 = p1.genes[..cut].to_vec();
    c1.extend_from_slice(&p2.genes[cut..]);
    let mut c2 = p2.genes[..cut].to_vec();
    c2.extend_from_slice(&p1.genes[cut..]);
    (TimetableChromosome::new(c1), TimetableChromosome::new(c2))
}

/// Redraws one random gene.
///
/// Up to `attempts` draws are made. The first draw that clashes with no
/// other gene and no `fixed` entry wins; otherwise the draw with the fewest
/// clashing entries is kept.
pub fn reassign_mutation<R: Rng>(
    chromosome: &mut TimetableChromosome,
    units: &[JointUnit],
    catalog: &TimeCatalog,
    rooms: &[Room],
    fixed: &[ScheduleEntry],
    attempts: usize,
    rng: &mut R,
) {
    let len = chromosome.len().min(units.len());
    if len == 0 {
        return;
    }
    let target = rng.random_range(0..len);
    let unit = &units[target];

    let others: Vec<_> = chromosome
        .genes
        .iter()
        .zip(units)
        .enumerate()
        .filter(|(i, _)| *i != target)
        .flat_map(|(_, (gene, unit))| gene.entries(unit))
        .collect();
    let index = AcceptedIndex::from_entries(others.iter().chain(fixed));

    let mut best: Option<(usize, Gene)> = None;
    for _ in 0..attempts.max(1) {
        let gene = random_gene(unit, catalog, rooms, rng);
        let clashes = gene
            .entries(unit)
            .iter()
            .filter(|e| index.conflicts_with(e).is_some())
            .count();
        if clashes == 0 {
            best = Some((0, gene));
            break;
        }
        if best.as_ref().map_or(true, |(c, _)| clashes < *c) {
            best = Some((clashes, gene));
        }
    }

    if let Some((_, gene)) = best {
        chromosome.genes[target] = gene;
    }
}
