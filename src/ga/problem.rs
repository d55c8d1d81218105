//! Timetable refinement GA problem definition.
//!
//! Implements `u_metaheur::ga::GaProblem` over [`TimetableChromosome`].
//! Bridges the solver's units and rooms to the generic GA framework.
//!
//! # Fitness
//!
//! `100×critical + 50×high + 10×medium + 1×low` conflict weights, plus
//! 200 per critical pair not fully co-scheduled, 20 per missing session
//! against the expected total and 40 per overloaded instructor. Fixed
//! entries take part in conflict detection; clashes among them alone are
//! not counted.
//!
//! # Run control
//!
//! The first individual created is the incumbent. The fittest individual
//! evaluated so far is kept in the problem. Once it reaches zero fitness
//! or the deadline passes, operators stop changing individuals and
//! evaluation returns the stored fitness, so the remaining generations
//! finish without work.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::Rng;
use u_metaheur::ga::GaProblem;

use super::chromosome::TimetableChromosome;
use super::operators::{random_gene, reassign_mutation, single_point_crossover};
use crate::catalog::TimeCatalog;
use crate::config::LoadCeilings;
use crate::detection::ConflictDetector;
use crate::models::{JointUnit, Room, ScheduleEntry};
use crate::solver::{overloaded_instructors, Deadline};

/// Penalty per critical pair whose blocks do not meet together.
pub const SPLIT_PAIR_PENALTY: f64 = 200.0;
/// Penalty per session missing from the expected total.
pub const SHORTFALL_PENALTY: f64 = 20.0;
/// Penalty per instructor above their ceiling.
pub const OVERLOAD_PENALTY: f64 = 40.0;

/// GA problem for refining a finished timetable.
///
/// # Example
/// ```no_run
/// use u_timetable::catalog::TimeCatalog;
/// use u_timetable::config::LoadCeilings;
/// use u_timetable::ga::RefinementProblem;
/// use u_metaheur::ga::{GaConfig, GaRunner};
///
/// let catalog = TimeCatalog::build();
/// let units = vec![/* ... */];
/// let incumbent = vec![/* ... */];
/// let problem =
///     RefinementProblem::new(&units, &[], &catalog, &incumbent, &[], &LoadCeilings::default());
/// GaRunner::run(&problem, &GaConfig::default());
/// let refined = problem.decode(&problem.best());
/// ```
pub struct RefinementProblem<'a> {
    units: &'a [JointUnit],
    rooms: &'a [Room],
    catalog: &'a TimeCatalog,
    fixed: &'a [ScheduleEntry],
    fixed_baseline: f64,
    incumbent: TimetableChromosome,
    expected_entries: usize,
    overload_penalty: f64,
    mutation_attempts: usize,
    deadline: Deadline,
    incumbent_issued: AtomicBool,
    best: Mutex<TimetableChromosome>,
}

impl<'a> RefinementProblem<'a> {
    /// Creates a problem seeded with the solver's timetable.
    ///
    /// `fixed` holds bookings the refiner must schedule around but never
    /// moves.
    pub fn new(
        units: &'a [JointUnit],
        rooms: &'a [Room],
        catalog: &'a TimeCatalog,
        incumbent: &[ScheduleEntry],
        fixed: &'a [ScheduleEntry],
        ceilings: &LoadCeilings,
    ) -> Self {
        let expected_entries = units
            .iter()
            .map(|u| u.members.len() * u.sessions().len())
            .sum();
        let overloaded = overloaded_instructors(units, ceilings).len();
        let mut problem = Self {
            units,
            rooms,
            catalog,
            fixed,
            fixed_baseline: ConflictDetector::detect(fixed).weighted_score(),
            incumbent: TimetableChromosome::from_entries(units, incumbent),
            expected_entries,
            overload_penalty: overloaded as f64 * OVERLOAD_PENALTY,
            mutation_attempts: 5,
            deadline: Deadline::never(),
            incumbent_issued: AtomicBool::new(false),
            best: Mutex::new(TimetableChromosome::new(Vec::new())),
        };
        let fitness = problem.score(&problem.decode(&problem.incumbent));
        problem.incumbent.fitness = fitness;
        problem.best = Mutex::new(problem.incumbent.clone());
        problem
    }

    /// Sets how many redraws a mutation may try.
    pub fn with_mutation_attempts(mut self, attempts: usize) -> Self {
        self.mutation_attempts = attempts.max(1);
        self
    }

    /// Stops changing individuals once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// The solver's timetable as a chromosome, with its fitness.
    pub fn incumbent(&self) -> &TimetableChromosome {
        &self.incumbent
    }

    /// The fittest individual evaluated so far.
    pub fn best(&self) -> TimetableChromosome {
        self.lock_best().clone()
    }

    /// Decodes a chromosome into entries.
    pub fn decode(&self, chromosome: &TimetableChromosome) -> Vec<ScheduleEntry> {
        chromosome.decode(self.units)
    }

    fn lock_best(&self) -> MutexGuard<'_, TimetableChromosome> {
        self.best.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn halted(&self) -> bool {
        self.lock_best().fitness <= 0.0 || self.deadline.expired()
    }

    fn split_pairs(&self, entries: &[ScheduleEntry]) -> usize {
        let mut meetings: HashMap<&str, BTreeSet<(u8, u32, u32, &str)>> = HashMap::new();
        for e in entries {
            let days: u8 = e.days.iter().fold(0, |acc, d| acc | (1 << d.index()));
            meetings
                .entry(e.course_key.as_str())
                .or_default()
                .insert((days, e.window.start, e.window.end, e.room_id.as_str()));
        }
        self.units
            .iter()
            .filter(|u| u.is_critical_pair())
            .filter(|u| {
                let sets: Vec<_> = u.members.iter().map(|m| meetings.get(m.key.as_str())).collect();
                sets.windows(2).any(|w| w[0] != w[1])
            })
            .count()
    }

    /// Fitness of a decoded timetable.
    pub fn score(&self, entries: &[ScheduleEntry]) -> f64 {
        let conflicts = if self.fixed.is_empty() {
            ConflictDetector::detect(entries).weighted_score()
        } else {
            let mut all = entries.to_vec();
            all.extend_from_slice(self.fixed);
            ConflictDetector::detect(&all).weighted_score() - self.fixed_baseline
        };
        let shortfall = self.expected_entries.saturating_sub(entries.len());
        conflicts
            + self.split_pairs(entries) as f64 * SPLIT_PAIR_PENALTY
            + shortfall as f64 * SHORTFALL_PENALTY
            + self.overload_penalty
    }
}

impl GaProblem for RefinementProblem<'_> {
    type Individual = TimetableChromosome;

    fn create_individual<R: Rng>(&self, rng: &mut R) -> TimetableChromosome {
        if !self.incumbent_issued.swap(true, Ordering::Relaxed) {
            return self.incumbent.clone();
        }
        TimetableChromosome::new(
            self.units
                .iter()
                .map(|u| random_gene(u, self.catalog, self.rooms, rng))
                .collect(),
        )
    }

    fn evaluate(&self, individual: &TimetableChromosome) -> f64 {
        if self.halted() {
            return individual.fitness;
        }
        let fitness = self.score(&self.decode(individual));
        let mut best = self.lock_best();
        if fitness < best.fitness {
            *best = individual.clone();
            best.fitness = fitness;
        }
        fitness
    }

    fn crossover<R: Rng>(
        &self,
        parent1: &TimetableChromosome,
        parent2: &TimetableChromosome,
        rng: &mut R,
    ) -> Vec<TimetableChromosome> {
        if self.halted() {
            return vec![parent1.clone(), parent2.clone()];
        }
        let (c1, c2) = single_point_crossover(parent1, parent2, rng);
        vec![c1, c2]
    }

    fn mutate<R: Rng>(&self, individual: &mut TimetableChromosome, rng: &mut R) {
        if self.halted() {
            return;
        }
        reassign_mutation(
            individual,
            self.units,
            self.catalog,
            self.rooms,
            self.fixed,
            self.mutation_attempts,
            rng,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::entry;
    use crate::models::{CourseRequest, Day};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use u_metaheur::ga::{GaConfig, GaRunner};

    fn units() -> Vec<JointUnit> {
        vec![
            JointUnit::new("I1|CS1|1", vec![CourseRequest::new("I1", "CS1", "S1", 2)]),
            JointUnit::new("I1|CS2|1", vec![CourseRequest::new("I1", "CS2", "S2", 2)]),
        ]
    }

    fn clashing_incumbent() -> Vec<ScheduleEntry> {
        // Same instructor, same time: one high conflict.
        vec![
            entry("I1|CS1|1|A", "I1", "CS1", "S1", "R1", Day::Mon, 420, 540),
            entry("I1|CS2|1|A", "I1", "CS2", "S2", "R2", Day::Mon, 420, 540),
        ]
    }

    #[test]
    fn test_incumbent_scored_by_conflicts() {
        let units = units();
        let rooms = vec![Room::new("R1", "Main"), Room::new("R2", "Main")];
        let catalog = TimeCatalog::build();
        let incumbent = clashing_incumbent();
        let problem = RefinementProblem::new(
            &units,
            &rooms,
            &catalog,
            &incumbent,
            &[],
            &LoadCeilings::default(),
        );
        assert!((problem.incumbent().fitness - 50.0).abs() < 1e-9);
        assert!((problem.evaluate(problem.incumbent()) - 50.0).abs() < 1e-9);
        assert!((problem.best().fitness - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_shortfall_penalized() {
        let units = units();
        let catalog = TimeCatalog::build();
        let incumbent = vec![entry("I1|CS1|1|A", "I1", "CS1", "S1", "R1", Day::Mon, 420, 540)];
        let problem = RefinementProblem::new(
            &units,
            &[],
            &catalog,
            &incumbent,
            &[],
            &LoadCeilings::default(),
        );
        assert!((problem.incumbent().fitness - SHORTFALL_PENALTY).abs() < 1e-9);
    }

    #[test]
    fn test_split_pair_penalized() {
        let pair = vec![JointUnit::new(
            "I1|CS1|1",
            vec![
                CourseRequest::new("I1", "CS1", "S-A", 2).with_block("A"),
                CourseRequest::new("I1", "CS1", "S-B", 2).with_block("B"),
            ],
        )];
        let catalog = TimeCatalog::build();
        let problem =
            RefinementProblem::new(&pair, &[], &catalog, &[], &[], &LoadCeilings::default());
        let split = vec![
            entry("I1|CS1|1|A", "I1", "CS1", "S-A", "R1", Day::Mon, 420, 540),
            entry("I1|CS1|1|B", "I1", "CS1", "S-B", "R1", Day::Tue, 420, 540),
        ];
        let together = vec![
            entry("I1|CS1|1|A", "I1", "CS1", "S-A", "R1", Day::Mon, 420, 540),
            entry("I1|CS1|1|B", "I1", "CS1", "S-B", "R1", Day::Mon, 420, 540),
        ];
        assert!((problem.score(&split) - SPLIT_PAIR_PENALTY).abs() < 1e-9);
        assert_eq!(problem.score(&together), 0.0);
    }

    #[test]
    fn test_fixed_entries_count_against_timetable() {
        let units = vec![JointUnit::new(
            "I1|CS1|1",
            vec![CourseRequest::new("I1", "CS1", "S1", 2)],
        )];
        let catalog = TimeCatalog::build();
        let incumbent = vec![entry("I1|CS1|1|A", "I1", "CS1", "S1", "R1", Day::Mon, 420, 540)];
        // The two fixed bookings share a room; only the instructor overlap
        // with the incumbent is charged.
        let fixed = vec![
            entry("EXT|X|1|A", "I1", "X", "EXT1", "R2", Day::Mon, 480, 600),
            entry("EXT|Y|1|A", "I9", "Y", "EXT2", "R2", Day::Mon, 480, 600),
        ];
        let problem = RefinementProblem::new(
            &units,
            &[],
            &catalog,
            &incumbent,
            &fixed,
            &LoadCeilings::default(),
        );
        assert!((problem.incumbent().fitness - 50.0).abs() < 1e-9);

        let moved = vec![entry("I1|CS1|1|A", "I1", "CS1", "S1", "R1", Day::Tue, 420, 540)];
        assert_eq!(problem.score(&moved), 0.0);
    }

    #[test]
    fn test_first_individual_is_incumbent() {
        let units = units();
        let rooms = vec![Room::new("R1", "Main")];
        let catalog = TimeCatalog::build();
        let incumbent = clashing_incumbent();
        let problem = RefinementProblem::new(
            &units,
            &rooms,
            &catalog,
            &incumbent,
            &[],
            &LoadCeilings::default(),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let first = problem.create_individual(&mut rng);
        assert_eq!(first.genes, problem.incumbent().genes);
        let second = problem.create_individual(&mut rng);
        assert!(second.genes.iter().all(|g| g.placements.iter().all(|p| p.room_id == "R1")));
    }

    #[test]
    fn test_ga_resolves_instructor_clash() {
        let units = units();
        let rooms = vec![Room::new("R1", "Main"), Room::new("R2", "Main")];
        let catalog = TimeCatalog::build();
        let incumbent = clashing_incumbent();
        let problem = RefinementProblem::new(
            &units,
            &rooms,
            &catalog,
            &incumbent,
            &[],
            &LoadCeilings::default(),
        );
        let config = GaConfig::default()
            .with_population_size(20)
            .with_max_generations(30)
            .with_seed(42)
            .with_parallel(false);
        let result = GaRunner::run(&problem, &config);
        assert!(result.generations > 0);

        let best = problem.best();
        assert_eq!(best.fitness, 0.0);
        let entries = problem.decode(&best);
        assert_eq!(entries.len(), 2);
        assert!(ConflictDetector::detect(&entries).is_clean());
    }

    #[test]
    fn test_expired_deadline_freezes_operators() {
        let units = units();
        let rooms = vec![Room::new("R1", "Main")];
        let catalog = TimeCatalog::build();
        let incumbent = clashing_incumbent();
        let problem = RefinementProblem::new(
            &units,
            &rooms,
            &catalog,
            &incumbent,
            &[],
            &LoadCeilings::default(),
        )
        .with_deadline(Deadline::after(std::time::Duration::ZERO));
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let mut individual = problem.incumbent().clone();
        problem.mutate(&mut individual, &mut rng);
        assert_eq!(individual.genes, problem.incumbent().genes);

        let children = problem.crossover(problem.incumbent(), &individual, &mut rng);
        assert_eq!(children[0].genes, problem.incumbent().genes);

        let fresh = TimetableChromosome::new(Vec::new());
        assert!(problem.evaluate(&fresh).is_infinite());
        assert!((problem.best().fitness - 50.0).abs() < 1e-9);
    }
}
