//! GA-based timetable refinement.
//!
//! Runs after the solver's force pass when conflicts remain. Implements
//! timetable-specific encodings on top of `u-metaheur`'s generic GA. The
//! solver's timetable seeds the population as individual 0; the result
//! replaces it only when strictly fitter.
//!
//! # Encoding
//!
//! One gene per joint unit holding the day, window and room of each session
//! (see [`TimetableChromosome`]).
//!
//! # Submodules
//!
//! - [`operators`]: gene draws, crossover and mutation
//!
//! # Reference
//! - Burke, Elliman & Weare (1994), "A Genetic Algorithm Based University
//!   Timetabling System"
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization and
//!   Machine Learning"

mod chromosome;
pub mod operators;
mod problem;

use serde::{Deserialize, Serialize};
use u_metaheur::ga::{GaConfig, GaRunner};

pub use chromosome::{Gene, GenePlacement, TimetableChromosome};
pub use problem::{RefinementProblem, OVERLOAD_PENALTY, SHORTFALL_PENALTY, SPLIT_PAIR_PENALTY};

use crate::catalog::TimeCatalog;
use crate::config::{GeneticConfig, SolverConfig};
use crate::models::{JointUnit, Room, ScheduleEntry};
use crate::solver::Deadline;

/// Summary of a refinement run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementSummary {
    pub incumbent_fitness: f64,
    pub best_fitness: f64,
    pub generations: usize,
    /// Whether the refined timetable replaced the incumbent.
    pub improved: bool,
}

fn ga_config(genetic: &GeneticConfig, seed: u64) -> GaConfig {
    GaConfig::default()
        .with_population_size(genetic.population_size)
        .with_max_generations(genetic.max_generations)
        .with_mutation_rate(genetic.mutation_rate)
        .with_crossover_rate(genetic.crossover_rate)
        .with_seed(seed)
        .with_parallel(genetic.parallel)
}

/// Refines `incumbent` and returns the better timetable, if any.
///
/// `fixed` entries are scheduled around but never moved. `Some` only when
/// the GA found a strictly fitter timetable.
pub fn refine(
    units: &[JointUnit],
    rooms: &[Room],
    catalog: &TimeCatalog,
    incumbent: &[ScheduleEntry],
    fixed: &[ScheduleEntry],
    config: &SolverConfig,
    deadline: Deadline,
) -> (Option<Vec<ScheduleEntry>>, RefinementSummary) {
    let problem = RefinementProblem::new(
        units,
        rooms,
        catalog,
        incumbent,
        fixed,
        &config.load_ceilings,
    )
    .with_mutation_attempts(config.genetic.mutation_attempts)
    .with_deadline(deadline);
    let incumbent_fitness = problem.incumbent().fitness;
    if incumbent_fitness <= 0.0 {
        log::debug!("refinement: incumbent already at zero fitness");
        let summary = RefinementSummary {
            incumbent_fitness,
            best_fitness: incumbent_fitness,
            generations: 0,
            improved: false,
        };
        return (None, summary);
    }

    let result = GaRunner::run(&problem, &ga_config(&config.genetic, config.seed));
    let best = problem.best();

    let improved = best.fitness < incumbent_fitness;
    log::info!(
        "refinement: {:.1} -> {:.1} after {} generations{}",
        incumbent_fitness,
        best.fitness,
        result.generations,
        if improved { "" } else { " (kept incumbent)" }
    );

    let summary = RefinementSummary {
        incumbent_fitness,
        best_fitness: best.fitness,
        generations: result.generations,
        improved,
    };
    (improved.then(|| problem.decode(&best)), summary)
}
